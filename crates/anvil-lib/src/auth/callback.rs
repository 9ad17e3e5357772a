//! One-shot HTTP listener for the OAuth redirect.
//!
//! Only a single request is ever read. The listener is dropped as soon as it
//! has answered, so nothing keeps listening on the port after the flow.

use super::AuthError;
use log::{debug, info};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

/// Upper bound on the request head we are willing to read.
const MAX_REQUEST_HEAD: usize = 16 * 1024;

const SUCCESS_PAGE: &str = r#"<html>
<body style="font-family: sans-serif; text-align: center; padding: 50px;">
<h1>Login successful</h1>
<p>You can close this window and return to the launcher.</p>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#;

const FAILURE_PAGE: &str = r#"<html>
<body style="font-family: sans-serif; text-align: center; padding: 50px;">
<h1>Login failed</h1>
<p>Return to the launcher for details.</p>
</body>
</html>"#;

pub(crate) struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Bind loopback on the redirect URI's port.
    pub(crate) async fn bind(redirect_uri: &Url) -> Result<Self, AuthError> {
        let port = redirect_uri
            .port_or_known_default()
            .ok_or_else(|| AuthError::Config(format!("Redirect URI {} has no port", redirect_uri)))?;
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AuthError::Bind { addr, source })?;
        debug!("[auth] Callback listener bound on {}", addr);

        Ok(Self {
            listener,
            path: redirect_uri.path().to_string(),
        })
    }

    /// Serve exactly one request and return the authorization code it carries.
    pub(crate) async fn accept_once(self, expected_state: String, timeout: Duration) -> Result<String, AuthError> {
        let serve = async {
            let (stream, peer) = self.listener.accept().await.map_err(AuthError::Accept)?;
            info!("[auth] Received OAuth callback from {}", peer);
            serve_callback(stream, &self.path, &expected_state).await
        };

        match tokio::time::timeout(timeout, serve).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout(timeout)),
        }
    }
}

async fn serve_callback(stream: TcpStream, path: &str, expected_state: &str) -> Result<String, AuthError> {
    let mut reader = BufReader::new(stream);
    let target = read_request_target(&mut reader).await?;

    let outcome = validate_callback(&target, path, expected_state);
    let (status, page) = match &outcome {
        Ok(_) => ("200 OK", SUCCESS_PAGE),
        Err(_) => ("400 Bad Request", FAILURE_PAGE),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        page.len(),
        page
    );

    let mut stream = reader.into_inner();
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("[auth] Failed to answer the callback request: {}", e);
    }
    let _ = stream.shutdown().await;

    outcome
}

/// Read the request line and skip the headers. Returns the request target.
async fn read_request_target(reader: &mut BufReader<TcpStream>) -> Result<String, AuthError> {
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(AuthError::Accept)?;

    let mut consumed = request_line.len();
    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await.map_err(AuthError::Accept)?;
        consumed += n;
        if n == 0 || header == "\r\n" || header == "\n" || consumed > MAX_REQUEST_HEAD {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(target.to_string()),
        _ => Err(AuthError::InvalidCallback(request_line.trim().to_string())),
    }
}

/// Check a request target against the expected path and state.
///
/// The state is compared before anything else in the query is looked at.
pub(crate) fn validate_callback(target: &str, path: &str, expected_state: &str) -> Result<String, AuthError> {
    let url = Url::parse("http://localhost")
        .and_then(|base| base.join(target))
        .map_err(|_| AuthError::InvalidCallback(target.to_string()))?;
    if url.path() != path {
        return Err(AuthError::InvalidCallback(url.path().to_string()));
    }

    let param = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };

    if param("state").as_deref() != Some(expected_state) {
        return Err(AuthError::CsrfMismatch);
    }
    if let Some(error) = param("error") {
        let detail = param("error_description")
            .map(|d| format!("{}: {}", error, d))
            .unwrap_or(error);
        return Err(AuthError::Denied(detail));
    }
    match param("code") {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(AuthError::Denied("no authorization code in callback".to_string())),
    }
}
