//! Authorization-code sign-in through the system browser.
//!
//! The flow binds a loopback listener on the redirect URI, opens the
//! provider's authorization page, waits for exactly one callback, exchanges
//! the code for tokens and fetches the account behind them. The resulting
//! profile is stored and selected.

use super::callback::CallbackListener;
use super::{AuthError, ProfileStore};
use crate::config::LauncherConfig;
use crate::models::Profile;
use crate::net::http_client;
use log::{error, info, warn};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, CsrfToken, RedirectUrl, RefreshToken, RequestTokenError,
    Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Endpoints and client registration of an OAuth2 identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProvider {
    pub authorize_url: String,
    pub token_url: String,
    /// Account info endpoint, called with the bearer token.
    pub profile_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    /// Passed to authlib-injector so the game validates sessions against this provider.
    pub injector_api_root: String,
}

impl OAuthProvider {
    pub fn ely_by() -> Self {
        Self {
            authorize_url: "https://account.ely.by/oauth2/v1/authorize".to_string(),
            token_url: "https://account.ely.by/oauth2/v1/token".to_string(),
            profile_url: "https://account.ely.by/api/account/v1/info".to_string(),
            client_id: "minecraft-launcher".to_string(),
            redirect_uri: "http://localhost:8888/callback".to_string(),
            scope: "minecraft_server_session".to_string(),
            injector_api_root: "ely.by".to_string(),
        }
    }

    fn redirect(&self) -> Result<Url, AuthError> {
        Url::parse(&self.redirect_uri).map_err(|e| AuthError::Config(format!("redirect URI: {}", e)))
    }

    fn client(&self) -> Result<BasicClient, AuthError> {
        let auth_url =
            AuthUrl::new(self.authorize_url.clone()).map_err(|e| AuthError::Config(format!("authorize URL: {}", e)))?;
        let token_url =
            TokenUrl::new(self.token_url.clone()).map_err(|e| AuthError::Config(format!("token URL: {}", e)))?;
        let redirect_url =
            RedirectUrl::new(self.redirect_uri.clone()).map_err(|e| AuthError::Config(format!("redirect URI: {}", e)))?;

        // Public client: no secret, client_id travels in the form body.
        Ok(
            BasicClient::new(ClientId::new(self.client_id.clone()), None, auth_url, Some(token_url))
                .set_auth_type(AuthType::RequestBody)
                .set_redirect_uri(redirect_url),
        )
    }
}

impl Default for OAuthProvider {
    fn default() -> Self {
        Self::ely_by()
    }
}

/// Where a sign-in currently is. `Profiled` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStage {
    Idle,
    AwaitingCallback,
    Exchanging,
    Profiled,
    Failed(String),
}

/// Opens the authorization URL for the user.
pub type BrowserOpener = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

fn system_browser() -> BrowserOpener {
    Arc::new(|url: &str| open::that(url).map_err(Into::into))
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    uuid: Option<String>,
    username: String,
}

impl AccountInfo {
    fn account_uuid(&self) -> String {
        if let Some(uuid) = self.uuid.as_deref().filter(|u| !u.is_empty()) {
            return uuid.to_string();
        }
        match &self.id {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// A sign-in running on its own task.
pub struct AuthHandle {
    pub stage: watch::Receiver<AuthStage>,
    result: oneshot::Receiver<Result<Profile, AuthError>>,
}

impl AuthHandle {
    pub async fn wait(self) -> Result<Profile, AuthError> {
        self.result
            .await
            .map_err(|_| AuthError::Task("sign-in task dropped its result".to_string()))?
    }
}

pub struct OAuthFlow {
    provider: OAuthProvider,
    profiles: Arc<ProfileStore>,
    http: reqwest::Client,
    timeout: Duration,
    opener: BrowserOpener,
    stage: watch::Sender<AuthStage>,
}

impl OAuthFlow {
    pub fn new(provider: OAuthProvider, profiles: Arc<ProfileStore>) -> Result<Self, AuthError> {
        let (stage, _) = watch::channel(AuthStage::Idle);
        Ok(Self {
            provider,
            profiles,
            http: http_client()?,
            timeout: DEFAULT_TIMEOUT,
            opener: system_browser(),
            stage,
        })
    }

    /// A flow using the sign-in timeout from the launcher config.
    pub fn from_config(
        provider: OAuthProvider,
        profiles: Arc<ProfileStore>,
        config: &LauncherConfig,
    ) -> Result<Self, AuthError> {
        Ok(Self::new(provider, profiles)?.with_timeout(config.oauth_timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_browser_opener(mut self, opener: BrowserOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn provider(&self) -> &OAuthProvider {
        &self.provider
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStage> {
        self.stage.subscribe()
    }

    /// Run the sign-in on a background task.
    pub fn spawn(self: Arc<Self>) -> AuthHandle {
        let stage = self.subscribe();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = self.authenticate().await;
            let _ = tx.send(result);
        });
        AuthHandle { stage, result: rx }
    }

    /// Sign in and store the resulting profile as the current one.
    pub async fn authenticate(&self) -> Result<Profile, AuthError> {
        self.stage.send_replace(AuthStage::Idle);
        match self.run().await {
            Ok(profile) => {
                info!("[auth] Signed in as {}", profile.display_name);
                self.stage.send_replace(AuthStage::Profiled);
                Ok(profile)
            }
            Err(e) => {
                error!("[auth] Sign-in failed: {}", e);
                self.stage.send_replace(AuthStage::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<Profile, AuthError> {
        let client = self.provider.client()?;
        let (authorize_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(self.provider.scope.clone()))
            .url();

        // Listen before the browser can possibly redirect back.
        let listener = CallbackListener::bind(&self.provider.redirect()?).await?;
        self.stage.send_replace(AuthStage::AwaitingCallback);

        let accept = tokio::spawn(listener.accept_once(csrf.secret().clone(), self.timeout));

        info!("[auth] Opening browser for sign-in");
        log::debug!("[auth] Authorization URL: {}", authorize_url);
        let opener = self.opener.clone();
        let url = authorize_url.to_string();
        let opened = tokio::task::spawn_blocking(move || opener(&url)).await;
        match opened {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[auth] Could not open a browser ({:#}); open {} manually", e, authorize_url),
            Err(e) => warn!("[auth] Browser task failed ({}); open {} manually", e, authorize_url),
        }

        let code = accept.await.map_err(|e| AuthError::Task(e.to_string()))??;
        self.stage.send_replace(AuthStage::Exchanging);

        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(token_error)?;
        let access_token = token.access_token().secret().clone();
        let refresh_token = token.refresh_token().map(|t| t.secret().clone());

        let account = self.fetch_account(&access_token).await?;
        let profile = Profile::oauth(account.username.clone(), account.account_uuid(), access_token, refresh_token);
        Ok(self.profiles.add(profile).await?)
    }

    async fn fetch_account(&self, access_token: &str) -> Result<AccountInfo, AuthError> {
        let response = self
            .http
            .get(&self.provider.profile_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ProfileFetch {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Trade the stored refresh token of `profile_id` for fresh tokens.
    pub async fn refresh(&self, profile_id: &str) -> Result<Profile, AuthError> {
        let profile = self
            .profiles
            .get(profile_id)
            .await
            .ok_or_else(|| super::ProfileError::NotFound(profile_id.to_string()))?;
        let refresh_token = profile
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::NoRefreshToken(profile_id.to_string()))?;

        info!("[auth] Refreshing access token for {}", profile.display_name);
        let token = self
            .provider
            .client()?
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(async_http_client)
            .await
            .map_err(token_error)?;

        Ok(self
            .profiles
            .update_tokens(
                profile_id,
                token.access_token().secret().clone(),
                token.refresh_token().map(|t| t.secret().clone()),
            )
            .await?)
    }
}

fn token_error(err: RequestTokenError<oauth2::reqwest::Error<reqwest::Error>, BasicErrorResponse>) -> AuthError {
    let detail = match err {
        RequestTokenError::ServerResponse(response) => {
            serde_json::to_string(&response).unwrap_or_else(|_| response.error().to_string())
        }
        RequestTokenError::Parse(e, body) => format!("{} (body: {})", e, String::from_utf8_lossy(&body)),
        RequestTokenError::Request(e) => e.to_string(),
        RequestTokenError::Other(message) => message,
    };
    AuthError::TokenExchange(detail)
}
