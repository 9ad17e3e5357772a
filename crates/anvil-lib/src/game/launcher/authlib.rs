use super::options::AuthInjection;
use crate::net::{download_to_path, http_client};
use anyhow::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const AUTHLIB_INJECTOR_URL: &str =
    "https://github.com/yushijinhun/authlib-injector/releases/download/v1.2.5/authlib-injector-1.2.5.jar";
pub const AUTHLIB_JAR_NAME: &str = "authlib-injector.jar";

/// Locally cached authlib-injector agent, fetched on first use.
pub struct AuthlibInjector {
    client: Client,
    url: String,
    jar_path: PathBuf,
    api_root: String,
    fetch_lock: Mutex<()>,
}

impl AuthlibInjector {
    pub fn new(cache_dir: impl AsRef<Path>, api_root: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: AUTHLIB_INJECTOR_URL.to_string(),
            jar_path: cache_dir.as_ref().join(AUTHLIB_JAR_NAME),
            api_root: api_root.into(),
            fetch_lock: Mutex::new(()),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn jar_path(&self) -> &Path {
        &self.jar_path
    }

    /// Path to the agent jar, downloading it once if missing.
    pub async fn ensure(&self) -> Result<PathBuf> {
        let _guard = self.fetch_lock.lock().await;
        if self.jar_path.is_file() {
            return Ok(self.jar_path.clone());
        }
        log::info!("[launch] Downloading authlib-injector from {}", self.url);
        download_to_path(&self.client, &self.url, &self.jar_path, None, None).await?;
        Ok(self.jar_path.clone())
    }

    /// The agent argument for this launch, or `None` when the jar cannot be
    /// obtained. The game then starts without third-party session support.
    pub async fn injection(&self) -> Option<AuthInjection> {
        match self.ensure().await {
            Ok(agent_jar) => Some(AuthInjection {
                agent_jar,
                api_root: self.api_root.clone(),
            }),
            Err(e) => {
                log::warn!("[launch] authlib-injector unavailable, launching without it: {:#}", e);
                None
            }
        }
    }
}
