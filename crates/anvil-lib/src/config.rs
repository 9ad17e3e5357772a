//! Persisted launcher settings.
//!
//! Stored as a flat JSON object. Missing keys take their defaults and unknown
//! keys are ignored, so files written by older or newer builds keep loading.

use crate::utils::persist::{read_json, write_json_atomic};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to persist config to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Name used when the offline default profile is created.
    pub username: String,
    /// Maximum heap for the game, in MiB.
    pub ram: u32,
    /// Root of the shared version/library cache and the instances directory.
    pub minecraft_dir: PathBuf,
    /// User-chosen Java executable. `"java"` and `""` are legacy spellings of "none".
    pub java_path: Option<PathBuf>,
    pub fps_boost: bool,
    pub show_snapshots: bool,
    /// Extra JVM arguments in shell syntax.
    pub extra_jvm_args: String,
    /// How long a freshly spawned game must survive to count as started.
    pub launch_grace_ms: u64,
    pub oauth_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            username: "Player".to_string(),
            ram: 2048,
            minecraft_dir: crate::paths::default_game_root(),
            java_path: None,
            fps_boost: false,
            show_snapshots: false,
            extra_jvm_args: String::new(),
            launch_grace_ms: 1000,
            oauth_timeout_secs: 120,
        }
    }
}

impl LauncherConfig {
    /// The explicit Java override, if the user actually set one.
    pub fn java_override(&self) -> Option<&Path> {
        self.java_path.as_deref().filter(|p| {
            let s = p.as_os_str();
            !s.is_empty() && s != "java"
        })
    }

    pub fn oauth_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.oauth_timeout_secs.max(1))
    }

    /// `extra_jvm_args` split into words. Unbalanced quoting yields nothing.
    pub fn extra_jvm_args(&self) -> Vec<String> {
        if self.extra_jvm_args.trim().is_empty() {
            return Vec::new();
        }
        match shlex::split(&self.extra_jvm_args) {
            Some(args) => args,
            None => {
                warn!("[config] Ignoring extra_jvm_args with unbalanced quotes: {}", self.extra_jvm_args);
                Vec::new()
            }
        }
    }
}

/// Owner of the config file. Clone the snapshot from [`ConfigStore::get`];
/// mutate through [`ConfigStore::update`].
pub struct ConfigStore {
    path: PathBuf,
    current: Mutex<LauncherConfig>,
}

impl ConfigStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = match read_json::<LauncherConfig>(&path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("[config] No config at {:?}, writing defaults", path);
                let config = LauncherConfig::default();
                persist(&path, &config)?;
                config
            }
            Err(e) => {
                warn!("[config] {:#}; falling back to defaults", e);
                LauncherConfig::default()
            }
        };

        Ok(Self {
            path,
            current: Mutex::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> LauncherConfig {
        self.current.lock().await.clone()
    }

    /// Apply `f` and persist the result. On a write failure the in-memory
    /// config is left unchanged.
    pub async fn update<F>(&self, f: F) -> Result<LauncherConfig, ConfigError>
    where
        F: FnOnce(&mut LauncherConfig),
    {
        let mut guard = self.current.lock().await;
        let mut next = guard.clone();
        f(&mut next);
        persist(&self.path, &next)?;
        *guard = next.clone();
        Ok(next)
    }
}

fn persist(path: &Path, config: &LauncherConfig) -> Result<(), ConfigError> {
    write_json_atomic(path, config).map_err(|source| ConfigError::Persist {
        path: path.to_path_buf(),
        source,
    })
}
