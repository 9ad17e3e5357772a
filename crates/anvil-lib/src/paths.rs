use crate::config::LauncherConfig;
use crate::game::distribution::SharedCache;
use std::path::{Path, PathBuf};

/// Where the launcher keeps its own state (`home`) and where the game files
/// live (`game_root`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    home: PathBuf,
    game_root: PathBuf,
}

impl LauncherPaths {
    pub fn new(home: impl Into<PathBuf>, game_root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            game_root: game_root.into(),
        }
    }

    pub fn from_config(home: impl Into<PathBuf>, config: &LauncherConfig) -> Self {
        Self::new(home, config.minecraft_dir.clone())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn game_root(&self) -> &Path {
        &self.game_root
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.json")
    }

    pub fn profiles_file(&self) -> PathBuf {
        self.home.join("profiles.json")
    }

    pub fn instances_file(&self) -> PathBuf {
        self.home.join("instances.json")
    }

    pub fn authlib_dir(&self) -> PathBuf {
        self.home.join("authlib")
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.game_root.join("instances")
    }

    pub fn shared_cache(&self) -> SharedCache {
        SharedCache::new(&self.game_root)
    }
}

/// Directory for launcher state when the caller does not choose one.
pub fn default_home() -> PathBuf {
    directories::ProjectDirs::from("", "", "anvil")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".anvil"))
}

/// The platform's conventional game directory (`%APPDATA%\.minecraft`,
/// `~/Library/Application Support/minecraft`, `~/.minecraft`).
pub fn default_game_root() -> PathBuf {
    let Some(base) = directories::BaseDirs::new() else {
        return PathBuf::from(".minecraft");
    };
    if cfg!(target_os = "windows") {
        base.data_dir().join(".minecraft")
    } else if cfg!(target_os = "macos") {
        base.data_dir().join("minecraft")
    } else {
        base.home_dir().join(".minecraft")
    }
}
