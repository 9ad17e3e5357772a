use crate::models::Profile;
use crate::utils::persist::{read_json, write_json_atomic};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

const DEFAULT_PROFILE_NAME: &str = "Player";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Cannot delete the last remaining profile")]
    LastProfile,

    #[error("Profile {0} does not exist")]
    NotFound(String),

    #[error("Failed to persist profiles to {path:?}: {source:#}")]
    Persist {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: Vec<Profile>,
    #[serde(default)]
    current_profile: Option<String>,
}

impl ProfileFile {
    fn with_default(name: &str) -> Self {
        let name = match name.trim() {
            "" => DEFAULT_PROFILE_NAME,
            trimmed => trimmed,
        };
        let profile = Profile::offline(name);
        Self {
            current_profile: Some(profile.id.clone()),
            profiles: vec![profile],
        }
    }

    /// The selected profile, or the first one when the selection is dangling.
    fn current(&self) -> Option<&Profile> {
        self.current_profile
            .as_deref()
            .and_then(|id| self.profiles.iter().find(|p| p.id == id))
            .or_else(|| self.profiles.first())
    }
}

/// The player profile list and the current selection, persisted as one JSON file.
pub struct ProfileStore {
    path: PathBuf,
    state: Mutex<ProfileFile>,
}

impl ProfileStore {
    /// Load profiles from `path`. A missing, empty or unreadable file starts
    /// over with a single offline profile called `default_name` (the configured
    /// `username`; `Player` when blank).
    pub async fn load(path: impl Into<PathBuf>, default_name: &str) -> Result<Self, ProfileError> {
        let path = path.into();
        let state = match read_json::<ProfileFile>(&path) {
            Ok(Some(file)) if !file.profiles.is_empty() => file,
            Ok(_) => {
                info!("[auth] No profiles in {:?}, creating the default profile", path);
                let file = ProfileFile::with_default(default_name);
                persist(&path, &file)?;
                file
            }
            Err(e) => {
                warn!("[auth] {:#}; recreating the default profile", e);
                let file = ProfileFile::with_default(default_name);
                persist(&path, &file)?;
                file
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<Profile> {
        self.state.lock().await.profiles.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Profile> {
        self.state.lock().await.profiles.iter().find(|p| p.id == id).cloned()
    }

    pub async fn current(&self) -> Option<Profile> {
        self.state.lock().await.current().cloned()
    }

    /// Create an offline profile and select it.
    pub async fn create_offline(&self, name: &str) -> Result<Profile, ProfileError> {
        self.add(Profile::offline(name.trim())).await
    }

    /// Append `profile` and select it.
    pub async fn add(&self, profile: Profile) -> Result<Profile, ProfileError> {
        info!("[auth] Adding {:?} profile '{}'", profile.kind, profile.display_name);
        self.mutate(|file| {
            file.current_profile = Some(profile.id.clone());
            file.profiles.push(profile.clone());
            Ok(())
        })
        .await?;
        Ok(profile)
    }

    pub async fn select(&self, id: &str) -> Result<Profile, ProfileError> {
        let mut selected = None;
        self.mutate(|file| {
            let profile = file
                .profiles
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            selected = Some(profile.clone());
            file.current_profile = Some(id.to_string());
            Ok(())
        })
        .await?;
        selected.ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    /// Remove a profile. The last profile cannot be removed; removing the
    /// current one selects the first remaining profile.
    pub async fn delete(&self, id: &str) -> Result<(), ProfileError> {
        self.mutate(|file| {
            let index = file
                .profiles
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            if file.profiles.len() == 1 {
                return Err(ProfileError::LastProfile);
            }
            file.profiles.remove(index);
            if file.current_profile.as_deref() == Some(id) {
                file.current_profile = file.profiles.first().map(|p| p.id.clone());
            }
            Ok(())
        })
        .await
    }

    pub async fn update_tokens(
        &self,
        id: &str,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<Profile, ProfileError> {
        let mut updated = None;
        self.mutate(|file| {
            let profile = file
                .profiles
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            profile.access_token = Some(access_token);
            // Providers may omit the refresh token when it did not rotate.
            if refresh_token.is_some() {
                profile.refresh_token = refresh_token;
            }
            updated = Some(profile.clone());
            Ok(())
        })
        .await?;
        updated.ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    /// Apply `f` to a copy and persist it; memory only changes after a successful write.
    async fn mutate<F>(&self, f: F) -> Result<(), ProfileError>
    where
        F: FnOnce(&mut ProfileFile) -> Result<(), ProfileError>,
    {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        f(&mut next)?;
        persist(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

fn persist(path: &Path, file: &ProfileFile) -> Result<(), ProfileError> {
    write_json_atomic(path, file).map_err(|source| ProfileError::Persist {
        path: path.to_path_buf(),
        source,
    })
}
