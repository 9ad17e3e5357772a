//! Turns `(base version, loader)` into a version id that can be launched.
//!
//! Loader installers are third-party and name their output however they
//! like, so after installing we search the shared cache for the id instead
//! of predicting it.

use crate::game::distribution::{AvailableVersion, DistributionService, InstalledVersion, SharedCache};
use crate::models::LoaderKind;
use crate::progress::ProgressReporter;
use crate::utils::version::compare_versions;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to install {version}: {source:#}")]
    Install {
        version: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No installed {loader} version found for {base_version}")]
    LoaderNotFound { base_version: String, loader: LoaderKind },

    #[error("Failed to prepare game directory {path:?}: {source}")]
    GameDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list versions: {0:#}")]
    Listing(#[source] anyhow::Error),
}

pub struct VersionResolver {
    distribution: Arc<dyn DistributionService>,
    cache: SharedCache,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl VersionResolver {
    pub fn new(distribution: Arc<dyn DistributionService>, cache: SharedCache) -> Self {
        Self {
            distribution,
            cache,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve to a launchable id. A loader whose output cannot be found in
    /// the cache degrades to the plain base version with a warning.
    pub async fn resolve(
        &self,
        base_version: &str,
        loader: LoaderKind,
        target_dir: Option<&Path>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<String, ResolveError> {
        match self.resolve_strict(base_version, loader, target_dir, reporter).await {
            Err(ResolveError::LoaderNotFound { base_version, loader }) => {
                warn!(
                    "No {} version found for {} after installation, launching the base version instead",
                    loader, base_version
                );
                Ok(base_version)
            }
            other => other,
        }
    }

    /// Like [`resolve`](Self::resolve) but surfaces `LoaderNotFound`.
    pub async fn resolve_strict(
        &self,
        base_version: &str,
        loader: LoaderKind,
        target_dir: Option<&Path>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<String, ResolveError> {
        if let Some(dir) = target_dir {
            prepare_game_dir(dir, loader).await?;
        }

        // Installs of one base version (and loaders built on it) never overlap.
        let _guard = self.lock_version(base_version).await;

        info!("Installing {} into {:?}", base_version, self.cache.root());
        reporter.status("install", &format!("Installing {}", base_version));
        self.distribution
            .install_version(base_version, reporter.clone())
            .await
            .map_err(|source| ResolveError::Install {
                version: base_version.to_string(),
                source,
            })?;

        if !loader.is_modded() {
            self.check_libraries(base_version);
            return Ok(base_version.to_string());
        }

        reporter.status("install", &format!("Installing {} for {}", loader, base_version));
        self.distribution
            .install_loader(base_version, loader, reporter.clone())
            .await
            .map_err(|source| ResolveError::Install {
                version: format!("{} {}", base_version, loader),
                source,
            })?;

        let installed = self.installed_versions().await;
        match match_loader_version(&installed, base_version, loader) {
            Some(id) => {
                info!("Resolved {} + {} to {}", base_version, loader, id);
                self.check_libraries(&id);
                Ok(id)
            }
            None => Err(ResolveError::LoaderNotFound {
                base_version: base_version.to_string(),
                loader,
            }),
        }
    }

    /// Versions offered upstream. Snapshots and old betas are hidden unless asked for.
    pub async fn available_versions(&self, include_snapshots: bool) -> Result<Vec<AvailableVersion>, ResolveError> {
        let versions = self.distribution.list_available().await.map_err(ResolveError::Listing)?;
        Ok(versions
            .into_iter()
            .filter(|v| include_snapshots || v.is_release())
            .collect())
    }

    async fn installed_versions(&self) -> Vec<InstalledVersion> {
        match self.distribution.list_installed().await {
            Ok(list) => list,
            Err(e) => {
                warn!("Distribution could not list installed versions ({:#}); scanning the cache", e);
                self.cache.installed_versions().unwrap_or_else(|e| {
                    warn!("Failed to scan {:?}: {:#}", self.cache.versions_dir(), e);
                    Vec::new()
                })
            }
        }
    }

    fn check_libraries(&self, version_id: &str) {
        match self.cache.missing_libraries(version_id) {
            Ok(missing) if !missing.is_empty() => warn!(
                "{} has {} missing libraries after install (first: {})",
                version_id,
                missing.len(),
                missing[0]
            ),
            Ok(_) => {}
            Err(e) => debug!("Library check for {} skipped: {:#}", version_id, e),
        }
    }

    async fn lock_version(&self, version_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(version_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

async fn prepare_game_dir(dir: &Path, loader: LoaderKind) -> Result<(), ResolveError> {
    let target = if loader.is_modded() { dir.join("mods") } else { dir.to_path_buf() };
    tokio::fs::create_dir_all(&target)
        .await
        .map_err(|source| ResolveError::GameDir {
            path: target.clone(),
            source,
        })?;
    debug!("Game directory ready: {:?}", dir);
    Ok(())
}

/// Pick the installed id produced by `loader` for `base_version`.
///
/// Ids starting with `{base}-{loader}` beat ids that merely contain both the
/// base version (as a whole version token) and the loader name. Among several
/// candidates the highest version wins. Forge never matches NeoForge ids.
pub fn match_loader_version(installed: &[InstalledVersion], base_version: &str, loader: LoaderKind) -> Option<String> {
    if !loader.is_modded() {
        return None;
    }

    let loader_name = loader.as_str();
    let base = base_version.to_lowercase();
    let prefix = format!("{}-{}", base, loader_name);

    let mut prefixed = Vec::new();
    let mut loose = Vec::new();
    for version in installed {
        let id = version.id.to_lowercase();
        if loader == LoaderKind::Forge && id.contains("neoforge") {
            continue;
        }
        if id.starts_with(&prefix) {
            prefixed.push(&version.id);
        } else if id.contains(loader_name) && contains_version_token(&id, &base) {
            loose.push(&version.id);
        }
    }

    let best = |candidates: Vec<&String>| {
        candidates
            .into_iter()
            .max_by(|a, b| compare_versions(a, b))
            .cloned()
    };
    best(prefixed).or_else(|| best(loose))
}

/// `needle` occurs in `haystack` without being part of a longer version,
/// so `1.20` is not found in `fabric-loader-0.15.0-1.20.1`.
fn contains_version_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_version_char = |c: char| c.is_ascii_digit() || c == '.';
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_version_char) && !after.is_some_and(is_version_char)
    })
}
