//! Glue for the common path: resolve, pick a runtime, launch.

use crate::auth::{ProfileError, ProfileStore};
use crate::config::ConfigStore;
use crate::game::distribution::AvailableVersion;
use crate::game::instance::{InstanceError, InstanceStore};
use crate::game::launcher::{GameSession, LaunchError, LaunchSupervisor};
use crate::game::resolver::{ResolveError, VersionResolver};
use crate::game::runtime::RuntimeSelector;
use crate::models::{LoaderKind, Profile};
use crate::progress::ProgressReporter;
use log::info;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Instance '{0}' does not exist")]
    UnknownInstance(String),

    #[error("No profile is selected")]
    NoProfile,

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

pub struct LaunchPipeline {
    resolver: Arc<VersionResolver>,
    selector: Arc<RuntimeSelector>,
    supervisor: Arc<LaunchSupervisor>,
    instances: Arc<InstanceStore>,
    profiles: Arc<ProfileStore>,
    config: Arc<ConfigStore>,
}

impl LaunchPipeline {
    pub fn new(
        resolver: Arc<VersionResolver>,
        selector: Arc<RuntimeSelector>,
        supervisor: Arc<LaunchSupervisor>,
        instances: Arc<InstanceStore>,
        profiles: Arc<ProfileStore>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            resolver,
            selector,
            supervisor,
            instances,
            profiles,
            config,
        }
    }

    pub fn supervisor(&self) -> &Arc<LaunchSupervisor> {
        &self.supervisor
    }

    /// Launch a stored instance inside its own directory with the current profile.
    pub async fn launch_instance(
        &self,
        name: &str,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<GameSession, PipelineError> {
        let instance = self
            .instances
            .get(name)
            .await?
            .ok_or_else(|| PipelineError::UnknownInstance(name.to_string()))?;

        info!(
            "Launching instance '{}' ({} {})",
            instance.name, instance.base_version, instance.loader_kind
        );
        self.run(
            &instance.base_version,
            instance.loader_kind,
            Some(&instance.root_path),
            reporter,
        )
        .await
    }

    /// Launch a version directly in the shared game root.
    pub async fn launch_version(
        &self,
        base_version: &str,
        loader: LoaderKind,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<GameSession, PipelineError> {
        self.run(base_version, loader, None, reporter).await
    }

    pub async fn available_versions(&self) -> Result<Vec<AvailableVersion>, PipelineError> {
        let include_snapshots = self.config.get().await.show_snapshots;
        Ok(self.resolver.available_versions(include_snapshots).await?)
    }

    async fn run(
        &self,
        base_version: &str,
        loader: LoaderKind,
        game_dir: Option<&Path>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<GameSession, PipelineError> {
        let profile = self.current_profile().await?;

        let version_id = self
            .resolver
            .resolve(base_version, loader, game_dir, reporter.clone())
            .await?;

        let config = self.config.get().await;
        let runtime = self
            .selector
            .select(&version_id, config.java_override(), reporter.clone())
            .await;

        reporter.status("launch", &format!("Starting {}", version_id));
        Ok(self.supervisor.launch(&version_id, &profile, &runtime, game_dir).await?)
    }

    async fn current_profile(&self) -> Result<Profile, PipelineError> {
        self.profiles.current().await.ok_or(PipelineError::NoProfile)
    }
}
