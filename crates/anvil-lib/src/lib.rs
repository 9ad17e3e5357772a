//! Launch orchestration engine for a moddable Minecraft client.
//!
//! The crate turns a `(base version, loader)` pair into a launchable version id,
//! picks a Java runtime, manages isolated per-configuration instances, starts and
//! supervises the game process, signs players in through an OAuth2 provider and
//! searches an external add-on registry.
//!
//! Physically installing game files and assembling the final command line is
//! delegated to a [`game::distribution::DistributionService`] implementation.

pub mod api;
pub mod auth;
pub mod config;
pub mod game;
pub mod models;
pub mod net;
pub mod paths;
pub mod progress;
pub mod utils;

pub use api::modrinth::{ContentQuery, ContentRegistry, ContentSummary, ProjectType};
pub use auth::{AuthError, AuthStage, OAuthFlow, OAuthProvider, ProfileError, ProfileStore};
pub use config::{ConfigError, ConfigStore, LauncherConfig};
pub use game::distribution::{DistributionService, SharedCache, VersionMetadata};
pub use game::instance::{InstanceError, InstanceStore};
pub use game::launcher::{GameSession, LaunchError, LaunchOptions, LaunchSupervisor};
pub use game::pipeline::{LaunchPipeline, PipelineError};
pub use game::resolver::{ResolveError, VersionResolver};
pub use game::runtime::{RuntimeSelector, RuntimeSpec};
pub use models::{ContentCategory, Instance, LoaderKind, Profile, ProfileKind};
pub use paths::LauncherPaths;
pub use progress::{ChannelProgressReporter, Progress, ProgressReporter, SilentProgressReporter};
