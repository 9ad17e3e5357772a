//! Boundary to the component that physically installs game files and builds
//! the final command line.
//!
//! The launcher core never downloads client jars, libraries or assets itself.
//! It asks a [`DistributionService`] to do so and then reads the result back
//! from the [`SharedCache`].

mod cache;
mod maven;

pub use cache::SharedCache;
pub use maven::{library_relative_path, CoordinateError, MavenCoordinate};

use crate::game::launcher::LaunchOptions;
use crate::models::LoaderKind;
use crate::progress::ProgressReporter;
use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A version present in the shared cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstalledVersion {
    pub id: String,
}

/// A version offered by the upstream manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableVersion {
    pub id: String,
    /// `release`, `snapshot`, `old_beta`, `old_alpha`.
    #[serde(rename = "type")]
    pub version_type: String,
}

impl AvailableVersion {
    pub fn is_release(&self) -> bool {
        self.version_type == "release"
    }
}

/// The Java requirement a version descriptor declares, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub java_component: Option<String>,
    pub java_major: Option<u32>,
}

/// Installs versions and loaders into the shared cache and assembles launch commands.
///
/// Every method may do network or disk I/O; callers run them on the async
/// runtime and never on a UI thread.
pub trait DistributionService: Send + Sync {
    /// Install the unmodified `version_id` (client jar, libraries, assets).
    fn install_version<'a>(
        &'a self,
        version_id: &'a str,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<()>>;

    /// Install `loader` on top of an already-installed `base_version`. The
    /// resulting version id is whatever the loader installer chooses.
    fn install_loader<'a>(
        &'a self,
        base_version: &'a str,
        loader: LoaderKind,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<()>>;

    fn list_installed(&self) -> BoxFuture<'_, Result<Vec<InstalledVersion>>>;

    fn list_available(&self) -> BoxFuture<'_, Result<Vec<AvailableVersion>>>;

    fn version_metadata<'a>(&'a self, version_id: &'a str) -> BoxFuture<'a, Result<VersionMetadata>>;

    /// Full argv, starting with the Java executable.
    fn build_launch_command<'a>(
        &'a self,
        version_id: &'a str,
        options: &'a LaunchOptions,
    ) -> BoxFuture<'a, Result<Vec<String>>>;
}
