//! Java runtime selection.
//!
//! Cascade: explicit user override, then the runtime the version descriptor
//! asks for (installing it into the shared runtime cache when missing), then
//! whatever Java the host already has. Selection never fails; the worst case
//! is an [`RuntimeSpec::Explicit`] with an empty path, which the launcher
//! rejects.

mod detect;
mod install;

pub use detect::{find_java_executable, parse_major_version, scan_system_javas, verify_java, DetectedJava, SystemJavaDetector};
pub use install::{RuntimeInstaller, ZuluRuntimeInstaller, ZULU_API_BASE};

use crate::game::distribution::{DistributionService, SharedCache, VersionMetadata};
use crate::progress::ProgressReporter;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Which Java the game will run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RuntimeSpec {
    /// A runtime component installed in the shared runtime cache.
    Bundled { component: String, major_version: u32 },
    /// A concrete executable. An empty path means nothing usable was found.
    Explicit { executable_path: PathBuf },
}

impl RuntimeSpec {
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        RuntimeSpec::Explicit {
            executable_path: path.into(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, RuntimeSpec::Explicit { executable_path } if executable_path.as_os_str().is_empty())
    }

    /// Executable to run, looking bundled components up in `cache`.
    pub fn executable(&self, cache: &SharedCache) -> Option<PathBuf> {
        match self {
            RuntimeSpec::Bundled { component, .. } => cache.bundled_java(component),
            RuntimeSpec::Explicit { executable_path } if executable_path.as_os_str().is_empty() => None,
            RuntimeSpec::Explicit { executable_path } => Some(executable_path.clone()),
        }
    }
}

/// A runtime component and the Java major version it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRequirement {
    pub component: String,
    pub major_version: u32,
}

impl JavaRequirement {
    pub fn from_metadata(meta: &VersionMetadata) -> Option<Self> {
        match (&meta.java_component, meta.java_major) {
            (Some(component), Some(major)) => Some(Self {
                component: component.clone(),
                major_version: major,
            }),
            (Some(component), None) => Some(Self {
                component: component.clone(),
                major_version: major_for_component(component).unwrap_or_else(|| {
                    warn!("Unknown runtime component {}, assuming Java 17", component);
                    17
                }),
            }),
            (None, Some(major)) => Some(Self {
                component: format!("java-runtime-{}", major),
                major_version: major,
            }),
            (None, None) => None,
        }
    }
}

/// Java major version of a well-known runtime component name.
pub fn major_for_component(component: &str) -> Option<u32> {
    match component {
        "jre-legacy" => Some(8),
        "java-runtime-alpha" => Some(16),
        "java-runtime-beta" | "java-runtime-gamma" | "java-runtime-gamma-snapshot" => Some(17),
        "java-runtime-delta" => Some(21),
        "java-runtime-epsilon" => Some(25),
        other => other.strip_prefix("java-runtime-").and_then(|n| n.parse().ok()),
    }
}

pub struct RuntimeSelector {
    distribution: Arc<dyn DistributionService>,
    cache: SharedCache,
    installer: Arc<dyn RuntimeInstaller>,
    detector: SystemJavaDetector,
    /// One install at a time per runtime component.
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RuntimeSelector {
    pub fn new(
        distribution: Arc<dyn DistributionService>,
        cache: SharedCache,
        installer: Arc<dyn RuntimeInstaller>,
        detector: SystemJavaDetector,
    ) -> Self {
        Self {
            distribution,
            cache,
            installer,
            detector,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn select(
        &self,
        version_id: &str,
        user_override: Option<&Path>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> RuntimeSpec {
        if let Some(path) = user_override.filter(|p| !p.as_os_str().is_empty() && *p != Path::new("java")) {
            info!("Using user-selected Java: {:?}", path);
            return RuntimeSpec::explicit(path);
        }

        let Some(requirement) = self.requirement_for(version_id).await else {
            debug!("{} declares no Java requirement, auto-detecting", version_id);
            return self.autodetect().await;
        };

        if let Some(existing) = self.cache.bundled_java(&requirement.component) {
            debug!("Runtime {} already installed at {:?}", requirement.component, existing);
            return bundled(requirement);
        }

        let _guard = self.lock_component(&requirement.component).await;
        // Another launch may have installed it while we waited.
        if let Some(existing) = self.cache.bundled_java(&requirement.component) {
            debug!("Runtime {} installed concurrently at {:?}", requirement.component, existing);
            return bundled(requirement);
        }

        info!(
            "Installing runtime {} (Java {}) for {}",
            requirement.component, requirement.major_version, version_id
        );
        reporter.status("runtime", &format!("Installing Java {}", requirement.major_version));
        let target = self.cache.runtime_component_dir(&requirement.component);

        match self.installer.install(&requirement, &target, reporter.clone()).await {
            Ok(java) => {
                info!("Runtime {} installed: {:?}", requirement.component, java);
                bundled(requirement)
            }
            Err(e) => {
                warn!(
                    "Failed to install runtime {}: {:#}. Falling back to system Java",
                    requirement.component, e
                );
                self.autodetect().await
            }
        }
    }

    async fn lock_component(&self, component: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(component.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn requirement_for(&self, version_id: &str) -> Option<JavaRequirement> {
        let meta = match self.distribution.version_metadata(version_id).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Distribution metadata for {} unavailable ({:#}); reading the cache", version_id, e);
                match self.cache.version_metadata(version_id) {
                    Ok(meta) => meta,
                    Err(e) => {
                        warn!("Could not read Java requirement of {}: {:#}", version_id, e);
                        return None;
                    }
                }
            }
        };
        JavaRequirement::from_metadata(&meta)
    }

    async fn autodetect(&self) -> RuntimeSpec {
        let detector = self.detector.clone();
        let found = tokio::task::spawn_blocking(move || detector.detect())
            .await
            .unwrap_or_else(|e| {
                warn!("Java detection task failed: {}", e);
                None
            });

        match found {
            Some(path) => {
                info!("Auto-detected Java: {:?}", path);
                RuntimeSpec::explicit(path)
            }
            None => {
                warn!("No Java runtime found on this system");
                RuntimeSpec::explicit(PathBuf::new())
            }
        }
    }
}

fn bundled(requirement: JavaRequirement) -> RuntimeSpec {
    RuntimeSpec::Bundled {
        component: requirement.component,
        major_version: requirement.major_version,
    }
}
