#![allow(dead_code)]

use anvil_lib::game::distribution::{AvailableVersion, InstalledVersion};
use anvil_lib::{DistributionService, LaunchOptions, LoaderKind, ProgressReporter, SharedCache, VersionMetadata};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes descriptors into a real shared cache the way an installer would,
/// and records what it was asked to do.
pub struct FakeDistribution {
    cache: SharedCache,
    calls: Mutex<Vec<String>>,
    /// Id the loader installer produces, `{base}` replaced by the base version.
    loader_ids: Mutex<HashMap<LoaderKind, String>>,
    metadata: Mutex<HashMap<String, VersionMetadata>>,
    available: Mutex<Vec<AvailableVersion>>,
    command: Mutex<Vec<String>>,
    last_options: Mutex<Option<LaunchOptions>>,
    fail_versions: Mutex<Vec<String>>,
    install_delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeDistribution {
    pub fn new(cache_root: &Path) -> Self {
        Self {
            cache: SharedCache::new(cache_root),
            calls: Mutex::new(Vec::new()),
            loader_ids: Mutex::new(HashMap::new()),
            metadata: Mutex::new(HashMap::new()),
            available: Mutex::new(Vec::new()),
            command: Mutex::new(Vec::new()),
            last_options: Mutex::new(None),
            fail_versions: Mutex::new(Vec::new()),
            install_delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_install_delay(mut self, delay: Duration) -> Self {
        self.install_delay = delay;
        self
    }

    pub fn with_loader_id(self, loader: LoaderKind, template: &str) -> Self {
        self.loader_ids.lock().unwrap().insert(loader, template.to_string());
        self
    }

    pub fn with_metadata(self, version_id: &str, meta: VersionMetadata) -> Self {
        self.metadata.lock().unwrap().insert(version_id.to_string(), meta);
        self
    }

    pub fn with_available(self, versions: &[(&str, &str)]) -> Self {
        *self.available.lock().unwrap() = versions
            .iter()
            .map(|(id, kind)| AvailableVersion {
                id: id.to_string(),
                version_type: kind.to_string(),
            })
            .collect();
        self
    }

    pub fn with_command(self, argv: &[&str]) -> Self {
        self.set_command(argv);
        self
    }

    pub fn failing_install(self, version_id: &str) -> Self {
        self.fail_versions.lock().unwrap().push(version_id.to_string());
        self
    }

    pub fn set_command(&self, argv: &[&str]) {
        *self.command.lock().unwrap() = argv.iter().map(|s| s.to_string()).collect();
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_concurrent_installs(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<LaunchOptions> {
        self.last_options.lock().unwrap().clone()
    }

    fn write_descriptor(&self, id: &str, inherits_from: Option<&str>) {
        let path = self.cache.version_descriptor(id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body = match inherits_from {
            Some(parent) => serde_json::json!({ "id": id, "inheritsFrom": parent }),
            None => serde_json::json!({ "id": id }),
        };
        std::fs::write(path, body.to_string()).unwrap();
    }

    async fn busy(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.install_delay.is_zero() {
            tokio::time::sleep(self.install_delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DistributionService for FakeDistribution {
    fn install_version<'a>(
        &'a self,
        version_id: &'a str,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(format!("version:{}", version_id));
            self.busy().await;
            if self.fail_versions.lock().unwrap().iter().any(|v| v == version_id) {
                anyhow::bail!("manifest has no version {}", version_id);
            }
            reporter.status("install", "writing descriptor");
            self.write_descriptor(version_id, None);
            Ok(())
        })
    }

    fn install_loader<'a>(
        &'a self,
        base_version: &'a str,
        loader: LoaderKind,
        _reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(format!("loader:{}:{}", base_version, loader.as_str()));
            self.busy().await;
            let template = self.loader_ids.lock().unwrap().get(&loader).cloned();
            if let Some(template) = template {
                let id = template.replace("{base}", base_version);
                self.write_descriptor(&id, Some(base_version));
            }
            Ok(())
        })
    }

    fn list_installed(&self) -> BoxFuture<'_, anyhow::Result<Vec<InstalledVersion>>> {
        Box::pin(async move { self.cache.installed_versions() })
    }

    fn list_available(&self) -> BoxFuture<'_, anyhow::Result<Vec<AvailableVersion>>> {
        Box::pin(async move { Ok(self.available.lock().unwrap().clone()) })
    }

    fn version_metadata<'a>(&'a self, version_id: &'a str) -> BoxFuture<'a, anyhow::Result<VersionMetadata>> {
        Box::pin(async move {
            self.metadata
                .lock()
                .unwrap()
                .get(version_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no metadata for {}", version_id))
        })
    }

    fn build_launch_command<'a>(
        &'a self,
        version_id: &'a str,
        options: &'a LaunchOptions,
    ) -> BoxFuture<'a, anyhow::Result<Vec<String>>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(format!("command:{}", version_id));
            *self.last_options.lock().unwrap() = Some(options.clone());
            Ok(self.command.lock().unwrap().clone())
        })
    }
}
