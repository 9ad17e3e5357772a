#![cfg(unix)]

mod common;

use anvil_lib::game::runtime::{JavaRequirement, RuntimeInstaller, SystemJavaDetector};
use anvil_lib::{ProgressReporter, RuntimeSelector, RuntimeSpec, SilentProgressReporter, VersionMetadata};
use common::{init_logging, FakeDistribution};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Lays down `bin/java` like a real archive would, or fails on request.
struct FakeInstaller {
    fail: bool,
    delay: Duration,
    installs: AtomicUsize,
}

impl FakeInstaller {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            delay: Duration::ZERO,
            installs: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            delay,
            installs: AtomicUsize::new(0),
        })
    }
}

impl RuntimeInstaller for FakeInstaller {
    fn install<'a>(
        &'a self,
        _requirement: &'a JavaRequirement,
        target_dir: &'a Path,
        _reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, anyhow::Result<PathBuf>> {
        Box::pin(async move {
            self.installs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("no package for this platform");
            }
            let java = target_dir.join("zulu17.44.53-ca-jre17.0.8.1-linux_x64/bin/java");
            std::fs::create_dir_all(java.parent().unwrap())?;
            std::fs::write(&java, b"")?;
            Ok(java)
        })
    }
}

fn silent() -> Arc<dyn ProgressReporter> {
    Arc::new(SilentProgressReporter)
}

/// A detector that only looks at `root`, never at the host.
fn detector_in(root: &Path) -> SystemJavaDetector {
    SystemJavaDetector::new(None, vec![root.to_path_buf()], false)
}

fn gamma() -> VersionMetadata {
    VersionMetadata {
        java_component: Some("java-runtime-gamma".into()),
        java_major: Some(17),
    }
}

#[tokio::test]
async fn override_wins_over_metadata() {
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(FakeDistribution::new(tmp.path()).with_metadata("1.20.1", gamma()));
    let installer = FakeInstaller::new(false);
    let selector = RuntimeSelector::new(fake.clone(), fake.cache().clone(), installer.clone(), detector_in(tmp.path()));

    let spec = selector
        .select("1.20.1", Some(Path::new("/opt/custom/bin/java")), silent())
        .await;

    assert_eq!(spec, RuntimeSpec::explicit("/opt/custom/bin/java"));
    assert_eq!(installer.installs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn present_component_is_used_without_installing() {
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(FakeDistribution::new(tmp.path()).with_metadata("1.20.1", gamma()));
    let java = fake.cache().runtime_component_dir("java-runtime-gamma").join("bin/java");
    std::fs::create_dir_all(java.parent().unwrap()).unwrap();
    std::fs::write(&java, b"").unwrap();

    let installer = FakeInstaller::new(false);
    let selector = RuntimeSelector::new(fake.clone(), fake.cache().clone(), installer.clone(), detector_in(tmp.path()));
    let spec = selector.select("1.20.1", None, silent()).await;

    assert_eq!(
        spec,
        RuntimeSpec::Bundled {
            component: "java-runtime-gamma".into(),
            major_version: 17
        }
    );
    assert_eq!(spec.executable(fake.cache()), Some(java));
    assert_eq!(installer.installs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_component_is_installed_into_the_cache() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(FakeDistribution::new(tmp.path()).with_metadata("1.20.1", gamma()));
    let installer = FakeInstaller::new(false);
    let selector = RuntimeSelector::new(fake.clone(), fake.cache().clone(), installer.clone(), detector_in(tmp.path()));

    let spec = selector.select("1.20.1", None, silent()).await;

    assert!(matches!(spec, RuntimeSpec::Bundled { major_version: 17, .. }));
    assert_eq!(installer.installs.load(Ordering::SeqCst), 1);
    assert!(spec.executable(fake.cache()).is_some());
}

#[tokio::test]
async fn concurrent_launches_install_a_shared_component_once() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(
        FakeDistribution::new(tmp.path())
            .with_metadata("1.20.1", gamma())
            .with_metadata("1.20.4", gamma()),
    );
    let installer = FakeInstaller::slow(Duration::from_millis(300));
    let selector = RuntimeSelector::new(fake.clone(), fake.cache().clone(), installer.clone(), detector_in(tmp.path()));

    let (a, b) = tokio::join!(
        selector.select("1.20.1", None, silent()),
        selector.select("1.20.4", None, silent())
    );

    assert_eq!(installer.installs.load(Ordering::SeqCst), 1);
    assert_eq!(a, b);
    assert!(matches!(a, RuntimeSpec::Bundled { major_version: 17, .. }));
    assert!(a.executable(fake.cache()).is_some());
}

#[tokio::test]
async fn failed_install_falls_back_to_system_java() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(FakeDistribution::new(&tmp.path().join("game")).with_metadata("1.20.1", gamma()));

    let system_root = tmp.path().join("jvm");
    let system_java = system_root.join("jdk-17/bin/java");
    std::fs::create_dir_all(system_java.parent().unwrap()).unwrap();
    std::fs::write(&system_java, b"").unwrap();

    let selector = RuntimeSelector::new(
        fake.clone(),
        fake.cache().clone(),
        FakeInstaller::new(true),
        detector_in(&system_root),
    );
    let spec = selector.select("1.20.1", None, silent()).await;

    assert_eq!(spec, RuntimeSpec::explicit(system_java));
}

#[tokio::test]
async fn nothing_found_yields_unresolved_spec() {
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(FakeDistribution::new(tmp.path()));
    let selector = RuntimeSelector::new(
        fake.clone(),
        fake.cache().clone(),
        FakeInstaller::new(true),
        detector_in(&tmp.path().join("empty")),
    );

    // No metadata at all: straight to detection, which finds nothing.
    let spec = selector.select("1.20.1", None, silent()).await;
    assert!(spec.is_unresolved());
}

#[tokio::test]
async fn cache_descriptor_is_read_when_distribution_has_no_metadata() {
    let tmp = TempDir::new().unwrap();
    let fake = Arc::new(FakeDistribution::new(tmp.path()));
    let descriptor = fake.cache().version_descriptor("1.16.5");
    std::fs::create_dir_all(descriptor.parent().unwrap()).unwrap();
    std::fs::write(
        &descriptor,
        r#"{"id":"1.16.5","javaVersion":{"component":"jre-legacy","majorVersion":8}}"#,
    )
    .unwrap();

    let selector = RuntimeSelector::new(
        fake.clone(),
        fake.cache().clone(),
        FakeInstaller::new(false),
        detector_in(tmp.path()),
    );
    let spec = selector.select("1.16.5", None, silent()).await;

    assert_eq!(
        spec,
        RuntimeSpec::Bundled {
            component: "jre-legacy".into(),
            major_version: 8
        }
    );
}
