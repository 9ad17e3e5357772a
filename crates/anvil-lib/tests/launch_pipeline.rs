#![cfg(unix)]

mod common;

use anvil_lib::game::launcher::{AuthlibInjector, SessionRegistry};
use anvil_lib::game::runtime::{JavaRequirement, RuntimeInstaller, SystemJavaDetector};
use anvil_lib::{
    ConfigStore, InstanceStore, LaunchPipeline, LaunchSupervisor, LoaderKind, PipelineError, ProfileStore,
    ProgressReporter, RuntimeSelector, RuntimeSpec, SilentProgressReporter, VersionResolver,
};
use common::{init_logging, FakeDistribution};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct NoInstaller;

impl RuntimeInstaller for NoInstaller {
    fn install<'a>(
        &'a self,
        _requirement: &'a JavaRequirement,
        _target_dir: &'a Path,
        _reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, anyhow::Result<PathBuf>> {
        Box::pin(async { anyhow::bail!("offline") })
    }
}

struct Setup {
    _tmp: TempDir,
    fake: Arc<FakeDistribution>,
    pipeline: LaunchPipeline,
    instances: Arc<InstanceStore>,
    profiles: Arc<ProfileStore>,
}

async fn setup() -> Setup {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let home = tmp.path().join("home");
    let game = tmp.path().join("game");

    let fake = Arc::new(
        FakeDistribution::new(&game)
            .with_loader_id(LoaderKind::Fabric, "fabric-loader-0.15.7-{base}")
            .with_command(&["sh", "-c", "echo running; sleep 1"])
            .with_available(&[("1.20.1", "release"), ("24w10a", "snapshot")]),
    );
    let cache = fake.cache().clone();

    let config = Arc::new(ConfigStore::load(home.join("config.json")).await.unwrap());
    config
        .update(|c| {
            c.java_path = Some(PathBuf::from("/usr/bin/java"));
            c.launch_grace_ms = 300;
            c.username = "Alex".into();
        })
        .await
        .unwrap();

    let username = config.get().await.username;
    let profiles = Arc::new(ProfileStore::load(home.join("profiles.json"), &username).await.unwrap());
    let instances = Arc::new(InstanceStore::new(home.join("instances.json"), game.join("instances")));

    let resolver = Arc::new(VersionResolver::new(fake.clone(), cache.clone()));
    let selector = Arc::new(RuntimeSelector::new(
        fake.clone(),
        cache,
        Arc::new(NoInstaller),
        SystemJavaDetector::new(None, Vec::new(), false),
    ));
    let supervisor = Arc::new(LaunchSupervisor::new(
        fake.clone(),
        config.clone(),
        Arc::new(AuthlibInjector::new(home.join("authlib"), "ely.by").unwrap()),
        Arc::new(SessionRegistry::new()),
    ));

    let pipeline = LaunchPipeline::new(
        resolver,
        selector,
        supervisor,
        instances.clone(),
        profiles.clone(),
        config,
    );

    Setup {
        _tmp: tmp,
        fake,
        pipeline,
        instances,
        profiles,
    }
}

fn silent() -> Arc<dyn ProgressReporter> {
    Arc::new(SilentProgressReporter)
}

#[tokio::test]
async fn instance_launch_runs_every_step_in_order() {
    let s = setup().await;
    let instance = s.instances.create("Pack", "1.20.1", LoaderKind::Fabric).await.unwrap();
    let steve = s.profiles.create_offline("Steve").await.unwrap();

    let session = s.pipeline.launch_instance("Pack", silent()).await.unwrap();
    assert_eq!(session.info().version_id, "fabric-loader-0.15.7-1.20.1");
    assert_eq!(session.info().profile_name, "Steve");

    assert_eq!(
        s.fake.calls(),
        vec![
            "version:1.20.1",
            "loader:1.20.1:fabric",
            "command:fabric-loader-0.15.7-1.20.1"
        ]
    );

    let options = s.fake.last_options().unwrap();
    assert_eq!(options.game_dir(), Some(instance.root_path.as_path()));
    assert_eq!(options.profile.id, steve.id);
    assert_eq!(options.runtime, RuntimeSpec::explicit("/usr/bin/java"));

    assert_eq!(session.wait_for_exit().await, Some(0));
}

#[tokio::test]
async fn direct_version_launch_uses_shared_root() {
    let s = setup().await;

    let session = s
        .pipeline
        .launch_version("1.20.1", LoaderKind::None, silent())
        .await
        .unwrap();
    assert_eq!(session.info().version_id, "1.20.1");
    // Fresh profile file: the default profile is named after the configured username.
    assert_eq!(session.info().profile_name, "Alex");
    assert_eq!(s.fake.last_options().unwrap().game_dir(), None);
    session.wait_for_exit().await;
}

#[tokio::test]
async fn unknown_instance_is_reported() {
    let s = setup().await;
    let err = s.pipeline.launch_instance("Nope", silent()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownInstance(ref name) if name == "Nope"));
    assert!(s.fake.calls().is_empty());
}

#[tokio::test]
async fn snapshots_follow_the_config_toggle() {
    let s = setup().await;
    let versions = s.pipeline.available_versions().await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].id, "1.20.1");
}
