use super::naming::unique_dir_name;
use super::InstanceError;
use crate::models::{ContentCategory, Instance, LoaderKind};
use crate::utils::persist::{read_json, write_json_atomic};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type InstanceMap = BTreeMap<String, Instance>;

/// The persisted `name -> Instance` map plus the directories it points at.
///
/// Every mutation is a read-modify-write of one JSON file, serialised through
/// an async lock so concurrent create/delete calls never lose updates.
pub struct InstanceStore {
    file: PathBuf,
    instances_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl InstanceStore {
    pub fn new(file: impl Into<PathBuf>, instances_dir: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            instances_dir: instances_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn instances_dir(&self) -> &Path {
        &self.instances_dir
    }

    pub async fn list(&self) -> Result<InstanceMap, InstanceError> {
        let _guard = self.write_lock.lock().await;
        self.load()
    }

    pub async fn get(&self, name: &str) -> Result<Option<Instance>, InstanceError> {
        Ok(self.list().await?.remove(name))
    }

    /// Create an instance directory with its add-on subdirectories and record it.
    pub async fn create(
        &self,
        name: &str,
        base_version: &str,
        loader: LoaderKind,
    ) -> Result<Instance, InstanceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InstanceError::InvalidName(name.to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut instances = self.load()?;
        if instances.contains_key(name) {
            return Err(InstanceError::DuplicateName(name.to_string()));
        }

        let used: Vec<PathBuf> = instances.values().map(|i| i.root_path.clone()).collect();
        let dir_name = unique_dir_name(name, |candidate| {
            let path = self.instances_dir.join(candidate);
            path.exists() || used.iter().any(|u| u == &path)
        });
        let root_path = self.instances_dir.join(&dir_name);

        for category in ContentCategory::ALL {
            let dir = root_path.join(category.dir_name());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| InstanceError::io(&dir, e))?;
        }

        let instance = Instance {
            name: name.to_string(),
            base_version: base_version.to_string(),
            loader_kind: loader,
            root_path,
        };
        instances.insert(name.to_string(), instance.clone());
        self.save(&instances)?;

        info!("Created instance '{}' ({} {}) at {:?}", name, base_version, loader, instance.root_path);
        Ok(instance)
    }

    /// Remove the instance directory and its record. Returns `false` for an
    /// unknown name. A directory that cannot be removed is logged and the
    /// record is dropped anyway.
    pub async fn delete(&self, name: &str) -> Result<bool, InstanceError> {
        let _guard = self.write_lock.lock().await;
        let mut instances = self.load()?;
        let Some(instance) = instances.remove(name) else {
            return Ok(false);
        };

        if !instance.root_path.starts_with(&self.instances_dir) {
            warn!(
                "Not removing {:?} for instance '{}': outside {:?}",
                instance.root_path, name, self.instances_dir
            );
        } else {
            match tokio::fs::remove_dir_all(&instance.root_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {:?} for instance '{}': {}", instance.root_path, name, e),
            }
        }

        self.save(&instances)?;
        info!("Deleted instance '{}'", name);
        Ok(true)
    }

    fn load(&self) -> Result<InstanceMap, InstanceError> {
        Ok(read_json(&self.file).map_err(InstanceError::Persist)?.unwrap_or_default())
    }

    fn save(&self, instances: &InstanceMap) -> Result<(), InstanceError> {
        write_json_atomic(&self.file, instances).map_err(InstanceError::Persist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store(dir: &Path) -> InstanceStore {
        InstanceStore::new(dir.join("instances.json"), dir.join("game/instances"))
    }

    #[tokio::test]
    async fn create_lays_out_directories_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let instance = store.create("Survival", "1.20.1", LoaderKind::Fabric).await.unwrap();
        assert_eq!(instance.root_path, dir.path().join("game/instances/Survival"));
        for category in ContentCategory::ALL {
            assert!(instance.category_dir(category).is_dir());
        }

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("instances.json")).unwrap()).unwrap();
        assert_eq!(raw["Survival"]["version"], "1.20.1");
        assert_eq!(raw["Survival"]["loader"], "Fabric");

        let reopened = self::store(dir.path());
        assert_eq!(reopened.get("Survival").await.unwrap(), Some(instance));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.create("Pack", "1.20.1", LoaderKind::None).await.unwrap();
        let err = store.create("Pack", "1.19.4", LoaderKind::Forge).await.unwrap_err();
        assert!(matches!(err, InstanceError::DuplicateName(n) if n == "Pack"));
        assert!(matches!(
            store.create("   ", "1.20.1", LoaderKind::None).await,
            Err(InstanceError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn colliding_directory_names_are_disambiguated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let a = store.create("Pack!", "1.20.1", LoaderKind::None).await.unwrap();
        let b = store.create("Pack?", "1.20.1", LoaderKind::None).await.unwrap();
        assert_ne!(a.root_path, b.root_path);
        assert!(b.root_path.file_name().unwrap().to_string_lossy().starts_with("Pack-"));
    }

    #[tokio::test]
    async fn delete_removes_record_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let instance = store.create("Temp", "1.20.1", LoaderKind::None).await.unwrap();

        assert!(store.delete("Temp").await.unwrap());
        assert!(!instance.root_path.exists());
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.delete("Temp").await.unwrap());
    }

    #[tokio::test]
    async fn delete_drops_record_when_directory_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let instance = store.create("Gone", "1.20.1", LoaderKind::None).await.unwrap();
        std::fs::remove_dir_all(&instance.root_path).unwrap();

        assert!(store.delete("Gone").await.unwrap());
        assert!(store.get("Gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store(dir.path()));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(&format!("Instance {}", i), "1.20.1", LoaderKind::None).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn corrupt_map_is_reported_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("instances.json"), "not json").unwrap();
        let store = store(dir.path());

        assert!(matches!(
            store.create("New", "1.20.1", LoaderKind::None).await,
            Err(InstanceError::Persist(_))
        ));
        assert_eq!(std::fs::read_to_string(dir.path().join("instances.json")).unwrap(), "not json");
    }
}
