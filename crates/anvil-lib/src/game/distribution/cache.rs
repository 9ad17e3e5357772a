use super::maven::MavenCoordinate;
use super::{InstalledVersion, VersionMetadata};
use crate::game::runtime::find_java_executable;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Parent chains deeper than this are treated as cycles.
const MAX_INHERITANCE_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
struct VersionDescriptor {
    #[serde(rename = "inheritsFrom")]
    inherits_from: Option<String>,
    #[serde(rename = "javaVersion")]
    java_version: Option<JavaVersionField>,
    #[serde(default)]
    libraries: Vec<LibraryEntry>,
}

#[derive(Debug, Deserialize)]
struct JavaVersionField {
    component: Option<String>,
    #[serde(rename = "majorVersion")]
    major_version: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LibraryEntry {
    name: String,
    #[serde(default)]
    rules: Option<serde_json::Value>,
}

/// Read-only view of the shared game directory: `versions/`, `libraries/`,
/// `assets/` and `runtime/`, deduplicated across every instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedCache {
    root: PathBuf,
}

impl SharedCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("runtime")
    }

    pub fn runtime_component_dir(&self, component: &str) -> PathBuf {
        self.runtime_dir().join(component)
    }

    pub fn version_descriptor(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id).join(format!("{}.json", version_id))
    }

    pub fn library_path(&self, coordinate: &MavenCoordinate) -> PathBuf {
        self.libraries_dir().join(coordinate.relative_path())
    }

    /// Every `versions/<id>/<id>.json` present, sorted by id.
    pub fn installed_versions(&self) -> Result<Vec<InstalledVersion>> {
        let dir = self.versions_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to list {:?}", dir)),
        };

        let mut versions: Vec<InstalledVersion> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|id| self.version_descriptor(id).is_file())
            .map(|id| InstalledVersion { id })
            .collect();
        versions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(versions)
    }

    /// Java requirement of `version_id`, following `inheritsFrom` when the
    /// descriptor itself does not declare one (loader descriptors usually don't).
    pub fn version_metadata(&self, version_id: &str) -> Result<VersionMetadata> {
        for descriptor in self.descriptor_chain(version_id)? {
            if let Some(java) = descriptor.java_version {
                return Ok(VersionMetadata {
                    java_component: java.component,
                    java_major: java.major_version,
                });
            }
        }
        Ok(VersionMetadata::default())
    }

    /// Unconditional libraries of `version_id` and its parents whose jar is
    /// not in `libraries/`. Platform-gated entries are not checked.
    pub fn missing_libraries(&self, version_id: &str) -> Result<Vec<MavenCoordinate>> {
        let mut missing = Vec::new();
        for descriptor in self.descriptor_chain(version_id)? {
            for library in descriptor.libraries.iter().filter(|l| l.rules.is_none()) {
                match MavenCoordinate::parse(&library.name) {
                    Ok(coordinate) if !self.library_path(&coordinate).is_file() => missing.push(coordinate),
                    Ok(_) => {}
                    Err(e) => log::debug!("Skipping library entry: {}", e),
                }
            }
        }
        Ok(missing)
    }

    /// Java executable of an installed runtime component, searching a few
    /// directory levels to cover nested vendor layouts.
    pub fn bundled_java(&self, component: &str) -> Option<PathBuf> {
        let dir = self.runtime_component_dir(component);
        if !dir.is_dir() {
            return None;
        }
        find_java_executable(&dir)
    }

    fn descriptor_chain(&self, version_id: &str) -> Result<Vec<VersionDescriptor>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(version_id.to_string());

        while let Some(id) = next.take() {
            if !seen.insert(id.clone()) || chain.len() >= MAX_INHERITANCE_DEPTH {
                log::warn!("Version inheritance for {} is cyclic or too deep; stopping at {}", version_id, id);
                break;
            }
            let path = self.version_descriptor(&id);
            let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
            let descriptor: VersionDescriptor =
                serde_json::from_str(&raw).with_context(|| format!("Failed to parse {:?}", path))?;
            next = descriptor.inherits_from.clone();
            chain.push(descriptor);
        }

        Ok(chain)
    }
}
