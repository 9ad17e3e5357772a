use super::common::{ContentCategory, LoaderKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An isolated run configuration: its own mods/configs/saves directory bound
/// to one base version and loader, sharing the global version/library cache.
///
/// Field names on disk follow the persisted instance map
/// (`name`, `version`, `loader`, `path`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,

    #[serde(rename = "version")]
    pub base_version: String,

    #[serde(rename = "loader", default)]
    pub loader_kind: LoaderKind,

    #[serde(rename = "path")]
    pub root_path: PathBuf,
}

impl Instance {
    pub fn category_dir(&self, category: ContentCategory) -> PathBuf {
        self.root_path.join(category.dir_name())
    }
}
