use crate::models::ContentCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry project types the launcher can search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Mod,
    #[serde(rename = "resourcepack")]
    ResourcePack,
    Shader,
    Modpack,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Mod => "mod",
            ProjectType::ResourcePack => "resourcepack",
            ProjectType::Shader => "shader",
            ProjectType::Modpack => "modpack",
        }
    }

    /// Where files of this type go inside an instance. Modpacks are not
    /// installed into an instance, they define one.
    pub fn category(&self) -> Option<ContentCategory> {
        match self {
            ProjectType::Mod => Some(ContentCategory::Mod),
            ProjectType::ResourcePack => Some(ContentCategory::ResourcePack),
            ProjectType::Shader => Some(ContentCategory::Shader),
            ProjectType::Modpack => None,
        }
    }
}

impl From<ContentCategory> for ProjectType {
    fn from(category: ContentCategory) -> Self {
        match category {
            ContentCategory::Mod => ProjectType::Mod,
            ContentCategory::ResourcePack => ProjectType::ResourcePack,
            ContentCategory::Shader => ProjectType::Shader,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub project_id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub follows: u64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub hits: Vec<ContentSummary>,
    /// Absent on some mirrors; paging then stops on the first short page.
    #[serde(default)]
    pub total_hits: Option<u64>,
}

/// Full project page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDetails {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    pub version_number: String,
    #[serde(default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub files: Vec<VersionFile>,
    #[serde(default)]
    pub date_published: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub hashes: FileHashes,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileHashes {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
}

/// The file to download for a version: the primary one, else the first listed.
pub fn resolve_downloadable(record: &VersionRecord) -> Option<&VersionFile> {
    record
        .files
        .iter()
        .find(|f| f.primary)
        .or_else(|| record.files.first())
}
