use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mod loader an instance runs on. `None` is the unmodified client.
///
/// Serialized with the capitalised variant names (`"None"`, `"Fabric"`, ...)
/// so persisted instance maps stay readable by older launcher builds.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
pub enum LoaderKind {
    #[default]
    #[serde(alias = "none", alias = "vanilla", alias = "Vanilla")]
    None,
    #[serde(alias = "fabric")]
    Fabric,
    #[serde(alias = "quilt")]
    Quilt,
    #[serde(alias = "forge")]
    Forge,
    #[serde(alias = "neoforge")]
    NeoForge,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 5] = [
        LoaderKind::None,
        LoaderKind::Fabric,
        LoaderKind::Quilt,
        LoaderKind::Forge,
        LoaderKind::NeoForge,
    ];

    /// Lower-case name, as it appears in installed version ids and registry categories.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderKind::None => "none",
            LoaderKind::Fabric => "fabric",
            LoaderKind::Quilt => "quilt",
            LoaderKind::Forge => "forge",
            LoaderKind::NeoForge => "neoforge",
        }
    }

    pub fn is_modded(&self) -> bool {
        !matches!(self, LoaderKind::None)
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoaderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "vanilla" => Ok(LoaderKind::None),
            "fabric" => Ok(LoaderKind::Fabric),
            "quilt" => Ok(LoaderKind::Quilt),
            "forge" => Ok(LoaderKind::Forge),
            "neoforge" => Ok(LoaderKind::NeoForge),
            other => Err(anyhow::anyhow!("Unknown loader kind: {}", other)),
        }
    }
}

/// Add-on category. Each one maps to a fixed subdirectory of an instance.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Mod,
    ResourcePack,
    Shader,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 3] = [
        ContentCategory::Mod,
        ContentCategory::ResourcePack,
        ContentCategory::Shader,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            ContentCategory::Mod => "mods",
            ContentCategory::ResourcePack => "resourcepacks",
            ContentCategory::Shader => "shaderpacks",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_kind_round_trips_legacy_names() {
        let parsed: LoaderKind = serde_json::from_str("\"Fabric\"").unwrap();
        assert_eq!(parsed, LoaderKind::Fabric);
        let parsed: LoaderKind = serde_json::from_str("\"None\"").unwrap();
        assert_eq!(parsed, LoaderKind::None);
        let parsed: LoaderKind = serde_json::from_str("\"vanilla\"").unwrap();
        assert_eq!(parsed, LoaderKind::None);
        assert_eq!(serde_json::to_string(&LoaderKind::Quilt).unwrap(), "\"Quilt\"");
    }

    #[test]
    fn loader_kind_parses_case_insensitively() {
        assert_eq!("FORGE".parse::<LoaderKind>().unwrap(), LoaderKind::Forge);
        assert_eq!("NeoForge".parse::<LoaderKind>().unwrap(), LoaderKind::NeoForge);
        assert_eq!("".parse::<LoaderKind>().unwrap(), LoaderKind::None);
        assert!("optifine".parse::<LoaderKind>().is_err());
        assert!(!LoaderKind::None.is_modded());
        assert!(LoaderKind::Quilt.is_modded());
    }

    #[test]
    fn categories_map_to_fixed_directories() {
        let dirs: Vec<_> = ContentCategory::ALL.iter().map(|c| c.dir_name()).collect();
        assert_eq!(dirs, vec!["mods", "resourcepacks", "shaderpacks"]);
    }
}
