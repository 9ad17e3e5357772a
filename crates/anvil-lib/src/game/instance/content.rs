use super::InstanceError;
use crate::models::{ContentCategory, Instance};
use std::path::{Path, PathBuf};

const CONTENT_EXTENSIONS: [&str; 2] = ["jar", "zip"];

/// Add-on file names in one category directory, sorted. Only `.jar`/`.zip`
/// files count; a missing directory is an empty list.
pub async fn list_content(instance: &Instance, category: ContentCategory) -> Result<Vec<String>, InstanceError> {
    let dir = instance.category_dir(category);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(InstanceError::io(&dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| InstanceError::io(&dir, e))? {
        let path = entry.path();
        if !is_content_file(&path) || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Delete one add-on file. Returns `false` when it does not exist.
pub async fn delete_content(
    instance: &Instance,
    category: ContentCategory,
    file_name: &str,
) -> Result<bool, InstanceError> {
    let path = content_path(instance, category, file_name)?;
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            log::info!("Removed {} from instance '{}'", file_name, instance.name);
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(InstanceError::io(path, e)),
    }
}

/// Copy a local file into a category directory, replacing a same-named file.
pub async fn import_content(
    instance: &Instance,
    category: ContentCategory,
    source: &Path,
) -> Result<PathBuf, InstanceError> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| InstanceError::InvalidFileName(source.display().to_string()))?;
    let dest = content_path(instance, category, file_name)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstanceError::io(parent, e))?;
    }
    tokio::fs::copy(source, &dest)
        .await
        .map_err(|e| InstanceError::io(source, e))?;

    log::info!("Imported {:?} into {:?}", source, dest);
    Ok(dest)
}

pub(crate) fn content_path(
    instance: &Instance,
    category: ContentCategory,
    file_name: &str,
) -> Result<PathBuf, InstanceError> {
    let invalid = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\'])
        || file_name.contains('\0');
    if invalid {
        return Err(InstanceError::InvalidFileName(file_name.to_string()));
    }
    Ok(instance.category_dir(category).join(file_name))
}

fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CONTENT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoaderKind;

    fn instance(root: &Path) -> Instance {
        Instance {
            name: "Test".into(),
            base_version: "1.20.1".into(),
            loader_kind: LoaderKind::Fabric,
            root_path: root.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn lists_only_archives_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let inst = instance(dir.path());
        let mods = inst.category_dir(ContentCategory::Mod);
        std::fs::create_dir_all(mods.join("nested.jar")).unwrap();
        for name in ["sodium.jar", "Lithium.JAR", "readme.txt", "pack.zip"] {
            std::fs::write(mods.join(name), b"x").unwrap();
        }

        let names = list_content(&inst, ContentCategory::Mod).await.unwrap();
        assert_eq!(names, vec!["Lithium.JAR", "pack.zip", "sodium.jar"]);
        assert!(list_content(&inst, ContentCategory::Shader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn import_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let inst = instance(&dir.path().join("inst"));
        let source = dir.path().join("Faithful.zip");
        std::fs::write(&source, b"pack").unwrap();

        let dest = import_content(&inst, ContentCategory::ResourcePack, &source).await.unwrap();
        assert_eq!(dest, inst.root_path.join("resourcepacks/Faithful.zip"));
        assert_eq!(
            list_content(&inst, ContentCategory::ResourcePack).await.unwrap(),
            vec!["Faithful.zip"]
        );

        assert!(delete_content(&inst, ContentCategory::ResourcePack, "Faithful.zip").await.unwrap());
        assert!(!delete_content(&inst, ContentCategory::ResourcePack, "Faithful.zip").await.unwrap());
    }

    #[tokio::test]
    async fn path_escapes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let inst = instance(dir.path());
        for bad in ["../config.json", "..", "a\\b.jar", ""] {
            assert!(matches!(
                delete_content(&inst, ContentCategory::Mod, bad).await,
                Err(InstanceError::InvalidFileName(_))
            ));
        }
    }
}
