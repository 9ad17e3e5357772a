//! Isolated run directories and the map that names them.

mod content;
mod naming;
mod store;

pub use content::{delete_content, import_content, list_content};
pub(crate) use content::content_path;
pub use naming::{sanitize_dir_name, unique_dir_name};
pub use store::InstanceStore;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("An instance named '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid instance name '{0}'")]
    InvalidName(String),

    #[error("Invalid file name '{0}'")]
    InvalidFileName(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Instance store error: {0:#}")]
    Persist(#[source] anyhow::Error),
}

impl InstanceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstanceError::Io {
            path: path.into(),
            source,
        }
    }
}
