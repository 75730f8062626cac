//! Core types shared across the contents service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// StorageLocation: native storage address derived from a logical path
pub type StorageLocation = PathBuf;

/// CheckpointID: opaque identifier, unique within one file's history
pub type CheckpointID = String;

/// Reserved extension marking notebook documents
pub const NOTEBOOK_EXTENSION: &str = ".ipynb";

/// Item classification exposed on every descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Directory,
    File,
    Notebook,
}

impl ContentKind {
    /// Directory if the location is a container, else notebook by extension, else file.
    pub fn classify(name: &str, is_dir: bool) -> Self {
        if is_dir {
            ContentKind::Directory
        } else if is_notebook_name(name) {
            ContentKind::Notebook
        } else {
            ContentKind::File
        }
    }
}

/// Transfer encoding applied to leaf payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Base64,
}

pub fn is_notebook_name(name: &str) -> bool {
    name.ends_with(NOTEBOOK_EXTENSION)
}
