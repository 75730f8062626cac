//! Content storage backends
//!
//! [`ContentStore`] is the capability set every backend offers: list, stat,
//! read, write, rename, delete and make-container, all addressed by logical
//! paths under a [`ContentRoot`]. Backends are picked by configuration, not
//! by type hierarchy.

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStore;
pub use memory::MemoryStore;

use crate::error::{ContentsError, Result};
use crate::model::{ContentDescriptor, WriteModel};
use crate::naming;
use crate::path::{ContentRoot, LogicalPath};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Result of [`ContentStore::get`]: a directory listing or a loaded leaf.
#[derive(Debug, Clone)]
pub enum Contents {
    Directory(Vec<ContentDescriptor>),
    Leaf(ContentDescriptor),
}

/// Storage capability set
pub trait ContentStore: Send + Sync {
    fn root(&self) -> &ContentRoot;

    /// Whether any entry exists at a storage location.
    fn occupied(&self, location: &Path) -> bool;

    /// Whether the location is an existing container.
    fn is_container(&self, location: &Path) -> bool;

    /// Direct, non-hidden children of a directory, unloaded, sorted by name.
    fn list(&self, path: &str) -> Result<Vec<ContentDescriptor>>;

    fn stat(&self, path: &str, name: &str) -> Result<ContentDescriptor>;

    /// Raw payload bytes of a leaf.
    fn read_bytes(&self, path: &str, name: &str) -> Result<Vec<u8>>;

    /// Write raw bytes, creating containing directories as needed. Overwrites.
    fn write_bytes(&self, path: &str, name: &str, bytes: &[u8]) -> Result<ContentDescriptor>;

    /// Allocate `<base><int><suffix>` in `path` and write `bytes` under that name.
    ///
    /// Allocation and creation happen under one hold of the directory's lock,
    /// so concurrent callers always receive distinct names.
    fn create_new(
        &self,
        path: &str,
        base: &str,
        suffix: &str,
        bytes: &[u8],
    ) -> Result<ContentDescriptor>;

    /// Reset a leaf's last-modified timestamp.
    fn set_modified(&self, path: &str, name: &str, when: DateTime<Utc>) -> Result<()>;

    /// Move `src` to `dest` (combined logical paths). Never overwrites.
    fn rename(&self, src: &str, dest: &str) -> Result<ContentDescriptor>;

    /// Recursively delete a file or directory. The root is never deletable.
    fn delete(&self, path: &str) -> Result<()>;

    /// Create an empty directory, allocating `new_folder<int>` when no name is given.
    fn make_container(&self, name: Option<&str>, path: &str) -> Result<String>;

    fn exists(&self, path: &str, name: Option<&str>) -> bool {
        self.occupied(&self.root().resolve(name, path))
    }

    fn allocate_name(&self, base: &str, path: &str) -> String {
        naming::allocate(self.root(), base, path, |location| self.occupied(location))
    }

    fn allocate_name_with_suffix(&self, base: &str, suffix: &str, path: &str) -> String {
        naming::allocate_with_suffix(self.root(), base, suffix, path, |location| {
            self.occupied(location)
        })
    }

    /// Stat plus transfer-encoded payload. A directory yields its unloaded descriptor.
    fn read(&self, path: &str, name: &str) -> Result<ContentDescriptor> {
        let model = self.stat(path, name)?;
        if model.kind == crate::types::ContentKind::Directory {
            return Ok(model);
        }
        let bytes = self.read_bytes(path, name)?;
        Ok(model.loaded(&bytes))
    }

    /// Decode a transfer-encoded model and write it into `path`.
    fn write(&self, path: &str, model: &WriteModel) -> Result<ContentDescriptor> {
        let bytes = model
            .payload()
            .decode()
            .map_err(|e| ContentsError::InvalidPayload(format!("{}: {}", model.name, e)))?;
        self.write_bytes(path, &model.name, &bytes)
    }

    /// Directory listing or loaded leaf for a combined logical path.
    fn get(&self, path: &str) -> Result<Contents> {
        let location = self.root().resolve(None, path);
        if self.is_container(&location) {
            return Ok(Contents::Directory(self.list(path)?));
        }
        let logical = LogicalPath::parse(path);
        match logical.split_last() {
            Some((parent, name)) => Ok(Contents::Leaf(self.read(&parent.to_string(), name)?)),
            None => Err(ContentsError::NotFound(path.to_string())),
        }
    }
}

/// Normalize `(path, name)` into the item's containing logical path and final name.
///
/// The name may contain slashes; the root item has an empty name.
pub(crate) fn item_address(path: &str, name: &str) -> (LogicalPath, String) {
    let full = LogicalPath::parse(path).join(name);
    match full.split_last() {
        Some((parent, last)) => (parent, last.to_string()),
        None => (LogicalPath::root(), String::new()),
    }
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_address_moves_name_segments_into_path() {
        let (parent, name) = item_address("/a/", "b/c.txt");
        assert_eq!(parent.to_string(), "a/b");
        assert_eq!(name, "c.txt");

        let (parent, name) = item_address("/", "");
        assert!(parent.is_root());
        assert!(name.is_empty());
    }
}
