//! Local filesystem backend
//!
//! Directories are containers, files are leaves. All metadata comes from live
//! `stat` calls; there is no sidecar index.

use crate::concurrency::PathLockManager;
use crate::error::{ContentsError, Result};
use crate::model::{describe, ContentDescriptor, RawStat};
use crate::path::{ContentRoot, LogicalPath};
use crate::store::{is_hidden, item_address, ContentStore};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub struct FileSystemStore {
    root: ContentRoot,
    locks: PathLockManager,
}

impl FileSystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: ContentRoot::new(root),
            locks: PathLockManager::new(),
        }
    }

    /// Create the root directory if missing and open a store on it.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root: PathBuf = root.into();
        if root.exists() && !root.is_dir() {
            return Err(ContentsError::Config(format!(
                "content root {} is not a directory",
                root.display()
            )));
        }
        if !root.exists() {
            info!("Creating content root {}", root.display());
            fs::create_dir_all(&root).map_err(|e| ContentsError::from_io(e, root.display().to_string()))?;
        }
        Ok(Self::new(root))
    }

    fn raw_stat(&self, parent: &LogicalPath, name: &str) -> Result<RawStat> {
        let location = self.root.locate(&parent.join(name));
        let metadata = fs::metadata(&location)
            .map_err(|e| ContentsError::from_io(e, display_path(parent, name)))?;
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH));
        // Not every platform records birth time
        let created = metadata
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(last_modified);
        Ok(RawStat {
            path: parent.to_string(),
            name: name.to_string(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            created,
            last_modified,
        })
    }
}

fn display_path(parent: &LogicalPath, name: &str) -> String {
    parent.join(name).to_string()
}

fn stage(directory: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut temp = tempfile::Builder::new()
        .prefix(".~")
        .suffix(".tmp")
        .tempfile_in(directory)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

fn write_atomically(directory: &Path, location: &Path, bytes: &[u8]) -> std::io::Result<()> {
    stage(directory, bytes)?
        .persist(location)
        .map_err(|e| e.error)?;
    Ok(())
}

impl ContentStore for FileSystemStore {
    fn root(&self) -> &ContentRoot {
        &self.root
    }

    fn occupied(&self, location: &Path) -> bool {
        fs::symlink_metadata(location).is_ok()
    }

    fn is_container(&self, location: &Path) -> bool {
        location.is_dir()
    }

    fn list(&self, path: &str) -> Result<Vec<ContentDescriptor>> {
        let logical = LogicalPath::parse(path);
        let location = self.root.locate(&logical);
        if !location.is_dir() {
            return Err(ContentsError::NotFound(logical.to_string()));
        }

        let entries =
            fs::read_dir(&location).map_err(|e| ContentsError::from_io(e, logical.to_string()))?;

        let mut models = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Failed to read directory entry in {}: {}", location.display(), e);
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("Skipping non UTF8 entry {:?} in {}", raw, location.display());
                    continue;
                }
            };
            if is_hidden(&name) {
                continue;
            }
            match self.raw_stat(&logical, &name) {
                Ok(raw) => models.push(describe(raw, None)),
                // Dangling symlinks and entries removed mid-listing
                Err(e) => warn!("Skipping {} in {}: {}", name, location.display(), e),
            }
        }
        models.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("Listed {} ({} entries)", location.display(), models.len());
        Ok(models)
    }

    fn stat(&self, path: &str, name: &str) -> Result<ContentDescriptor> {
        let (parent, name) = item_address(path, name);
        Ok(describe(self.raw_stat(&parent, &name)?, None))
    }

    fn read_bytes(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        let (parent, name) = item_address(path, name);
        let location = self.root.locate(&parent.join(&name));
        if location.is_dir() {
            return Err(ContentsError::NotFound(format!(
                "{} is a directory",
                display_path(&parent, &name)
            )));
        }
        fs::read(&location).map_err(|e| ContentsError::from_io(e, display_path(&parent, &name)))
    }

    fn write_bytes(&self, path: &str, name: &str, bytes: &[u8]) -> Result<ContentDescriptor> {
        let (parent, name) = item_address(path, name);
        if name.is_empty() {
            return Err(ContentsError::InvalidDestination(
                "write target has no item name".to_string(),
            ));
        }
        let directory = self.root.locate(&parent);
        let location = directory.join(&name);

        self.locks.with_write(&[&directory], || -> Result<()> {
            fs::create_dir_all(&directory)
                .map_err(|e| ContentsError::from_io(e, parent.to_string()))?;
            write_atomically(&directory, &location, bytes)
                .map_err(|e| ContentsError::from_io(e, display_path(&parent, &name)))
        })?;

        info!(
            "Wrote {} ({} bytes, real: {})",
            display_path(&parent, &name),
            bytes.len(),
            location.display()
        );
        Ok(describe(self.raw_stat(&parent, &name)?, None))
    }

    fn create_new(
        &self,
        path: &str,
        base: &str,
        suffix: &str,
        bytes: &[u8],
    ) -> Result<ContentDescriptor> {
        let parent = LogicalPath::parse(path);
        let directory = self.root.locate(&parent);

        let name = self.locks.with_write(&[&directory], || -> Result<String> {
            fs::create_dir_all(&directory)
                .map_err(|e| ContentsError::from_io(e, parent.to_string()))?;
            let name = self.allocate_name_with_suffix(base, suffix, path);
            let staged = stage(&directory, bytes)
                .map_err(|e| ContentsError::from_io(e, parent.to_string()))?;
            // Create-only, so a name claimed by another process is never clobbered
            staged
                .persist_noclobber(directory.join(&name))
                .map_err(|e| ContentsError::from_io(e.error, display_path(&parent, &name)))?;
            Ok(name)
        })?;

        info!("Created {} ({} bytes)", display_path(&parent, &name), bytes.len());
        Ok(describe(self.raw_stat(&parent, &name)?, None))
    }

    fn set_modified(&self, path: &str, name: &str, when: DateTime<Utc>) -> Result<()> {
        let (parent, name) = item_address(path, name);
        let location = self.root.locate(&parent.join(&name));
        let file = fs::File::options()
            .write(true)
            .open(&location)
            .map_err(|e| ContentsError::from_io(e, display_path(&parent, &name)))?;
        file.set_modified(SystemTime::from(when))?;
        Ok(())
    }

    fn rename(&self, src: &str, dest: &str) -> Result<ContentDescriptor> {
        let src_path = LogicalPath::parse(src);
        let dest_path = LogicalPath::parse(dest);
        info!("Renaming {} to {}", src_path, dest_path);

        let (src_parent, _) = src_path.split_last().ok_or_else(|| {
            ContentsError::Forbidden("cannot rename the content root".to_string())
        })?;
        let (dest_parent, dest_name) = dest_path
            .split_last()
            .ok_or_else(|| ContentsError::AlreadyExists(dest.to_string()))?;

        let src_location = self.root.locate(&src_path);
        let dest_location = self.root.locate(&dest_path);
        let src_dir = self.root.locate(&src_parent);
        let dest_dir = self.root.locate(&dest_parent);

        self.locks.with_write(&[&src_dir, &dest_dir], || -> Result<()> {
            let src_meta = fs::symlink_metadata(&src_location)
                .map_err(|e| ContentsError::from_io(e, src_path.to_string()))?;
            if !dest_dir.is_dir() {
                return Err(ContentsError::InvalidDestination(dest_path.to_string()));
            }
            if self.occupied(&dest_location) {
                return Err(ContentsError::AlreadyExists(dest_path.to_string()));
            }
            if dest_location.starts_with(&src_location) {
                return Err(ContentsError::InvalidDestination(format!(
                    "{} is inside {}",
                    dest_path, src_path
                )));
            }

            debug!(
                "OS rename: {} to {}",
                src_location.display(),
                dest_location.display()
            );
            if src_meta.is_file() {
                // A hard link is an atomic create-if-absent on the destination
                match fs::hard_link(&src_location, &dest_location) {
                    Ok(()) => {
                        if let Err(e) = fs::remove_file(&src_location) {
                            let _ = fs::remove_file(&dest_location);
                            return Err(ContentsError::from_io(e, src_path.to_string()));
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        return Err(ContentsError::AlreadyExists(dest_path.to_string()));
                    }
                    Err(e) => {
                        debug!("Hard link unavailable ({}), falling back to rename", e);
                        fs::rename(&src_location, &dest_location)
                            .map_err(|e| ContentsError::from_io(e, src_path.to_string()))?;
                    }
                }
            } else {
                fs::rename(&src_location, &dest_location)
                    .map_err(|e| ContentsError::from_io(e, src_path.to_string()))?;
            }
            Ok(())
        })?;

        Ok(describe(self.raw_stat(&dest_parent, dest_name)?, None))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let logical = LogicalPath::parse(path);
        let location = self.root.locate(&logical);
        if self.root.is_root(&location) {
            return Err(ContentsError::Forbidden(
                "cannot delete the content root".to_string(),
            ));
        }

        let parent = logical
            .split_last()
            .map(|(parent, _)| parent)
            .unwrap_or_default();
        let directory = self.root.locate(&parent);
        self.locks.with_write(&[&directory], || -> Result<()> {
            let metadata = fs::symlink_metadata(&location)
                .map_err(|e| ContentsError::from_io(e, logical.to_string()))?;
            let removed = if metadata.is_dir() {
                fs::remove_dir_all(&location)
            } else {
                fs::remove_file(&location)
            };
            removed.map_err(|e| ContentsError::from_io(e, logical.to_string()))
        })?;

        info!("Deleted {} (real: {})", logical, location.display());
        Ok(())
    }

    fn make_container(&self, name: Option<&str>, path: &str) -> Result<String> {
        let parent = LogicalPath::parse(path);
        let directory = self.root.locate(&parent);
        let name = self.locks.with_write(&[&directory], || -> Result<String> {
            let name = match name {
                Some(name) => name.to_string(),
                None => self.allocate_name("new_folder", path),
            };
            let location = self.root.resolve(Some(&name), path);
            if self.root.is_root(&location) {
                return Err(ContentsError::AlreadyExists(parent.to_string()));
            }
            if let Some(containing) = location.parent() {
                fs::create_dir_all(containing)
                    .map_err(|e| ContentsError::from_io(e, parent.to_string()))?;
            }
            fs::create_dir(&location)
                .map_err(|e| ContentsError::from_io(e, display_path(&parent, &name)))?;
            Ok(name)
        })?;

        info!("Created directory {}", display_path(&parent, &name));
        Ok(name)
    }
}
