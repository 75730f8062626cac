//! In-memory backend
//!
//! Holds the whole tree in a single map keyed by storage location. Every
//! mutation runs under one write lock, so check-then-act sequences are atomic.

use crate::error::{ContentsError, Result};
use crate::model::{describe, ContentDescriptor, RawStat};
use crate::path::{ContentRoot, LogicalPath};
use crate::store::{is_hidden, item_address, ContentStore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum Entry {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    entry: Entry,
    created: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl Node {
    fn directory() -> Self {
        let now = Utc::now();
        Self {
            entry: Entry::Directory,
            created: now,
            last_modified: now,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.entry, Entry::Directory)
    }
}

pub struct MemoryStore {
    root: ContentRoot,
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl MemoryStore {
    /// Create an empty tree. The root location is virtual; nothing touches disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = ContentRoot::new(root);
        let mut nodes = BTreeMap::new();
        nodes.insert(root.path().to_path_buf(), Node::directory());
        Self {
            root,
            nodes: RwLock::new(nodes),
        }
    }

    fn raw_stat(node: &Node, parent: &LogicalPath, name: &str) -> RawStat {
        let size = match &node.entry {
            Entry::Directory => 0,
            Entry::File(bytes) => bytes.len() as u64,
        };
        RawStat {
            path: parent.to_string(),
            name: name.to_string(),
            is_dir: node.is_dir(),
            size,
            created: node.created,
            last_modified: node.last_modified,
        }
    }

    /// Insert directory nodes for every missing ancestor up to and including `directory`.
    fn ensure_directories(
        nodes: &mut BTreeMap<PathBuf, Node>,
        root: &ContentRoot,
        directory: &LogicalPath,
    ) -> Result<()> {
        let mut current = LogicalPath::root();
        for segment in directory.segments() {
            current = current.join(segment);
            let location = root.locate(&current);
            match nodes.get(&location) {
                Some(node) if node.is_dir() => {}
                Some(_) => {
                    return Err(ContentsError::AlreadyExists(format!(
                        "{} is a file",
                        current
                    )))
                }
                None => {
                    nodes.insert(location, Node::directory());
                }
            }
        }
        Ok(())
    }
}

impl ContentStore for MemoryStore {
    fn root(&self) -> &ContentRoot {
        &self.root
    }

    fn occupied(&self, location: &Path) -> bool {
        self.nodes.read().contains_key(location)
    }

    fn is_container(&self, location: &Path) -> bool {
        self.nodes
            .read()
            .get(location)
            .map(Node::is_dir)
            .unwrap_or(false)
    }

    fn list(&self, path: &str) -> Result<Vec<ContentDescriptor>> {
        let logical = LogicalPath::parse(path);
        let location = self.root.locate(&logical);
        let nodes = self.nodes.read();
        match nodes.get(&location) {
            Some(node) if node.is_dir() => {}
            _ => return Err(ContentsError::NotFound(logical.to_string())),
        }

        // BTreeMap order keeps children sorted by name
        let models: Vec<ContentDescriptor> = nodes
            .iter()
            .filter(|(key, _)| key.parent() == Some(location.as_path()))
            .filter_map(|(key, node)| {
                let name = key.file_name()?.to_str()?.to_string();
                if is_hidden(&name) {
                    return None;
                }
                Some(describe(Self::raw_stat(node, &logical, &name), None))
            })
            .collect();

        debug!("Listed {} ({} entries)", logical, models.len());
        Ok(models)
    }

    fn stat(&self, path: &str, name: &str) -> Result<ContentDescriptor> {
        let (parent, name) = item_address(path, name);
        let location = self.root.locate(&parent.join(&name));
        let nodes = self.nodes.read();
        let node = nodes
            .get(&location)
            .ok_or_else(|| ContentsError::NotFound(parent.join(&name).to_string()))?;
        Ok(describe(Self::raw_stat(node, &parent, &name), None))
    }

    fn read_bytes(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        let (parent, name) = item_address(path, name);
        let location = self.root.locate(&parent.join(&name));
        let nodes = self.nodes.read();
        match nodes.get(&location).map(|node| &node.entry) {
            Some(Entry::File(bytes)) => Ok(bytes.clone()),
            Some(Entry::Directory) => Err(ContentsError::NotFound(format!(
                "{} is a directory",
                parent.join(&name)
            ))),
            None => Err(ContentsError::NotFound(parent.join(&name).to_string())),
        }
    }

    fn write_bytes(&self, path: &str, name: &str, bytes: &[u8]) -> Result<ContentDescriptor> {
        let (parent, name) = item_address(path, name);
        if name.is_empty() {
            return Err(ContentsError::InvalidDestination(
                "write target has no item name".to_string(),
            ));
        }
        let location = self.root.locate(&parent.join(&name));
        let mut nodes = self.nodes.write();
        Self::ensure_directories(&mut nodes, &self.root, &parent)?;

        let now = Utc::now();
        let created = match nodes.get(&location) {
            Some(node) if node.is_dir() => {
                return Err(ContentsError::AlreadyExists(format!(
                    "{} is a directory",
                    parent.join(&name)
                )))
            }
            Some(node) => node.created,
            None => now,
        };
        let node = Node {
            entry: Entry::File(bytes.to_vec()),
            created,
            last_modified: now,
        };
        let model = describe(Self::raw_stat(&node, &parent, &name), None);
        nodes.insert(location, node);

        info!("Wrote {} ({} bytes)", parent.join(&name), bytes.len());
        Ok(model)
    }

    fn create_new(
        &self,
        path: &str,
        base: &str,
        suffix: &str,
        bytes: &[u8],
    ) -> Result<ContentDescriptor> {
        let parent = LogicalPath::parse(path);
        let mut nodes = self.nodes.write();
        Self::ensure_directories(&mut nodes, &self.root, &parent)?;

        let name = crate::naming::allocate_with_suffix(&self.root, base, suffix, path, |location| {
            nodes.contains_key(location)
        });
        let now = Utc::now();
        let node = Node {
            entry: Entry::File(bytes.to_vec()),
            created: now,
            last_modified: now,
        };
        let model = describe(Self::raw_stat(&node, &parent, &name), None);
        nodes.insert(self.root.locate(&parent.join(&name)), node);

        info!("Created {} ({} bytes)", parent.join(&name), bytes.len());
        Ok(model)
    }

    fn set_modified(&self, path: &str, name: &str, when: DateTime<Utc>) -> Result<()> {
        let (parent, name) = item_address(path, name);
        let location = self.root.locate(&parent.join(&name));
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&location)
            .ok_or_else(|| ContentsError::NotFound(parent.join(&name).to_string()))?;
        node.last_modified = when;
        Ok(())
    }

    fn rename(&self, src: &str, dest: &str) -> Result<ContentDescriptor> {
        let src_path = LogicalPath::parse(src);
        let dest_path = LogicalPath::parse(dest);
        info!("Renaming {} to {}", src_path, dest_path);

        if src_path.is_root() {
            return Err(ContentsError::Forbidden(
                "cannot rename the content root".to_string(),
            ));
        }
        let (dest_parent, dest_name) = dest_path
            .split_last()
            .ok_or_else(|| ContentsError::AlreadyExists(dest.to_string()))?;

        let src_location = self.root.locate(&src_path);
        let dest_location = self.root.locate(&dest_path);
        let dest_dir = self.root.locate(&dest_parent);

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&src_location) {
            return Err(ContentsError::NotFound(src_path.to_string()));
        }
        if !nodes.get(&dest_dir).map(Node::is_dir).unwrap_or(false) {
            return Err(ContentsError::InvalidDestination(dest_path.to_string()));
        }
        if nodes.contains_key(&dest_location) {
            return Err(ContentsError::AlreadyExists(dest_path.to_string()));
        }
        if dest_location.starts_with(&src_location) {
            return Err(ContentsError::InvalidDestination(format!(
                "{} is inside {}",
                dest_path, src_path
            )));
        }

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|key| key.starts_with(&src_location))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = nodes.remove(&key) {
                let relative = key.strip_prefix(&src_location).unwrap_or(Path::new(""));
                let target = if relative.as_os_str().is_empty() {
                    dest_location.clone()
                } else {
                    dest_location.join(relative)
                };
                nodes.insert(target, node);
            }
        }

        let node = nodes
            .get(&dest_location)
            .ok_or_else(|| ContentsError::NotFound(dest_path.to_string()))?;
        Ok(describe(Self::raw_stat(node, &dest_parent, dest_name), None))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let logical = LogicalPath::parse(path);
        let location = self.root.locate(&logical);
        if self.root.is_root(&location) {
            return Err(ContentsError::Forbidden(
                "cannot delete the content root".to_string(),
            ));
        }

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&location) {
            return Err(ContentsError::NotFound(logical.to_string()));
        }
        nodes.retain(|key, _| !key.starts_with(&location));

        info!("Deleted {}", logical);
        Ok(())
    }

    fn make_container(&self, name: Option<&str>, path: &str) -> Result<String> {
        let parent = LogicalPath::parse(path);
        let mut nodes = self.nodes.write();

        let name = match name {
            Some(name) => name.to_string(),
            None => crate::naming::allocate(&self.root, "new_folder", path, |location| {
                nodes.contains_key(location)
            }),
        };
        let full = parent.join(&name);
        let location = self.root.locate(&full);
        if nodes.contains_key(&location) {
            return Err(ContentsError::AlreadyExists(full.to_string()));
        }
        if let Some((containing, _)) = full.split_last() {
            Self::ensure_directories(&mut nodes, &self.root, &containing)?;
        }
        nodes.insert(location, Node::directory());

        info!("Created directory {}", full);
        Ok(name)
    }
}
