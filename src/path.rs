//! Logical path addressing
//!
//! Maps slash-separated logical paths onto storage locations under a configured
//! content root. Everything here is pure; nothing touches the filesystem.
//!
//! Two addressing conventions coexist:
//! - positional: containing path and item name are passed separately
//!   ([`ContentRoot::resolve`]), used by the contents surface;
//! - extension-sniffing: a combined path whose last segment is an item name
//!   only when it carries the notebook extension ([`NotebookAddress::parse`]),
//!   used by the notebook surface.

use crate::types::{is_notebook_name, StorageLocation};
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalized logical path: a sequence of non-empty segments rooted at the content root.
///
/// `.` and `..` segments are dropped along with empty ones, so a logical path can
/// never address anything outside the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct LogicalPath {
    segments: Vec<String>,
}

impl LogicalPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        Self {
            segments: segments_of(raw).map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a name (which may itself contain slashes) to this path.
    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(segments_of(name).map(str::to_string));
        Self { segments }
    }

    /// Split into (containing path, last segment). None for the root.
    pub fn split_last(&self) -> Option<(LogicalPath, &str)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            LogicalPath {
                segments: rest.to_vec(),
            },
            last.as_str(),
        ))
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Render with leading and trailing separators; the root renders as `/`.
    pub fn to_dir_string(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", self.segments.join("/"))
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn segments_of(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
}

/// Configured content root and the join rule onto native storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
    root: PathBuf,
}

impl ContentRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve an optional item name inside a logical path to a storage location.
    ///
    /// Never fails: malformed input degenerates to the root.
    pub fn resolve(&self, item_name: Option<&str>, logical_path: &str) -> StorageLocation {
        let mut path = LogicalPath::parse(logical_path);
        if let Some(name) = item_name {
            path = path.join(name);
        }
        self.locate(&path)
    }

    pub fn locate(&self, path: &LogicalPath) -> StorageLocation {
        let mut location = self.root.clone();
        for segment in path.segments() {
            location.push(segment);
        }
        location
    }

    pub fn is_root(&self, location: &Path) -> bool {
        location == self.root
    }
}

/// Split a combined path into (item name, containing path) by extension sniffing.
///
/// The last segment is a name only if it ends with the notebook extension;
/// otherwise the whole input is a containing path and the name is None.
/// The containing path always starts and ends with `/`.
pub fn split_named_path(combined: &str) -> (Option<String>, String) {
    let path = LogicalPath::parse(combined);
    match path.split_last() {
        Some((parent, last)) if is_notebook_name(last) => {
            (Some(last.to_string()), parent.to_dir_string())
        }
        _ => (None, path.to_dir_string()),
    }
}

/// Notebook-surface address: a combined path split by [`split_named_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookAddress {
    pub name: Option<String>,
    pub path: String,
}

impl NotebookAddress {
    pub fn parse(combined: &str) -> Self {
        let (name, path) = split_named_path(combined);
        Self { name, path }
    }
}
