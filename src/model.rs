//! Content descriptors ("models")
//!
//! Wire-ready projections of storage items. [`describe`] is the single place
//! where raw storage metadata turns into a descriptor, so list, stat and read
//! classify items identically across backends.

use crate::types::{ContentKind, Encoding};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw metadata as reported by a backend
#[derive(Debug, Clone)]
pub struct RawStat {
    /// Containing logical path, without leading or trailing slashes
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Transfer-encoded payload of a loaded leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub content: String,
    pub encoding: Encoding,
}

impl Payload {
    pub fn encode(bytes: &[u8]) -> Self {
        Self {
            content: STANDARD.encode(bytes),
            encoding: Encoding::Base64,
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.encoding {
            Encoding::Base64 => STANDARD.decode(self.content.trim()),
        }
    }
}

/// Descriptor of one item, returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDescriptor {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    #[serde(flatten)]
    payload: Option<Payload>,
}

impl ContentDescriptor {
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Attach a payload. Directories stay unloaded.
    pub fn loaded(mut self, bytes: &[u8]) -> Self {
        if self.kind != ContentKind::Directory {
            self.payload = Some(Payload::encode(bytes));
        }
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.payload.is_some()
    }

    /// Decoded payload bytes of a loaded leaf.
    pub fn decoded_content(&self) -> Option<Vec<u8>> {
        self.payload.as_ref().and_then(|p| p.decode().ok())
    }
}

/// Incoming model for a write: target name plus transfer-encoded payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteModel {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub encoding: Encoding,
}

impl WriteModel {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let payload = Payload::encode(bytes);
        Self {
            name: name.into(),
            content: payload.content,
            encoding: payload.encoding,
        }
    }

    pub fn payload(&self) -> Payload {
        Payload {
            content: self.content.clone(),
            encoding: self.encoding,
        }
    }
}

/// Project raw metadata (and optionally the payload) into a descriptor.
///
/// Directories never carry a payload and always report size 0.
pub fn describe(raw: RawStat, bytes: Option<&[u8]>) -> ContentDescriptor {
    let kind = ContentKind::classify(&raw.name, raw.is_dir);
    let (size, payload) = match kind {
        ContentKind::Directory => (0, None),
        _ => (raw.size, bytes.map(Payload::encode)),
    };
    ContentDescriptor {
        name: raw.name,
        path: raw.path,
        kind,
        created: raw.created,
        last_modified: raw.last_modified,
        size,
        payload,
    }
}
