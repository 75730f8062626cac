//! nbcontents: notebook contents service
//!
//! Maps a logical path tree onto a storage root, with per-file checkpoint
//! history and notebook schema validation.

pub mod checkpoint;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod notebook;
pub mod path;
pub mod schema;
pub mod service;
pub mod store;
pub mod tooling;
pub mod types;

pub use error::{ContentsError, ErrorKind, Result};
pub use service::ContentsService;
