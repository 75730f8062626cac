//! Tooling & Integration Layer
//!
//! Command-line front end over [`crate::service::ContentsService`].

pub mod cli;

pub use cli::{CheckpointCommands, Cli, CliContext, Commands};
