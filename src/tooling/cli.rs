//! CLI Tooling
//!
//! Command-line front end for the contents service. Every command prints a
//! JSON document on success.

use crate::config::{ConfigLoader, ContentsConfig};
use crate::error::{ContentsError, Result};
use crate::model::WriteModel;
use crate::path::LogicalPath;
use crate::service::ContentsService;
use crate::store::Contents;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

/// nbcontents - browse and edit a notebook content tree
#[derive(Parser)]
#[command(name = "nbcontents")]
#[command(about = "Filesystem-backed contents service with notebook checkpoints and validation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Content root directory (overrides storage.root_dir)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show metadata of one item
    Stat { path: String },
    /// Show an item with its payload
    Cat {
        path: String,
        /// Print the decoded payload instead of the JSON model
        #[arg(long)]
        raw: bool,
    },
    /// Upload a local file to a logical path
    Put { path: String, source: PathBuf },
    /// Rename or move an item; never overwrites
    Mv { src: String, dest: String },
    /// Delete a file or directory recursively
    Rm { path: String },
    /// Create a directory
    Mkdir {
        #[arg(default_value = "/")]
        path: String,
        /// Directory name (default: new_folder<n>)
        #[arg(long)]
        name: Option<String>,
    },
    /// Create an empty notebook named Untitled<n>.ipynb
    NewNotebook {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Copy a notebook to <name>-Copy<n>.ipynb
    CopyNotebook { path: String },
    /// Manage checkpoints
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommands,
    },
    /// Validate a notebook against its format schema
    Validate { path: String },
}

#[derive(Subcommand)]
pub enum CheckpointCommands {
    Create { path: String },
    List { path: String },
    Restore { path: String, checkpoint_id: String },
    Delete { path: String, checkpoint_id: String },
}

impl Cli {
    /// Resolve configuration from the config flag (or the working directory),
    /// the environment, and the remaining flags.
    pub fn load_config(&self) -> Result<ContentsConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&std::env::current_dir()?)?,
        };
        if let Some(root) = &self.root {
            config.storage.root_dir = root.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// CLI context holding the service for one invocation
pub struct CliContext {
    service: ContentsService,
}

impl CliContext {
    pub fn new(config: &ContentsConfig) -> Result<Self> {
        Ok(Self {
            service: ContentsService::from_config(config)?,
        })
    }

    pub fn service(&self) -> &ContentsService {
        &self.service
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String> {
        debug!("Executing {}", command_name(command));
        match command {
            Commands::Ls { path } => render(&self.service.list(path)?),
            Commands::Stat { path } => render(&self.service.stat(path, "")?),
            Commands::Cat { path, raw } => match self.service.get(path)? {
                Contents::Directory(items) => render(&items),
                Contents::Leaf(model) if *raw => {
                    let bytes = model.decoded_content().unwrap_or_default();
                    Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
                Contents::Leaf(model) => render(&model),
            },
            Commands::Put { path, source } => {
                let (parent, name) = split_item(path)?;
                let bytes = std::fs::read(source)
                    .map_err(|e| ContentsError::from_io(e, source.display().to_string()))?;
                render(&self.service.write(&parent, &WriteModel::from_bytes(name, &bytes))?)
            }
            Commands::Mv { src, dest } => render(&self.service.rename(src, dest)?),
            Commands::Rm { path } => {
                self.service.delete(path)?;
                render(&json!({ "deleted": LogicalPath::parse(path).to_string() }))
            }
            Commands::Mkdir { path, name } => {
                let created = self.service.make_container(name.as_deref(), path)?;
                render(&self.service.stat(path, &created)?)
            }
            Commands::NewNotebook { path } => render(&self.service.create_notebook(path)?),
            Commands::CopyNotebook { path } => {
                let (parent, name) = split_item(path)?;
                render(&self.service.copy_notebook(&parent, &name)?)
            }
            Commands::Checkpoint { command } => self.handle_checkpoint_command(command),
            Commands::Validate { path } => {
                let (parent, name) = split_item(path)?;
                let errors = self.service.validate_file(&parent, &name)?;
                render(&json!({
                    "path": LogicalPath::parse(path).to_string(),
                    "valid": errors.is_empty(),
                    "errors": errors,
                }))
            }
        }
    }

    fn handle_checkpoint_command(&self, command: &CheckpointCommands) -> Result<String> {
        match command {
            CheckpointCommands::Create { path } => {
                let (parent, name) = split_item(path)?;
                render(&self.service.create_checkpoint(&parent, &name)?)
            }
            CheckpointCommands::List { path } => {
                let (parent, name) = split_item(path)?;
                render(&self.service.list_checkpoints(&parent, &name)?)
            }
            CheckpointCommands::Restore {
                path,
                checkpoint_id,
            } => {
                let (parent, name) = split_item(path)?;
                self.service
                    .restore_checkpoint(&parent, &name, checkpoint_id)?;
                render(&self.service.stat(&parent, &name)?)
            }
            CheckpointCommands::Delete {
                path,
                checkpoint_id,
            } => {
                let (parent, name) = split_item(path)?;
                self.service
                    .delete_checkpoint(&parent, &name, checkpoint_id)?;
                render(&json!({ "deleted": checkpoint_id }))
            }
        }
    }
}

/// Split a combined logical path into (containing path, item name).
fn split_item(path: &str) -> Result<(String, String)> {
    let logical = LogicalPath::parse(path);
    match logical.split_last() {
        Some((parent, name)) => Ok((parent.to_string(), name.to_string())),
        None => Err(ContentsError::InvalidDestination(format!(
            "{:?} does not name an item",
            path
        ))),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Ls { .. } => "ls",
        Commands::Stat { .. } => "stat",
        Commands::Cat { .. } => "cat",
        Commands::Put { .. } => "put",
        Commands::Mv { .. } => "mv",
        Commands::Rm { .. } => "rm",
        Commands::Mkdir { .. } => "mkdir",
        Commands::NewNotebook { .. } => "new-notebook",
        Commands::CopyNotebook { .. } => "copy-notebook",
        Commands::Checkpoint { .. } => "checkpoint",
        Commands::Validate { .. } => "validate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(root: &std::path::Path) -> CliContext {
        let mut config = ContentsConfig::default();
        config.storage.root_dir = root.to_path_buf();
        config.checkpoints.id_strategy = "sequential".to_string();
        CliContext::new(&config).unwrap()
    }

    fn run(context: &CliContext, args: &[&str]) -> Result<String> {
        let mut argv = vec!["nbcontents"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        context.execute(&cli.command)
    }

    #[test]
    fn split_item_requires_a_name() {
        assert_eq!(
            split_item("/a/b.ipynb").unwrap(),
            ("a".to_string(), "b.ipynb".to_string())
        );
        assert!(split_item("/").is_err());
    }

    #[test]
    fn put_cat_and_ls() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.txt");
        std::fs::write(&source, "hello").unwrap();
        let root = temp.path().join("root");
        let context = context(&root);

        run(&context, &["put", "docs/a.txt", source.to_str().unwrap()]).unwrap();
        assert_eq!(run(&context, &["cat", "--raw", "docs/a.txt"]).unwrap(), "hello");

        let listing: serde_json::Value =
            serde_json::from_str(&run(&context, &["ls", "docs"]).unwrap()).unwrap();
        assert_eq!(listing[0]["name"], "a.txt");
        assert_eq!(listing[0]["type"], "file");
    }

    #[test]
    fn notebook_and_checkpoint_commands() {
        let temp = TempDir::new().unwrap();
        let context = context(temp.path());

        let created: serde_json::Value =
            serde_json::from_str(&run(&context, &["new-notebook"]).unwrap()).unwrap();
        assert_eq!(created["name"], "Untitled0.ipynb");

        let checkpoint: serde_json::Value = serde_json::from_str(
            &run(&context, &["checkpoint", "create", "Untitled0.ipynb"]).unwrap(),
        )
        .unwrap();
        assert_eq!(checkpoint["checkpoint_id"], "0");

        let report: serde_json::Value =
            serde_json::from_str(&run(&context, &["validate", "Untitled0.ipynb"]).unwrap())
                .unwrap();
        assert_eq!(report["valid"], true);

        let copy: serde_json::Value =
            serde_json::from_str(&run(&context, &["copy-notebook", "Untitled0.ipynb"]).unwrap())
                .unwrap();
        assert_eq!(copy["name"], "Untitled0-Copy0.ipynb");
    }

    #[test]
    fn rm_root_is_forbidden() {
        let temp = TempDir::new().unwrap();
        let context = context(temp.path());
        assert_eq!(
            run(&context, &["rm", "/"]).unwrap_err().kind(),
            crate::error::ErrorKind::Forbidden
        );
    }
}
