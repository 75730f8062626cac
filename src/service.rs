//! Contents service facade
//!
//! Bundles a storage backend, a checkpoint backend and the schema cache behind
//! one entry point, and adds the notebook-level operations: create, copy,
//! save with validation, load.

use crate::checkpoint::{
    self, Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, NoCheckpoints,
};
use crate::config::{CheckpointBackend, ContentsConfig, StorageBackend};
use crate::error::{ContentsError, Result};
use crate::model::{ContentDescriptor, WriteModel};
use crate::notebook;
use crate::path::NotebookAddress;
use crate::schema::{SchemaCache, SchemaSource, SchemaValidator, ValidationError};
use crate::store::{item_address, Contents, ContentStore, FileSystemStore, MemoryStore};
use crate::types::NOTEBOOK_EXTENSION;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ContentsService {
    store: Arc<dyn ContentStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    schemas: Arc<SchemaCache>,
    format_version: u32,
}

impl ContentsService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        schemas: Arc<SchemaCache>,
        format_version: u32,
    ) -> Self {
        Self {
            store,
            checkpoints,
            schemas,
            format_version,
        }
    }

    /// Build backends as selected by configuration.
    pub fn from_config(config: &ContentsConfig) -> Result<Self> {
        config.validate()?;

        let root = config.storage.root_dir.clone();
        let store: Arc<dyn ContentStore> = match config.storage.backend {
            StorageBackend::Filesystem => Arc::new(FileSystemStore::open(root)?),
            StorageBackend::Memory => Arc::new(MemoryStore::new(root)),
        };

        let ids = checkpoint::id_generator(&config.checkpoints.id_strategy)?;
        let checkpoints: Arc<dyn CheckpointStore> = match config.checkpoints.backend {
            CheckpointBackend::File => Arc::new(FileCheckpointStore::new(ids)),
            CheckpointBackend::Memory => Arc::new(MemoryCheckpointStore::new(ids)),
            CheckpointBackend::None => Arc::new(NoCheckpoints),
        };

        let source = match &config.notebook.schema_dir {
            Some(dir) => SchemaSource::Directory(dir.clone()),
            None => SchemaSource::Bundled,
        };

        info!(
            "Contents service at {} ({:?} storage, {:?} checkpoints, nbformat {})",
            config.storage.root_dir.display(),
            config.storage.backend,
            config.checkpoints.backend,
            config.notebook.format_version
        );
        Ok(Self::new(
            store,
            checkpoints,
            Arc::new(SchemaCache::new(source)),
            config.notebook.format_version,
        ))
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    // Storage passthroughs

    pub fn get(&self, path: &str) -> Result<Contents> {
        self.store.get(path)
    }

    pub fn list(&self, path: &str) -> Result<Vec<ContentDescriptor>> {
        self.store.list(path)
    }

    pub fn stat(&self, path: &str, name: &str) -> Result<ContentDescriptor> {
        self.store.stat(path, name)
    }

    pub fn read(&self, path: &str, name: &str) -> Result<ContentDescriptor> {
        self.store.read(path, name)
    }

    pub fn write(&self, path: &str, model: &WriteModel) -> Result<ContentDescriptor> {
        self.store.write(path, model)
    }

    pub fn rename(&self, src: &str, dest: &str) -> Result<ContentDescriptor> {
        self.store.rename(src, dest)
    }

    /// Delete an item along with the checkpoint history kept for it.
    pub fn delete(&self, path: &str) -> Result<()> {
        self.store.delete(path)?;
        self.checkpoints.forget(self.store.as_ref(), path)
    }

    pub fn make_container(&self, name: Option<&str>, path: &str) -> Result<String> {
        self.store.make_container(name, path)
    }

    // Notebook operations

    /// Write an empty notebook as `Untitled<n>.ipynb` under `path`.
    pub fn create_notebook(&self, path: &str) -> Result<ContentDescriptor> {
        let document = notebook::new_notebook(self.format_version)?;
        let model = self.store.create_new(
            path,
            "Untitled",
            NOTEBOOK_EXTENSION,
            &notebook::to_bytes(&document)?,
        )?;
        info!("Created notebook {}/{}", model.path, model.name);
        Ok(model)
    }

    /// Copy a notebook to `<stem>-Copy<n>.ipynb` in the same directory.
    pub fn copy_notebook(&self, path: &str, name: &str) -> Result<ContentDescriptor> {
        let (parent, name) = item_address(path, name);
        let parent = parent.to_string();
        let mut document = self.load_notebook(&parent, &name)?;

        let stem = name.strip_suffix(NOTEBOOK_EXTENSION).unwrap_or(&name);
        let mut model = self.store.create_new(
            &parent,
            &format!("{}-Copy", stem),
            NOTEBOOK_EXTENSION,
            &notebook::to_bytes(&document)?,
        )?;
        let copy_name = model.name.clone();

        // Format 3 documents carry their own name in metadata
        if let Some(Value::Object(metadata)) = document.get_mut("metadata") {
            if metadata.contains_key("name") {
                let copy_stem = copy_name
                    .strip_suffix(NOTEBOOK_EXTENSION)
                    .unwrap_or(&copy_name);
                metadata.insert("name".to_string(), Value::String(copy_stem.to_string()));
                model = self
                    .store
                    .write_bytes(&parent, &copy_name, &notebook::to_bytes(&document)?)?;
            }
        }

        info!("Copied notebook {} to {}", name, copy_name);
        Ok(model)
    }

    /// Serialize and write a notebook document, optionally validating first.
    pub fn save_notebook(
        &self,
        path: &str,
        name: &str,
        document: &Value,
        validate: bool,
    ) -> Result<ContentDescriptor> {
        if validate {
            let errors = self.validate(document)?;
            if let Some(first) = errors.first() {
                warn!("Rejected invalid notebook {}: {} errors", name, errors.len());
                return Err(ContentsError::InvalidPayload(format!(
                    "{}: {} validation errors, first: {}",
                    name,
                    errors.len(),
                    first
                )));
            }
        }
        self.store
            .write_bytes(path, name, &notebook::to_bytes(document)?)
    }

    pub fn load_notebook(&self, path: &str, name: &str) -> Result<Value> {
        let bytes = self.store.read_bytes(path, name)?;
        notebook::from_bytes(&bytes)
    }

    /// Resolve a combined notebook-surface path: a notebook yields its loaded
    /// descriptor, anything else is treated as a directory.
    pub fn open_notebook(&self, combined: &str) -> Result<Contents> {
        let address = NotebookAddress::parse(combined);
        debug!("Opening {:?}", address);
        match address.name {
            Some(name) => Ok(Contents::Leaf(self.store.read(&address.path, &name)?)),
            None => Ok(Contents::Directory(self.store.list(&address.path)?)),
        }
    }

    // Checkpoints

    pub fn create_checkpoint(&self, path: &str, name: &str) -> Result<Checkpoint> {
        self.checkpoints.create(self.store.as_ref(), path, name)
    }

    pub fn list_checkpoints(&self, path: &str, name: &str) -> Result<Vec<Checkpoint>> {
        self.checkpoints.list(self.store.as_ref(), path, name)
    }

    pub fn restore_checkpoint(&self, path: &str, name: &str, checkpoint_id: &str) -> Result<()> {
        self.checkpoints
            .restore(self.store.as_ref(), path, name, checkpoint_id)
    }

    pub fn delete_checkpoint(&self, path: &str, name: &str, checkpoint_id: &str) -> Result<()> {
        self.checkpoints
            .delete(self.store.as_ref(), path, name, checkpoint_id)
    }

    // Validation

    pub fn validator(&self, format_version: u32) -> SchemaValidator {
        SchemaValidator::new(Arc::clone(&self.schemas), format_version)
    }

    /// Validate against the format the document declares, or the configured
    /// format when it declares none.
    pub fn validate(&self, document: &Value) -> Result<Vec<ValidationError>> {
        let version = notebook::format_of(document).unwrap_or(self.format_version);
        if !notebook::is_supported(version) {
            return Err(ContentsError::UnsupportedSchemaVersion(format!(
                "nbformat {}",
                version
            )));
        }
        self.validator(version).validate(document)
    }

    pub fn is_valid(&self, document: &Value) -> Result<bool> {
        Ok(self.validate(document)?.is_empty())
    }

    pub fn validate_file(&self, path: &str, name: &str) -> Result<Vec<ValidationError>> {
        let document = self.load_notebook(path, name)?;
        self.validate(&document)
    }
}
