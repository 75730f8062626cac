//! Notebook schema validation
//!
//! Schemas are loaded lazily, once per format version, resolved into a
//! self-contained document and cached. Validation evaluates the `/notebook`
//! sub-schema and reports every violation it finds.

pub mod evaluate;
pub mod resolve;

pub use evaluate::{Draft, Evaluator, ValidationError};
pub use resolve::{follow_pointer, local_pointer, resolve_refs};

use crate::error::{ContentsError, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Pointer to the notebook sub-schema inside each schema document
pub const NOTEBOOK_POINTER: &str = "/notebook";

const BUNDLED_V3: &str = include_str!("../../schemas/nbformat.v3.schema.json");
const BUNDLED_V4: &str = include_str!("../../schemas/nbformat.v4.schema.json");

/// Where schema documents come from
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// Schemas compiled into the binary
    Bundled,
    /// A directory holding `nbformat.v<N>.schema.json` files
    Directory(PathBuf),
    /// One document used for every version (tests, embedding)
    Inline(Value),
}

impl SchemaSource {
    fn load(&self, format_version: u32) -> Result<Value> {
        match self {
            SchemaSource::Bundled => {
                let text = match format_version {
                    3 => BUNDLED_V3,
                    4 => BUNDLED_V4,
                    other => {
                        return Err(ContentsError::UnsupportedSchemaVersion(format!(
                            "no bundled schema for nbformat {}",
                            other
                        )))
                    }
                };
                Ok(serde_json::from_str(text)?)
            }
            SchemaSource::Directory(dir) => {
                let file = dir.join(format!("nbformat.v{}.schema.json", format_version));
                let text = std::fs::read_to_string(&file)
                    .map_err(|e| ContentsError::from_io(e, &file.display().to_string()))?;
                Ok(serde_json::from_str(&text)?)
            }
            SchemaSource::Inline(document) => Ok(document.clone()),
        }
    }
}

/// A schema document with every internal reference inlined
#[derive(Debug)]
pub struct LoadedSchema {
    pub format_version: u32,
    pub draft: Draft,
    pub resolved: Value,
}

impl LoadedSchema {
    pub fn notebook(&self) -> Result<&Value> {
        follow_pointer(&self.resolved, NOTEBOOK_POINTER)
    }
}

/// Process-wide cache of resolved schemas, keyed by format version
pub struct SchemaCache {
    source: SchemaSource,
    schemas: RwLock<HashMap<u32, Arc<LoadedSchema>>>,
}

impl SchemaCache {
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn bundled() -> Self {
        Self::new(SchemaSource::Bundled)
    }

    /// Get the resolved schema for a version, loading it on first use.
    pub fn get(&self, format_version: u32) -> Result<Arc<LoadedSchema>> {
        {
            let schemas = self.schemas.read();
            if let Some(schema) = schemas.get(&format_version) {
                return Ok(Arc::clone(schema));
            }
        }

        let mut schemas = self.schemas.write();
        // Another thread may have loaded it between the locks
        if let Some(schema) = schemas.get(&format_version) {
            return Ok(Arc::clone(schema));
        }

        let document = self.source.load(format_version)?;
        let draft = Draft::declared_by(&document)?;
        let resolved = resolve_refs(&document, &document)?;
        let schema = Arc::new(LoadedSchema {
            format_version,
            draft,
            resolved,
        });
        schemas.insert(format_version, Arc::clone(&schema));

        info!(
            "Loaded nbformat v{} schema ({:?})",
            format_version, draft
        );
        Ok(schema)
    }

    pub fn is_loaded(&self, format_version: u32) -> bool {
        self.schemas.read().contains_key(&format_version)
    }
}

/// Validator for one notebook format version
#[derive(Clone)]
pub struct SchemaValidator {
    cache: Arc<SchemaCache>,
    format_version: u32,
}

impl SchemaValidator {
    pub fn new(cache: Arc<SchemaCache>, format_version: u32) -> Self {
        Self {
            cache,
            format_version,
        }
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// All structural violations of `document`. Empty means valid.
    pub fn validate(&self, document: &Value) -> Result<Vec<ValidationError>> {
        let schema = self.cache.get(self.format_version)?;
        let errors = Evaluator::new(schema.draft).run(schema.notebook()?, document)?;
        debug!(
            "Validated document against nbformat v{}: {} errors",
            self.format_version,
            errors.len()
        );
        Ok(errors)
    }

    pub fn is_valid(&self, document: &Value) -> Result<bool> {
        Ok(self.validate(document)?.is_empty())
    }
}
