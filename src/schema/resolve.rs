//! Internal `$ref` resolution
//!
//! Inlines every `{"$ref": pointer}` node with the value the pointer addresses
//! in the same document. Only local references are supported.

use crate::error::{ContentsError, Result};
use serde_json::{Map, Value};
use tracing::trace;

/// Resolve internal references in `node` against `root`.
///
/// A map holding only `$ref` is replaced by its (recursively resolved) target.
/// A map holding `$ref` next to other keys is malformed.
pub fn resolve_refs(node: &Value, root: &Value) -> Result<Value> {
    let mut chain = Vec::new();
    resolve_inner(node, root, &mut chain)
}

fn resolve_inner(node: &Value, root: &Value, chain: &mut Vec<String>) -> Result<Value> {
    match node {
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_inner(item, root, chain))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                if map.len() != 1 {
                    return Err(ContentsError::SchemaError(
                        "objects containing a $ref should only have one item".to_string(),
                    ));
                }
                let reference = reference.as_str().ok_or_else(|| {
                    ContentsError::SchemaError(format!("$ref must be a string, got {}", reference))
                })?;
                let pointer = local_pointer(reference)?;
                if chain.contains(&pointer) {
                    return Err(ContentsError::SchemaError(format!(
                        "reference cycle through {}",
                        reference
                    )));
                }
                trace!("Resolving $ref {}", reference);
                let target = follow_pointer(root, &pointer)?;
                chain.push(pointer);
                let resolved = resolve_inner(target, root, chain);
                chain.pop();
                resolved
            } else {
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), resolve_inner(value, root, chain)?)))
                    .collect::<Result<Map<String, Value>>>()
                    .map(Value::Object)
            }
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Normalize a local reference to a JSON pointer.
///
/// `/a/b` and `#/a/b` are local; `#` and the empty string address the root.
/// Anything naming another document is unsupported.
pub fn local_pointer(reference: &str) -> Result<String> {
    if let Some(fragment) = reference.strip_prefix('#') {
        if fragment.is_empty() || fragment.starts_with('/') {
            return Ok(fragment.to_string());
        }
    } else if reference.is_empty() || reference.starts_with('/') {
        return Ok(reference.to_string());
    }
    Err(ContentsError::UnsupportedReference(reference.to_string()))
}

/// Follow a JSON pointer from the document root.
pub fn follow_pointer<'a>(root: &'a Value, pointer: &str) -> Result<&'a Value> {
    root.pointer(pointer)
        .ok_or_else(|| ContentsError::SchemaError(format!("unresolvable reference {}", pointer)))
}
