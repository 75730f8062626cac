//! Notebook document templates

use crate::error::{ContentsError, Result};
use serde_json::{json, Value};

pub const CURRENT_FORMAT: u32 = 4;
pub const SUPPORTED_FORMATS: [u32; 2] = [3, 4];

pub fn is_supported(format_version: u32) -> bool {
    SUPPORTED_FORMATS.contains(&format_version)
}

/// An empty notebook in the given major format.
pub fn new_notebook(format_version: u32) -> Result<Value> {
    match format_version {
        4 => Ok(json!({
            "cells": [],
            "metadata": {},
            "nbformat": 4,
            "nbformat_minor": 0
        })),
        3 => Ok(json!({
            "metadata": {"name": ""},
            "nbformat": 3,
            "nbformat_minor": 0,
            "worksheets": []
        })),
        other => Err(ContentsError::UnsupportedSchemaVersion(format!(
            "nbformat {}",
            other
        ))),
    }
}

/// Major format declared by a document, if any.
pub fn format_of(document: &Value) -> Option<u32> {
    document
        .get("nbformat")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// Serialized form written to storage: one-space indent, trailing newline.
pub fn to_bytes(document: &Value) -> Result<Vec<u8>> {
    use serde::Serialize;

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| ContentsError::InvalidPayload(format!("notebook is not valid JSON: {}", e)))
}
