use nbcontents::notebook::new_notebook;
use nbcontents::schema::{resolve_refs, SchemaCache, SchemaValidator};
use nbcontents::ErrorKind;
use serde_json::json;
use std::sync::Arc;

fn validator(version: u32) -> SchemaValidator {
    SchemaValidator::new(Arc::new(SchemaCache::bundled()), version)
}

#[test]
fn resolve_refs_examples() {
    let schema = json!({"a": {"$ref": "/b"}, "b": {"type": "string"}});
    let resolved = resolve_refs(&schema, &schema).unwrap();
    assert_eq!(resolved["a"], json!({"type": "string"}));

    let schema = json!({"a": {"$ref": "/b", "extra": 1}, "b": {}});
    assert_eq!(
        resolve_refs(&schema, &schema).unwrap_err().kind(),
        ErrorKind::SchemaError
    );
}

#[test]
fn empty_notebooks_are_valid() {
    for version in [3, 4] {
        let errors = validator(version).validate(&new_notebook(version).unwrap()).unwrap();
        assert!(errors.is_empty(), "v{}: {:?}", version, errors);
    }
}

#[test]
fn cells_must_be_a_list() {
    let errors = validator(4)
        .validate(&json!({"cells": "not-a-list"}))
        .unwrap();
    assert!(errors
        .iter()
        .any(|e| e.instance_path == "/cells" && e.keyword == "type"));
    // Missing top-level keys are reported too
    assert!(errors.iter().filter(|e| e.keyword == "required").count() >= 3);
}

#[test]
fn v4_cells_and_outputs() {
    let notebook = json!({
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": "# Title"},
            {
                "cell_type": "code",
                "metadata": {"collapsed": false},
                "source": ["print(1)\n"],
                "execution_count": 1,
                "outputs": [
                    {"output_type": "stream", "name": "stdout", "text": ["1\n"]},
                    {
                        "output_type": "execute_result",
                        "execution_count": 1,
                        "data": {"text/plain": "1", "application/json": {"a": 1}},
                        "metadata": {}
                    }
                ]
            }
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 0
    });
    let validator = validator(4);
    assert!(validator.is_valid(&notebook).unwrap());

    let mut broken = notebook.clone();
    broken["cells"][1]["cell_type"] = json!("python");
    let errors = validator.validate(&broken).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_path, "/cells/1");
    assert_eq!(errors[0].keyword, "oneOf");
}

#[test]
fn v3_worksheets() {
    let notebook = json!({
        "metadata": {"name": "demo"},
        "nbformat": 3,
        "nbformat_minor": 0,
        "worksheets": [{
            "cells": [
                {"cell_type": "heading", "level": 1, "metadata": {}, "source": "Title"},
                {
                    "cell_type": "code",
                    "language": "python",
                    "input": ["x = 1"],
                    "outputs": [],
                    "metadata": {}
                }
            ],
            "metadata": {}
        }]
    });
    let validator = validator(3);
    assert!(validator.is_valid(&notebook).unwrap());

    let mut broken = notebook.clone();
    broken["worksheets"][0]["cells"][0]
        .as_object_mut()
        .unwrap()
        .remove("level");
    assert!(!validator.is_valid(&broken).unwrap());

    let errors = validator.validate(&json!({"nbformat": 3})).unwrap();
    let required: Vec<&str> = errors
        .iter()
        .filter(|e| e.keyword == "required")
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(required.len(), 3, "{:?}", errors);
}
