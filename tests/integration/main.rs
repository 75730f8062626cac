//! Integration tests for the nbcontents service

mod checkpoint_history;
mod concurrent_create;
mod cli_parse;
mod path_properties;
mod rename_safety;
mod schema_validation;
