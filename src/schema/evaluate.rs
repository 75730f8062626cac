//! Structural evaluation of JSON documents against draft 3 / draft 4 schemas
//!
//! The evaluator walks schema and instance together and records every
//! violation instead of stopping at the first one. `format` is not checked.

use crate::error::{ContentsError, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

const DRAFT4_URI: &str = "http://json-schema.org/draft-04/schema";
const DRAFT3_URI: &str = "http://json-schema.org/draft-03/schema";

/// Schema dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draft {
    Draft3,
    Draft4,
}

impl Draft {
    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri.trim_end_matches('#') {
            DRAFT4_URI => Ok(Draft::Draft4),
            DRAFT3_URI => Ok(Draft::Draft3),
            _ => Err(ContentsError::UnsupportedSchemaVersion(uri.to_string())),
        }
    }

    /// Dialect declared by a schema document's `$schema` key.
    pub fn declared_by(document: &Value) -> Result<Self> {
        let uri = document
            .get("$schema")
            .and_then(Value::as_str)
            .ok_or_else(|| ContentsError::UnsupportedSchemaVersion("missing $schema".to_string()))?;
        Self::from_uri(uri)
    }
}

/// One structural violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// JSON pointer to the offending value in the document
    pub instance_path: String,
    /// JSON pointer to the failing keyword in the schema
    pub schema_path: String,
    pub keyword: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            "/"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "{} (at {})", self.message, at)
    }
}

pub struct Evaluator {
    draft: Draft,
    errors: Vec<ValidationError>,
    patterns: HashMap<String, Regex>,
}

impl Evaluator {
    pub fn new(draft: Draft) -> Self {
        Self {
            draft,
            errors: Vec::new(),
            patterns: HashMap::new(),
        }
    }

    /// Evaluate `instance` against `schema` and return all violations.
    pub fn run(mut self, schema: &Value, instance: &Value) -> Result<Vec<ValidationError>> {
        self.evaluate(schema, instance, "", "")?;
        Ok(self.errors)
    }

    /// Evaluate into a fresh error list, leaving the outer one untouched.
    fn collect(
        &mut self,
        schema: &Value,
        instance: &Value,
        ipath: &str,
        spath: &str,
    ) -> Result<Vec<ValidationError>> {
        let saved = std::mem::take(&mut self.errors);
        let outcome = self.evaluate(schema, instance, ipath, spath);
        let found = std::mem::replace(&mut self.errors, saved);
        outcome?;
        Ok(found)
    }

    fn report(&mut self, ipath: &str, spath: &str, keyword: &str, message: String) {
        self.errors.push(ValidationError {
            instance_path: ipath.to_string(),
            schema_path: format!("{}/{}", spath, keyword),
            keyword: keyword.to_string(),
            message,
        });
    }

    fn regex(&mut self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern)
            .map_err(|e| ContentsError::SchemaError(format!("invalid pattern {:?}: {}", pattern, e)))?;
        self.patterns.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn evaluate(&mut self, schema: &Value, instance: &Value, ipath: &str, spath: &str) -> Result<()> {
        let Some(schema) = schema.as_object() else {
            return Ok(());
        };

        if let Some(ty) = schema.get("type") {
            if !self.type_matches(ty, instance, ipath, spath)? {
                self.report(
                    ipath,
                    spath,
                    "type",
                    format!("{} is not of type {}", preview(instance), describe_type(ty)),
                );
            }
        }
        if let Some(Value::Array(allowed)) = schema.get("enum") {
            if !allowed.iter().any(|candidate| json_equal(candidate, instance)) {
                self.report(
                    ipath,
                    spath,
                    "enum",
                    format!("{} is not one of {}", preview(instance), preview(&Value::Array(allowed.clone()))),
                );
            }
        }

        match instance {
            Value::Object(object) => self.evaluate_object(schema, object, ipath, spath)?,
            Value::Array(items) => self.evaluate_array(schema, items, ipath, spath)?,
            Value::String(text) => self.evaluate_string(schema, text, ipath, spath)?,
            Value::Number(_) => self.evaluate_number(schema, instance, ipath, spath),
            _ => {}
        }

        match self.draft {
            Draft::Draft4 => self.evaluate_combinators(schema, instance, ipath, spath)?,
            Draft::Draft3 => self.evaluate_draft3_extras(schema, instance, ipath, spath)?,
        }
        Ok(())
    }

    fn type_matches(&mut self, ty: &Value, instance: &Value, ipath: &str, spath: &str) -> Result<bool> {
        match ty {
            Value::String(name) => Ok(primitive_matches(self.draft, name, instance)),
            Value::Array(options) => {
                for option in options {
                    if self.type_matches(option, instance, ipath, spath)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            // Draft 3 union members may be whole schemas
            Value::Object(_) if self.draft == Draft::Draft3 => {
                Ok(self.collect(ty, instance, ipath, &format!("{}/type", spath))?.is_empty())
            }
            _ => Ok(false),
        }
    }

    fn evaluate_object(
        &mut self,
        schema: &Map<String, Value>,
        object: &Map<String, Value>,
        ipath: &str,
        spath: &str,
    ) -> Result<()> {
        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            for (key, subschema) in properties {
                let sub_spath = format!("{}/properties/{}", spath, escape(key));
                match object.get(key) {
                    Some(value) => {
                        self.evaluate(subschema, value, &child(ipath, key), &sub_spath)?
                    }
                    None => {
                        if self.draft == Draft::Draft3
                            && subschema.get("required").and_then(Value::as_bool) == Some(true)
                        {
                            self.report(
                                ipath,
                                &sub_spath,
                                "required",
                                format!("'{}' is a required property", key),
                            );
                        }
                    }
                }
            }
        }

        if self.draft == Draft::Draft4 {
            if let Some(Value::Array(required)) = schema.get("required") {
                for key in required.iter().filter_map(Value::as_str) {
                    if !object.contains_key(key) {
                        self.report(
                            ipath,
                            spath,
                            "required",
                            format!("'{}' is a required property", key),
                        );
                    }
                }
            }
            if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
                if (object.len() as u64) < min {
                    self.report(
                        ipath,
                        spath,
                        "minProperties",
                        format!("object has fewer than {} properties", min),
                    );
                }
            }
            if let Some(max) = schema.get("maxProperties").and_then(Value::as_u64) {
                if (object.len() as u64) > max {
                    self.report(
                        ipath,
                        spath,
                        "maxProperties",
                        format!("object has more than {} properties", max),
                    );
                }
            }
        }

        let mut pattern_matched: Vec<&str> = Vec::new();
        if let Some(patterns) = schema.get("patternProperties").and_then(Value::as_object) {
            for (pattern, subschema) in patterns {
                let regex = self.regex(pattern)?;
                let sub_spath = format!("{}/patternProperties/{}", spath, escape(pattern));
                for (key, value) in object {
                    if regex.is_match(key) {
                        pattern_matched.push(key.as_str());
                        self.evaluate(subschema, value, &child(ipath, key), &sub_spath)?;
                    }
                }
            }
        }

        if let Some(additional) = schema.get("additionalProperties") {
            let extras: Vec<&String> = object
                .keys()
                .filter(|key| {
                    !properties.map(|p| p.contains_key(*key)).unwrap_or(false)
                        && !pattern_matched.contains(&key.as_str())
                })
                .collect();
            match additional {
                Value::Bool(false) if !extras.is_empty() => {
                    let names: Vec<String> = extras.iter().map(|k| format!("'{}'", k)).collect();
                    self.report(
                        ipath,
                        spath,
                        "additionalProperties",
                        format!(
                            "Additional properties are not allowed ({} unexpected)",
                            names.join(", ")
                        ),
                    );
                }
                Value::Object(_) => {
                    let sub_spath = format!("{}/additionalProperties", spath);
                    for key in extras {
                        self.evaluate(additional, &object[key], &child(ipath, key), &sub_spath)?;
                    }
                }
                _ => {}
            }
        }

        if let Some(dependencies) = schema.get("dependencies").and_then(Value::as_object) {
            for (key, dependency) in dependencies {
                if !object.contains_key(key) {
                    continue;
                }
                let sub_spath = format!("{}/dependencies/{}", spath, escape(key));
                match dependency {
                    Value::Object(_) => {
                        self.evaluate(dependency, &Value::Object(object.clone()), ipath, &sub_spath)?
                    }
                    Value::Array(names) => {
                        for name in names.iter().filter_map(Value::as_str) {
                            if !object.contains_key(name) {
                                self.report(
                                    ipath,
                                    spath,
                                    "dependencies",
                                    format!("'{}' is a dependency of '{}'", name, key),
                                );
                            }
                        }
                    }
                    Value::String(name) if self.draft == Draft::Draft3 => {
                        if !object.contains_key(name) {
                            self.report(
                                ipath,
                                spath,
                                "dependencies",
                                format!("'{}' is a dependency of '{}'", name, key),
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn evaluate_array(
        &mut self,
        schema: &Map<String, Value>,
        items: &[Value],
        ipath: &str,
        spath: &str,
    ) -> Result<()> {
        match schema.get("items") {
            Some(item_schema @ Value::Object(_)) => {
                let sub_spath = format!("{}/items", spath);
                for (index, item) in items.iter().enumerate() {
                    self.evaluate(item_schema, item, &child(ipath, &index.to_string()), &sub_spath)?;
                }
            }
            Some(Value::Array(tuple)) => {
                for (index, (item, item_schema)) in items.iter().zip(tuple).enumerate() {
                    let sub_spath = format!("{}/items/{}", spath, index);
                    self.evaluate(item_schema, item, &child(ipath, &index.to_string()), &sub_spath)?;
                }
                if items.len() > tuple.len() {
                    match schema.get("additionalItems") {
                        Some(Value::Bool(false)) => self.report(
                            ipath,
                            spath,
                            "additionalItems",
                            format!("Additional items are not allowed ({} extra)", items.len() - tuple.len()),
                        ),
                        Some(extra @ Value::Object(_)) => {
                            let sub_spath = format!("{}/additionalItems", spath);
                            for (index, item) in items.iter().enumerate().skip(tuple.len()) {
                                self.evaluate(extra, item, &child(ipath, &index.to_string()), &sub_spath)?;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                self.report(ipath, spath, "minItems", format!("array is too short (minimum {})", min));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                self.report(ipath, spath, "maxItems", format!("array is too long (maximum {})", max));
            }
        }
        if schema.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
            let duplicated = items
                .iter()
                .enumerate()
                .any(|(i, a)| items[i + 1..].iter().any(|b| json_equal(a, b)));
            if duplicated {
                self.report(ipath, spath, "uniqueItems", "array has non-unique elements".to_string());
            }
        }
        Ok(())
    }

    fn evaluate_string(
        &mut self,
        schema: &Map<String, Value>,
        text: &str,
        ipath: &str,
        spath: &str,
    ) -> Result<()> {
        let length = text.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                self.report(ipath, spath, "minLength", format!("{:?} is too short", text));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                self.report(ipath, spath, "maxLength", format!("{:?} is too long", text));
            }
        }
        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            if !self.regex(pattern)?.is_match(text) {
                self.report(
                    ipath,
                    spath,
                    "pattern",
                    format!("{:?} does not match {:?}", text, pattern),
                );
            }
        }
        Ok(())
    }

    fn evaluate_number(&mut self, schema: &Map<String, Value>, instance: &Value, ipath: &str, spath: &str) {
        let Some(value) = instance.as_f64() else {
            return;
        };
        if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
            let exclusive = schema.get("exclusiveMinimum").and_then(Value::as_bool) == Some(true);
            if value < minimum || (exclusive && value == minimum) {
                self.report(
                    ipath,
                    spath,
                    "minimum",
                    format!("{} is less than the minimum of {}", instance, minimum),
                );
            }
        }
        if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
            let exclusive = schema.get("exclusiveMaximum").and_then(Value::as_bool) == Some(true);
            if value > maximum || (exclusive && value == maximum) {
                self.report(
                    ipath,
                    spath,
                    "maximum",
                    format!("{} is greater than the maximum of {}", instance, maximum),
                );
            }
        }
        let keyword = match self.draft {
            Draft::Draft4 => "multipleOf",
            Draft::Draft3 => "divisibleBy",
        };
        if let Some(divisor) = schema.get(keyword).and_then(Value::as_f64) {
            if divisor > 0.0 {
                let quotient = value / divisor;
                if (quotient - quotient.round()).abs() > 1e-9 {
                    self.report(
                        ipath,
                        spath,
                        keyword,
                        format!("{} is not a multiple of {}", instance, divisor),
                    );
                }
            }
        }
    }

    fn evaluate_combinators(
        &mut self,
        schema: &Map<String, Value>,
        instance: &Value,
        ipath: &str,
        spath: &str,
    ) -> Result<()> {
        if let Some(Value::Array(all)) = schema.get("allOf") {
            for (index, subschema) in all.iter().enumerate() {
                self.evaluate(subschema, instance, ipath, &format!("{}/allOf/{}", spath, index))?;
            }
        }
        if let Some(Value::Array(any)) = schema.get("anyOf") {
            let mut matched = false;
            for (index, subschema) in any.iter().enumerate() {
                let sub_spath = format!("{}/anyOf/{}", spath, index);
                if self.collect(subschema, instance, ipath, &sub_spath)?.is_empty() {
                    matched = true;
                    break;
                }
            }
            if !matched {
                self.report(
                    ipath,
                    spath,
                    "anyOf",
                    format!("{} is not valid under any of the given schemas", preview(instance)),
                );
            }
        }
        if let Some(Value::Array(one)) = schema.get("oneOf") {
            let mut matches = 0;
            for (index, subschema) in one.iter().enumerate() {
                let sub_spath = format!("{}/oneOf/{}", spath, index);
                if self.collect(subschema, instance, ipath, &sub_spath)?.is_empty() {
                    matches += 1;
                }
            }
            if matches == 0 {
                self.report(
                    ipath,
                    spath,
                    "oneOf",
                    format!("{} is not valid under any of the given schemas", preview(instance)),
                );
            } else if matches > 1 {
                self.report(
                    ipath,
                    spath,
                    "oneOf",
                    format!("{} is valid under each of {} schemas", preview(instance), matches),
                );
            }
        }
        if let Some(negated) = schema.get("not") {
            let sub_spath = format!("{}/not", spath);
            if self.collect(negated, instance, ipath, &sub_spath)?.is_empty() {
                self.report(
                    ipath,
                    spath,
                    "not",
                    format!("{} is not allowed for {}", preview(negated), preview(instance)),
                );
            }
        }
        Ok(())
    }

    fn evaluate_draft3_extras(
        &mut self,
        schema: &Map<String, Value>,
        instance: &Value,
        ipath: &str,
        spath: &str,
    ) -> Result<()> {
        match schema.get("extends") {
            Some(base @ Value::Object(_)) => {
                self.evaluate(base, instance, ipath, &format!("{}/extends", spath))?
            }
            Some(Value::Array(bases)) => {
                for (index, base) in bases.iter().enumerate() {
                    self.evaluate(base, instance, ipath, &format!("{}/extends/{}", spath, index))?;
                }
            }
            _ => {}
        }
        if let Some(disallowed) = schema.get("disallow") {
            if self.type_matches(disallowed, instance, ipath, spath)? {
                self.report(
                    ipath,
                    spath,
                    "disallow",
                    format!("{} is disallowed for {}", describe_type(disallowed), preview(instance)),
                );
            }
        }
        Ok(())
    }
}

fn primitive_matches(draft: Draft, name: &str, instance: &Value) -> bool {
    match name {
        "array" => instance.is_array(),
        "object" => instance.is_object(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        // A float literal is never an integer, even with no fractional part
        "integer" => instance.is_i64() || instance.is_u64(),
        "any" => draft == Draft::Draft3,
        _ => false,
    }
}

/// Equality with numbers compared by value, so `1` equals `1.0`.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| json_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn describe_type(ty: &Value) -> String {
    match ty {
        Value::String(name) => format!("'{}'", name),
        Value::Array(options) => {
            let names: Vec<String> = options.iter().map(describe_type).collect();
            names.join(" or ")
        }
        _ => "schema".to_string(),
    }
}

fn preview(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() > 60 {
        let cut: String = rendered.chars().take(57).collect();
        format!("{}...", cut)
    } else {
        rendered
    }
}

/// RFC 6901 escaping of one pointer segment
fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn child(ipath: &str, segment: &str) -> String {
    format!("{}/{}", ipath, escape(segment))
}
