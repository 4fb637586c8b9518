//! Response shape validation at the API boundary
//!
//! Every external response contour is written down once as an ordered list of
//! [`FieldSpec`]s and checked before any field is read. Violations surface as
//! a single [`Error::IncompleteResponse`] describing the first problem found,
//! in declaration order: a missing container is reported before a missing
//! leaf, a missing leaf before a wrong type.

use crate::error::{Error, Result};
use serde_json::Value;

/// Expected JSON type of a required field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string
    String,
    /// JSON number
    Number,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// JSON boolean
    Bool,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Bool => value.is_boolean(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Bool => "boolean",
        }
    }
}

/// One required field of a response body, addressed by dotted path
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Dotted path into the body, e.g. `"jobId"` or `"oldestDate.value"`
    pub path: &'static str,
    /// Expected type at that path
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Shorthand constructor
    pub const fn new(path: &'static str, kind: FieldKind) -> Self {
        Self { path, kind }
    }
}

/// Check `body` against `specs` in order. Returns `Ok(())` when every path
/// exists with the expected type; the body itself is never modified.
pub fn require(body: &Value, specs: &[FieldSpec]) -> Result<()> {
    for spec in specs {
        check_path(body, spec)?;
    }
    Ok(())
}

/// Walk a dotted path, reporting the first missing segment or type mismatch.
fn check_path(body: &Value, spec: &FieldSpec) -> Result<()> {
    let mut current = body;
    let mut walked = String::new();

    for segment in spec.path.split('.') {
        if !current.is_object() {
            return Err(Error::IncompleteResponse(format!(
                "expected object at {:?}, found {}",
                walked_or_root(&walked),
                json_type_name(current)
            )));
        }
        match current.get(segment) {
            Some(next) => {
                if !walked.is_empty() {
                    walked.push('.');
                }
                walked.push_str(segment);
                current = next;
            }
            None => {
                return Err(Error::IncompleteResponse(format!(
                    "response is missing required field {:?}",
                    join_path(&walked, segment)
                )));
            }
        }
    }

    if !spec.kind.matches(current) {
        return Err(Error::IncompleteResponse(format!(
            "field {:?} has unexpected type {} (expected {})",
            spec.path,
            json_type_name(current),
            spec.kind.name()
        )));
    }

    Ok(())
}

/// Fetch an optional field: `Ok(None)` when the path is absent, an error when
/// it is present with the wrong type.
pub fn optional<'a>(body: &'a Value, spec: &FieldSpec) -> Result<Option<&'a Value>> {
    let mut current = body;
    for segment in spec.path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    if !spec.kind.matches(current) {
        return Err(Error::IncompleteResponse(format!(
            "field {:?} has unexpected type {} (expected {})",
            spec.path,
            json_type_name(current),
            spec.kind.name()
        )));
    }
    Ok(Some(current))
}

/// Fetch a required string field after a successful [`require`] pass.
pub fn string_at(body: &Value, path: &str) -> Result<String> {
    value_at(body, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            Error::IncompleteResponse(format!("field {path:?} is not a string"))
        })
}

/// Fetch a required array field after a successful [`require`] pass.
pub fn array_at(body: &Value, path: &str) -> Result<Vec<Value>> {
    value_at(body, path)?
        .as_array()
        .cloned()
        .ok_or_else(|| Error::IncompleteResponse(format!("field {path:?} is not an array")))
}

fn value_at<'a>(body: &'a Value, path: &str) -> Result<&'a Value> {
    let mut current = body;
    for segment in path.split('.') {
        current = current.get(segment).ok_or_else(|| {
            Error::IncompleteResponse(format!("response is missing required field {path:?}"))
        })?;
    }
    Ok(current)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn walked_or_root(walked: &str) -> &str {
    if walked.is_empty() {
        "<root>"
    } else {
        walked
    }
}

fn join_path(walked: &str, segment: &str) -> String {
    if walked.is_empty() {
        segment.to_string()
    } else {
        format!("{walked}.{segment}")
    }
}
