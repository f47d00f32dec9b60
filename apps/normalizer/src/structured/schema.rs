//! Validation and coercion of the model's JSON answer into a draft.
//!
//! Tolerated: code fences, chatter around the object, `null` or missing
//! fields, numbers where strings are expected, a single string where a list
//! is expected. Anything else is a `SchemaError`.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm_client::{json_object_span, strip_json_fences};
use crate::models::resume::{EducationDetail, Experience, StructuredResumeDraft};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("No JSON object found in completion")]
    NoJsonObject,

    #[error("Completion is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Completion JSON is not an object")]
    NotAnObject,

    #[error("Field `{field}` should be {expected}")]
    Mismatch {
        field: String,
        expected: &'static str,
    },
}

pub fn parse_completion(text: &str) -> Result<StructuredResumeDraft, SchemaError> {
    let body = json_object_span(strip_json_fences(text)).ok_or(SchemaError::NoJsonObject)?;
    let value: Value = serde_json::from_str(body)?;
    let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

    Ok(StructuredResumeDraft {
        name: string_field(obj, "name")?,
        email: string_field(obj, "email")?,
        phone: string_field(obj, "phone")?,
        location: string_field(obj, "location")?,
        title: string_field(obj, "title")?,
        summary: string_field(obj, "summary")?,
        skills: string_list(obj, "skills")?,
        experience: object_list(obj, "experience", |entry, field| {
            Ok(Experience {
                title: string_field(entry, "title").map_err(|e| nested(field, e))?,
                company: string_field(entry, "company").map_err(|e| nested(field, e))?,
                duration: string_field(entry, "duration").map_err(|e| nested(field, e))?,
                description: string_field(entry, "description").map_err(|e| nested(field, e))?,
            })
        })?,
        education: string_list(obj, "education")?,
        education_details: object_list(obj, "educationDetails", |entry, field| {
            Ok(EducationDetail {
                degree: string_field(entry, "degree").map_err(|e| nested(field, e))?,
                institution: string_field(entry, "institution").map_err(|e| nested(field, e))?,
                year: string_field(entry, "year").map_err(|e| nested(field, e))?,
            })
        })?,
        certifications: string_list(obj, "certifications")?,
        languages: string_list(obj, "languages")?,
        experience_level: string_field(obj, "experienceLevel")?,
    })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Result<String, SchemaError> {
    match obj.get(field) {
        None => Ok(String::new()),
        Some(value) => scalar(value).ok_or_else(|| SchemaError::Mismatch {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

fn string_list(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, SchemaError> {
    let mismatch = || SchemaError::Mismatch {
        field: field.to_string(),
        expected: "a list of strings",
    };
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| scalar(item).ok_or_else(mismatch))
            .filter(|item| !matches!(item, Ok(s) if s.trim().is_empty()))
            .collect(),
        Some(_) => Err(mismatch()),
    }
}

fn object_list<T>(
    obj: &Map<String, Value>,
    field: &str,
    convert: impl Fn(&Map<String, Value>, &str) -> Result<T, SchemaError>,
) -> Result<Vec<T>, SchemaError> {
    let mismatch = || SchemaError::Mismatch {
        field: field.to_string(),
        expected: "a list of objects",
    };
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().ok_or_else(mismatch).and_then(|entry| convert(entry, field)))
            .collect(),
        Some(_) => Err(mismatch()),
    }
}

fn nested(parent: &str, err: SchemaError) -> SchemaError {
    match err {
        SchemaError::Mismatch { field, expected } => SchemaError::Mismatch {
            field: format!("{parent}[].{field}"),
            expected,
        },
        other => other,
    }
}
