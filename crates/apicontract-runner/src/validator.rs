//! Response adjudication — parse, status code and schema checks
//!
//! No I/O. The schema engine sits behind [`SchemaChecker`] so callers can
//! swap it; [`JsonSchemaChecker`] is the default.

use apicontract_core::{SchemaViolation, ValidationError, ValidationResult};
use serde_json::Value;

/// A response as handed to `validate`.
#[derive(Debug, Clone, Copy)]
pub enum ResponseContent<'a> {
    /// Body text exactly as received
    Raw(&'a str),
    /// Already-decoded body
    Structured(&'a Value),
}

/// Checks a decoded response against a JSON schema.
pub trait SchemaChecker {
    /// Violations in engine order; empty means the instance conforms.
    fn check(&self, schema: &Value, instance: &Value) -> Vec<SchemaViolation>;
}

/// [`SchemaChecker`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaChecker;

impl SchemaChecker for JsonSchemaChecker {
    fn check(&self, schema: &Value, instance: &Value) -> Vec<SchemaViolation> {
        if schema.as_object().is_some_and(serde_json::Map::is_empty) {
            return Vec::new();
        }

        let validator = match jsonschema::validator_for(schema) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "schema does not compile");
                return vec![SchemaViolation::new("", "schema", e.to_string())];
            }
        };

        validator
            .iter_errors(instance)
            .map(|e| {
                let schema_path = e.schema_path().to_string();
                let constraint = schema_path.rsplit('/').next().unwrap_or_default().to_string();
                SchemaViolation::new(e.instance_path().to_string(), constraint, e.to_string())
            })
            .collect()
    }
}

/// Adjudicate a response against an expected code and schema.
///
/// Errors are collected in a fixed order: parse, code, schema. The schema is
/// checked even when parsing failed (against `null`) or the code differs.
#[must_use]
pub fn validate(
    checker: &dyn SchemaChecker,
    expected_code: u16,
    schema: &Value,
    actual_code: u16,
    response: ResponseContent<'_>,
) -> ValidationResult {
    let mut errors = Vec::new();

    let (parsed, text) = match response {
        ResponseContent::Raw(text) => match serde_json::from_str::<Value>(text) {
            Ok(v) => (v, text.to_string()),
            Err(e) => {
                errors.push(ValidationError::Parse {
                    message: format!("Unable to parse response as JSON. {e}"),
                });
                (Value::Null, text.to_string())
            }
        },
        ResponseContent::Structured(value) => (
            value.clone(),
            serde_json::to_string_pretty(value).unwrap_or_default(),
        ),
    };

    if actual_code != expected_code {
        errors.push(ValidationError::Code {
            message: format!("{actual_code} does not match expected status code {expected_code}."),
        });
    }

    errors.extend(
        checker
            .check(schema, &parsed)
            .into_iter()
            .map(|data| ValidationError::Schema { data }),
    );

    ValidationResult::new(schema.clone(), text, errors.is_empty(), errors)
}
