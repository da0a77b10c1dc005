//! Validation outcome — verdict, typed errors and report projections

mod report;

use serde::{Deserialize, Serialize};

pub use report::{Report, ReportError};

/// Category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Response body does not match the schema
    Schema,
    /// Status code differs from the expected one
    Code,
    /// Response body is not valid JSON
    Parse,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Code => "code",
            Self::Parse => "parse",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schema violation reported by the schema engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// JSON pointer into the response; empty for the document root
    pub pointer: String,
    /// Violated keyword, e.g. `type`, `required`
    pub constraint: String,
    pub message: String,
}

impl SchemaViolation {
    #[must_use]
    pub fn new(
        pointer: impl Into<String>,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            pointer: pointer.into(),
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

/// A problem found while adjudicating a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValidationError {
    Schema { data: SchemaViolation },
    Code { message: String },
    Parse { message: String },
}

impl ValidationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Code { .. } => ErrorKind::Code,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// Human readable problem line.
    ///
    /// Schema violations render as `[Schema] <pointer> (<constraint>): <message>`,
    /// with `.` standing in for the root pointer.
    #[must_use]
    pub fn problem(&self) -> String {
        match self {
            Self::Schema { data } => {
                let pointer = if data.pointer.is_empty() {
                    "."
                } else {
                    data.pointer.as_str()
                };
                format!("[Schema] {pointer} ({}): {}", data.constraint, data.message)
            }
            Self::Code { message } | Self::Parse { message } => message.clone(),
        }
    }
}

/// Immutable verdict of one `validate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    schema: serde_json::Value,
    response: String,
    is_valid: bool,
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    #[must_use]
    pub fn new(
        schema: serde_json::Value,
        response: impl Into<String>,
        is_valid: bool,
        errors: Vec<ValidationError>,
    ) -> Self {
        Self {
            schema,
            response: response.into(),
            is_valid,
            errors,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Errors in encounter order: parse, code, then schema violations.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[must_use]
    pub fn schema(&self) -> &serde_json::Value {
        &self.schema
    }

    /// Response text as received, or pretty-printed for structured responses
    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    #[must_use]
    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind() == kind)
    }
}
