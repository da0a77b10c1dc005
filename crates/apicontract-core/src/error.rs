//! Construction-time errors
//!
//! These indicate a malformed test definition and are raised immediately.
//! Response adjudication problems never surface here; they are collected
//! into a [`ValidationResult`](crate::ValidationResult) instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Cannot find response \"{code}\" in [{method}] {path}.")]
    ResponseNotDefined {
        code: u16,
        method: String,
        path: String,
    },
    #[error("Unsupported request body type \"{0}\".")]
    UnsupportedRequestBodyType(String),
    #[error("Invalid multipart field \"{name}\": {reason}")]
    InvalidMultipartField { name: String, reason: String },
    #[error("Cannot probe file {0}: {1}")]
    FileProbe(PathBuf, String),
}
