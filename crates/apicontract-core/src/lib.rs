//! apicontract-core: Request synthesis and validation results for OpenAPI contract tests
//!
//! This crate turns a declarative test spec plus an operation's parameter
//! definitions into a concrete [`Request`], and holds the [`ValidationResult`]
//! types and reports produced when a response is adjudicated.

pub mod config;
pub mod error;
pub mod request;
pub mod testspec;
pub mod validation;

pub use config::{Config, ConfigError};
pub use error::SpecError;
pub use request::{
    BodyEncoding, BodyPayload, MultipartField, ParameterDef, ParameterTable, ParameterValues,
    Request, RequestBody, UploadedFile,
};
pub use testspec::{
    DEFAULT_MEDIA_TYPE, EXTENSION_NAME, ExtensionEntry, ParamLocation, ParameterSpec,
    REQUEST_TEST_CASE, RequestBodySpec, TestSpec,
};
pub use validation::{
    ErrorKind, Report, ReportError, SchemaViolation, ValidationError, ValidationResult,
};
