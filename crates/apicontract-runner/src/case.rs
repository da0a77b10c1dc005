//! Test case — one test spec bound to one operation response

use std::path::{Path, PathBuf};

use apicontract_core::{Request, SpecError, TestSpec, ValidationResult};
use serde_json::Value;

use crate::document::Operation;
use crate::validator::{self, JsonSchemaChecker, ResponseContent, SchemaChecker};

/// A runnable contract test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    spec: TestSpec,
    method: String,
    path: String,
    summary: String,
    request: Request,
    schema: Value,
    external_base_path: PathBuf,
}

impl TestCase {
    /// Bind `spec` to an operation.
    ///
    /// # Errors
    ///
    /// Returns `ResponseNotDefined` if the expected code is not declared on
    /// the operation, or any error raised while building the request.
    pub fn new(
        spec: TestSpec,
        method: &str,
        path: &str,
        operation: &Operation,
        external_base_path: impl Into<PathBuf>,
    ) -> Result<Self, SpecError> {
        let method = method.to_lowercase();
        if !operation.has_response(spec.response) {
            return Err(SpecError::ResponseNotDefined {
                code: spec.response,
                method,
                path: path.to_string(),
            });
        }

        let external_base_path = external_base_path.into();
        let request = Request::build(
            &method,
            path,
            &spec,
            &operation.parameters,
            &external_base_path,
        )?;
        let schema = operation.response_schema(spec.response, spec.media_type());

        Ok(Self {
            spec,
            method,
            path: path.to_string(),
            summary: operation.summary.clone(),
            request,
            schema,
            external_base_path,
        })
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Expected status code
    #[must_use]
    pub fn code(&self) -> u16 {
        self.spec.response
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.spec.description()
    }

    /// Path template, placeholders intact
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        self.spec.media_type()
    }

    /// Schema of the expected response, `{}` when the document has none
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    #[must_use]
    pub fn mocks(&self) -> &[Value] {
        &self.spec.mocks
    }

    #[must_use]
    pub fn set_up_hook(&self) -> Option<&Value> {
        self.spec.set_up.as_ref()
    }

    #[must_use]
    pub fn tear_down_hook(&self) -> Option<&Value> {
        self.spec.tear_down.as_ref()
    }

    #[must_use]
    pub fn external_base_path(&self) -> &Path {
        &self.external_base_path
    }

    /// `[<method>] <path> <summary>: <code>`, plus ` - <description>` when set.
    #[must_use]
    pub fn readable_name(&self) -> String {
        let name = format!(
            "[{}] {} {}: {}",
            self.method,
            self.path,
            self.summary,
            self.code()
        );
        match self.description() {
            "" => name,
            description => format!("{name} - {description}"),
        }
    }

    /// Adjudicate a response with the default schema engine.
    #[must_use]
    pub fn validate(&self, code: u16, response: ResponseContent<'_>) -> ValidationResult {
        self.validate_with(&JsonSchemaChecker, code, response)
    }

    #[must_use]
    pub fn validate_with(
        &self,
        checker: &dyn SchemaChecker,
        code: u16,
        response: ResponseContent<'_>,
    ) -> ValidationResult {
        validator::validate(checker, self.code(), &self.schema, code, response)
    }
}
