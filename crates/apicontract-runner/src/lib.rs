//! apicontract-runner: Load contract tests from OpenAPI documents and run them
//!
//! - [`document`]: parse YAML/JSON, resolve `$ref`s, extract operations
//! - [`suite`] / [`case`]: build test cases from `x-api-tests` extensions
//! - [`validator`]: adjudicate a response (parse, status code, JSON Schema)
//! - [`http`]: send requests with a blocking `reqwest` client

pub mod case;
pub mod document;
pub mod http;
pub mod suite;
pub mod validator;

pub use case::TestCase;
pub use document::{DocumentError, Operation, extract_operations, load_document, parse_document};
pub use http::{CaseOutcome, HookHandler, HttpResponse, HttpRunner, NoopHooks, RunnerError, ShellHooks};
pub use suite::{SuiteError, TestSuite};
pub use validator::{JsonSchemaChecker, ResponseContent, SchemaChecker, validate};
