//! Test suite — every test case declared in one OpenAPI document
//!
//! Built once by walking the document's operations; read-only afterwards.

use std::path::{Path, PathBuf};

use apicontract_core::{EXTENSION_NAME, ExtensionEntry, SpecError, TestSpec};
use indexmap::IndexMap;
use serde_json::Value;

use crate::case::TestCase;
use crate::document::{self, DocumentError, Operation};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSuite {
    name: String,
    test_cases: IndexMap<String, TestCase>,
    warnings: Vec<String>,
}

impl TestSuite {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register a case under its readable name, suffixing ` - 2`, ` - 3`, …
    /// until the name is free. Returns the name used.
    pub fn add_test_case(&mut self, case: TestCase) -> String {
        let base = case.readable_name();
        let mut name = base.clone();
        let mut n = 2;
        while self.test_cases.contains_key(&name) {
            name = format!("{base} - {n}");
            n += 1;
        }
        self.test_cases.insert(name.clone(), case);
        name
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cases in declaration order, keyed by display name
    #[must_use]
    pub fn test_cases(&self) -> &IndexMap<String, TestCase> {
        &self.test_cases
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    /// Build a suite from a parsed OpenAPI document.
    ///
    /// Operations without `x-api-tests` entries produce a warning and no cases.
    /// Entries whose `type` is not `request_test_case` are skipped.
    ///
    /// # Errors
    ///
    /// Fails on a malformed extension entry or test spec payload, or when a
    /// test case cannot be constructed.
    pub fn load_from_document(
        document: &Value,
        name: &str,
        external_base_path: &Path,
    ) -> Result<Self, SuiteError> {
        let mut suite = Self::new(name);

        for operation in document::extract_operations(document) {
            let entries = parse_entries(&operation)?;
            if entries.is_empty() {
                let warning = format!("{} has no tests.", operation.label());
                tracing::warn!("{warning}");
                suite.add_warning(warning);
                continue;
            }

            for entry in entries.iter().filter(|e| e.is_request_test_case()) {
                let spec = TestSpec::from_value(&entry.value).map_err(|e| {
                    SuiteError::InvalidTestSpec {
                        operation: operation.label(),
                        message: e.to_string(),
                    }
                })?;
                let case = TestCase::new(
                    spec,
                    &operation.method,
                    &operation.path,
                    &operation,
                    external_base_path,
                )
                .map_err(|source| SuiteError::TestCase {
                    operation: operation.label(),
                    source,
                })?;
                let registered = suite.add_test_case(case);
                tracing::debug!(name = %registered, "registered test case");
            }
        }

        Ok(suite)
    }

    /// Read a YAML or JSON document and build a suite from it.
    ///
    /// `external_base_path` defaults to the directory containing the document.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or as [`Self::load_from_document`].
    pub fn load_from_file(
        path: &Path,
        name: &str,
        external_base_path: Option<&Path>,
    ) -> Result<Self, SuiteError> {
        let document = document::load_document(path)?;
        let base = match external_base_path {
            Some(base) => base.to_path_buf(),
            None => document_dir(path)?,
        };
        Self::load_from_document(&document, name, &base)
    }
}

fn document_dir(path: &Path) -> Result<PathBuf, SuiteError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| SuiteError::Document(DocumentError::Io(format!("{}: {e}", path.display()))))?;
    Ok(canonical
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf))
}

fn parse_entries(operation: &Operation) -> Result<Vec<ExtensionEntry>, SuiteError> {
    match operation.extension(EXTENSION_NAME) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| SuiteError::InvalidTestSpec {
                operation: operation.label(),
                message: format!("{EXTENSION_NAME}: {e}"),
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Invalid test spec in {operation}: {message}")]
    InvalidTestSpec { operation: String, message: String },
    #[error("{operation}: {source}")]
    TestCase {
        operation: String,
        #[source]
        source: SpecError,
    },
}
