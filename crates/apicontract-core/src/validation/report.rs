//! Report projections of a [`ValidationResult`]
//!
//! `create_report` is pure. `render_report` additionally dumps the response
//! and the schema to temp files so they can be inspected after a failed run;
//! those files are left in place.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use console::Style;
use serde::{Deserialize, Serialize};

use super::ValidationResult;

/// Machine readable summary of a validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub is_valid: bool,
    /// Canonical response text
    pub response: String,
    /// Pretty-printed schema
    pub schema: String,
    /// One human readable line per error, in order
    pub problems: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub fn create_report(&self) -> Report {
        Report {
            is_valid: self.is_valid,
            response: self.response.clone(),
            schema: serde_json::to_string_pretty(&self.schema).unwrap_or_default(),
            problems: self.errors.iter().map(super::ValidationError::problem).collect(),
        }
    }

    /// Render a text report and dump the response and schema to temp files.
    ///
    /// ANSI styling is emitted only when `color` is true.
    ///
    /// # Errors
    ///
    /// Returns error if a dump file cannot be created or written.
    pub fn render_report(&self, color: bool) -> Result<String, ReportError> {
        let report = self.create_report();
        let response_dump = create_dump_file("response", &report.response)?;
        let schema_dump = create_dump_file("schema", &report.schema)?;

        let mut text = String::from("\n");
        write_report(&mut text, &report, &response_dump, &schema_dump, color)
            .map_err(|e| ReportError::Format(e.to_string()))?;
        Ok(text)
    }
}

fn write_report(
    out: &mut impl std::fmt::Write,
    report: &Report,
    response_dump: &Path,
    schema_dump: &Path,
    color: bool,
) -> std::fmt::Result {
    let bold = Style::new().bold().force_styling(color);
    let passed = Style::new().bold().green().force_styling(color);
    let failed = Style::new().bold().red().force_styling(color);

    if report.is_valid {
        writeln!(out, "{}\n", passed.apply_to("Validation Passed"))?;
    } else {
        writeln!(out, "{}\n", failed.apply_to("Validation Failed"))?;
        writeln!(out, "{}", bold.apply_to("Problems:"))?;
        for problem in &report.problems {
            writeln!(out, "    - {problem}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "{}", bold.apply_to("Response:"))?;
    writeln!(out, "    {}\n", response_dump.display())?;
    writeln!(out, "{}", bold.apply_to("Schema:"))?;
    writeln!(out, "    {}", schema_dump.display())
}

/// Write `data` to a fresh, persisted temp file.
fn create_dump_file(name: &str, data: &str) -> Result<PathBuf, ReportError> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("apicontract_{name}_"))
        .suffix(".json")
        .tempfile()
        .map_err(|e| ReportError::Io(format!("create {name} dump: {e}")))?;
    file.write_all(data.as_bytes())
        .map_err(|e| ReportError::Io(format!("write {name} dump: {e}")))?;
    let (_, path) = file
        .keep()
        .map_err(|e| ReportError::Io(format!("keep {name} dump: {e}")))?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Format error: {0}")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validation::{SchemaViolation, ValidationError};

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["name", "age"],
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"}
            }
        })
    }

    fn failed_result() -> ValidationResult {
        ValidationResult::new(
            schema(),
            r#"{"name":1234}"#,
            false,
            vec![
                ValidationError::Code {
                    message: "this is an error about wrong response code".into(),
                },
                ValidationError::Parse {
                    message: "this is an error about unable to parse response".into(),
                },
                ValidationError::Schema {
                    data: SchemaViolation::new("/age", "required", "The property age is required"),
                },
                ValidationError::Schema {
                    data: SchemaViolation::new(
                        "/name",
                        "type",
                        "Integer value found, but a string is required",
                    ),
                },
            ],
        )
    }

    fn passed_result() -> ValidationResult {
        ValidationResult::new(schema(), r#"{"name":"john","age":999}"#, true, vec![])
    }

    /// Matches CSI sequences: ESC `[` or the single-byte 0x9B introducer.
    fn has_ansi(text: &str) -> bool {
        text.contains("\u{1b}[") || text.contains('\u{9b}')
    }

    fn dump_paths(render: &str) -> Vec<PathBuf> {
        render
            .lines()
            .map(str::trim)
            .filter(|l| l.contains("apicontract_"))
            .map(PathBuf::from)
            .collect()
    }

    #[test]
    fn report_for_success() {
        let report = passed_result().create_report();
        assert!(report.is_valid);
        assert_eq!(report.response, r#"{"name":"john","age":999}"#);
        let schema: serde_json::Value = serde_json::from_str(&report.schema).unwrap();
        assert_eq!(schema, self::schema());
        assert!(report.problems.is_empty());
    }

    #[test]
    fn report_for_failure_lists_problems_in_order() {
        let report = failed_result().create_report();
        assert!(!report.is_valid);
        insta::assert_snapshot!(report.problems.join("\n"), @r"
        this is an error about wrong response code
        this is an error about unable to parse response
        [Schema] /age (required): The property age is required
        [Schema] /name (type): Integer value found, but a string is required
        ");
    }

    #[test]
    fn render_success() {
        let render = passed_result().render_report(true).unwrap();
        assert!(render.contains("Validation Passed"));
        assert!(render.contains("Response:"));
        assert!(render.contains("Schema:"));
        assert!(!render.contains("Problems:"));
    }

    #[test]
    fn render_failure() {
        let render = failed_result().render_report(true).unwrap();
        assert!(render.contains("Validation Failed"));
        assert!(render.contains("Problems:"));
        assert!(render.contains("    - this is an error about wrong response code"));
        assert!(render.contains("    - this is an error about unable to parse response"));
        assert!(render.contains(
            "    - [Schema] /name (type): Integer value found, but a string is required"
        ));
        assert!(render.contains("Response:"));
        assert!(render.contains("Schema:"));
    }

    #[test]
    fn write_report_layout() {
        let report = Report {
            is_valid: false,
            response: "{}".into(),
            schema: "{}".into(),
            problems: vec!["first".into(), "second".into()],
        };
        let mut text = String::new();
        write_report(&mut text, &report, Path::new("/tmp/r.json"), Path::new("/tmp/s.json"), false)
            .unwrap();
        assert_eq!(
            text,
            "Validation Failed\n\nProblems:\n    - first\n    - second\n\n\
             Response:\n    /tmp/r.json\n\nSchema:\n    /tmp/s.json\n"
        );
    }

    #[test]
    fn write_report_propagates_writer_errors() {
        struct Closed;
        impl std::fmt::Write for Closed {
            fn write_str(&mut self, _: &str) -> std::fmt::Result {
                Err(std::fmt::Error)
            }
        }

        let report = passed_result().create_report();
        assert!(write_report(&mut Closed, &report, Path::new("r"), Path::new("s"), false).is_err());
    }

    #[test]
    fn render_with_color_has_ansi() {
        let render = failed_result().render_report(true).unwrap();
        assert!(has_ansi(&render));
    }

    #[test]
    fn render_without_color_has_no_ansi() {
        for result in [failed_result(), passed_result()] {
            let render = result.render_report(false).unwrap();
            assert!(!has_ansi(&render), "unexpected escape sequence in {render:?}");
        }
    }

    #[test]
    fn render_dumps_response_and_schema() {
        let result = failed_result();
        let render = result.render_report(false).unwrap();
        let paths = dump_paths(&render);
        assert_eq!(paths.len(), 2);

        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), result.response());
        let dumped: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths[1]).unwrap()).unwrap();
        assert_eq!(&dumped, result.schema());

        for p in paths {
            let _ = std::fs::remove_file(p);
        }
    }
}
