//! HTTP execution — send a test case's request and adjudicate the response

use std::collections::HashMap;
use std::process::Command;
use std::time::{Duration, Instant};

use apicontract_core::request::param_string;
use apicontract_core::{BodyEncoding, BodyPayload, MultipartField, Request, ValidationResult};
use indexmap::IndexMap;
use reqwest::blocking::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::case::TestCase;
use crate::validator::ResponseContent;

/// Response as captured from the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
    /// Seconds
    pub elapsed: f64,
}

/// Result of running one case end to end.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    pub status: u16,
    pub elapsed: f64,
    pub result: ValidationResult,
}

/// Invoked with a case's opaque `setUp`/`tearDown` descriptor.
pub trait HookHandler {
    /// # Errors
    ///
    /// Returns a message when the hook fails; the case is then aborted.
    fn call(&mut self, hook: &Value) -> Result<(), String>;
}

/// Ignores every hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl HookHandler for NoopHooks {
    fn call(&mut self, _hook: &Value) -> Result<(), String> {
        Ok(())
    }
}

/// Runs string hooks with `sh -c`. Other descriptors are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellHooks;

impl HookHandler for ShellHooks {
    fn call(&mut self, hook: &Value) -> Result<(), String> {
        let Some(command) = hook.as_str() else {
            tracing::debug!(%hook, "skipping non-command hook");
            return Ok(());
        };
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|e| format!("{command}: {e}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{command}: exited with {status}"))
        }
    }
}

/// Blocking HTTP client bound to one server.
#[derive(Debug, Clone)]
pub struct HttpRunner {
    client: reqwest::blocking::Client,
    base_url: String,
    headers: HashMap<String, String>,
}

impl HttpRunner {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RunnerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunnerError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: HashMap::new(),
        })
    }

    /// Headers sent with every request. Request headers win on conflict.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request as-is.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or when a multipart file cannot be attached.
    pub fn send(&self, request: &Request) -> Result<HttpResponse, RunnerError> {
        let url = format!("{}{}", self.base_url, request.path());
        let method = reqwest::Method::from_bytes(request.method().to_uppercase().as_bytes())
            .map_err(|_| RunnerError::Http(format!("invalid HTTP method '{}'", request.method())))?;

        let mut req = self.client.request(method, &url);

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(k, _)| {
                !request
                    .header()
                    .keys()
                    .any(|h| h.eq_ignore_ascii_case(k))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.extend(
            request
                .header()
                .iter()
                .map(|(k, v)| (k.clone(), param_string(v))),
        );
        for (k, v) in &headers {
            // Invalid header values never reach the server; skip them
            if reqwest::header::HeaderValue::from_str(v).is_ok() {
                req = req.header(k, v);
            }
        }

        if !request.cookie().is_empty() {
            let cookie = request
                .cookie()
                .iter()
                .map(|(k, v)| format!("{k}={}", param_string(v)))
                .collect::<Vec<_>>()
                .join("; ");
            req = req.header(reqwest::header::COOKIE, cookie);
        }

        let mut query = Vec::new();
        for (k, v) in request.query() {
            flatten_pairs(k, v, &mut query);
        }
        if !query.is_empty() {
            req = req.query(&query);
        }

        if let Some(body) = request.body() {
            req = match body.payload() {
                BodyPayload::Structured(data) if body.encoding() == BodyEncoding::UrlEncoded => {
                    req.form(&form_pairs(data))
                }
                BodyPayload::Structured(data) => req.json(data),
                BodyPayload::Multipart(fields) => req.multipart(multipart_form(fields)?),
            };
        }

        let start = Instant::now();
        let resp = req.send().map_err(|e| RunnerError::Http(e.to_string()))?;
        let elapsed = start.elapsed().as_secs_f64();

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().map_err(|e| RunnerError::Http(e.to_string()))?;

        tracing::debug!(%url, status, elapsed, "response received");

        Ok(HttpResponse {
            status,
            body,
            content_type,
            elapsed,
        })
    }

    /// Run hooks, send the case's request and validate the response.
    ///
    /// An empty body is validated as `null`. Once `setUp` has succeeded,
    /// `tearDown` runs whether or not the request could be sent.
    ///
    /// # Errors
    ///
    /// Fails if a hook fails or the request cannot be sent. Validation
    /// failures are reported in the outcome, not as errors. A failing
    /// `tearDown` after a completed exchange keeps its outcome in
    /// [`RunnerError::TearDown`].
    pub fn run_case(
        &self,
        name: &str,
        case: &TestCase,
        hooks: &mut dyn HookHandler,
    ) -> Result<CaseOutcome, RunnerError> {
        if let Some(hook) = case.set_up_hook() {
            hooks.call(hook).map_err(RunnerError::Hook)?;
        }

        let outcome = self.send(case.request()).map(|response| {
            let body = if response.body.is_empty() {
                "null"
            } else {
                response.body.as_str()
            };
            CaseOutcome {
                name: name.to_string(),
                status: response.status,
                elapsed: response.elapsed,
                result: case.validate(response.status, ResponseContent::Raw(body)),
            }
        });

        let torn_down = case.tear_down_hook().map_or(Ok(()), |hook| hooks.call(hook));

        match (outcome, torn_down) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(outcome), Err(message)) => Err(RunnerError::TearDown {
                message,
                outcome: Box::new(outcome),
            }),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(message)) => Err(RunnerError::Hook(format!("{message} (after {e})"))),
        }
    }
}

/// Flatten a value into `name=value` pairs, nesting as `name[key]`.
/// Nulls are dropped.
fn flatten_pairs(name: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(obj) => {
            for (k, v) in obj {
                flatten_pairs(&format!("{name}[{k}]"), v, out);
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                flatten_pairs(&format!("{name}[{i}]"), v, out);
            }
        }
        other => out.push((name.to_string(), param_string(other))),
    }
}

fn form_pairs(data: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match data {
        Value::Object(obj) => {
            for (k, v) in obj {
                flatten_pairs(k, v, &mut pairs);
            }
        }
        Value::Null => {}
        other => pairs.push((String::new(), param_string(other))),
    }
    pairs
}

fn multipart_form(fields: &IndexMap<String, MultipartField>) -> Result<Form, RunnerError> {
    let mut form = Form::new();
    for (name, field) in fields {
        form = match field {
            MultipartField::Text(text) => form.text(name.clone(), text.clone()),
            MultipartField::Nested(value) => {
                let mut pairs = Vec::new();
                flatten_pairs(name, value, &mut pairs);
                pairs
                    .into_iter()
                    .fold(form, |form, (k, v)| form.text(k, v))
            }
            MultipartField::File(file) => {
                let part = Part::file(file.path())
                    .map_err(|e| RunnerError::Attach(format!("{}: {e}", file.path().display())))?
                    .file_name(file.client_original_name().to_string())
                    .mime_str(file.client_mime_type())
                    .map_err(|e| RunnerError::Attach(e.to_string()))?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Cannot attach file: {0}")]
    Attach(String),
    #[error("Hook failed: {0}")]
    Hook(String),
    /// The exchange completed but `tearDown` failed
    #[error("tearDown hook failed: {message}")]
    TearDown {
        message: String,
        outcome: Box<CaseOutcome>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_nested_values() {
        let mut pairs = Vec::new();
        flatten_pairs(
            "filter",
            &json!({"tags": ["a", "b"], "owner": {"id": 7}, "draft": false, "skip": null}),
            &mut pairs,
        );
        assert_eq!(
            pairs,
            [
                ("filter[tags][0]".to_string(), "a".to_string()),
                ("filter[tags][1]".to_string(), "b".to_string()),
                ("filter[owner][id]".to_string(), "7".to_string()),
                ("filter[draft]".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn form_pairs_from_object() {
        let pairs = form_pairs(&json!({"name": "john", "age": 30}));
        assert_eq!(
            pairs,
            [
                ("name".to_string(), "john".to_string()),
                ("age".to_string(), "30".to_string()),
            ]
        );
        assert!(form_pairs(&Value::Null).is_empty());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let runner = HttpRunner::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(runner.base_url(), "http://localhost:8080");
    }

    #[test]
    fn noop_hooks_accept_anything() {
        let mut hooks = NoopHooks;
        assert!(hooks.call(&json!({"fixture": "users"})).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn shell_hooks_report_failure() {
        let mut hooks = ShellHooks;
        assert!(hooks.call(&json!("true")).is_ok());
        assert!(hooks.call(&json!({"not": "a command"})).is_ok());
        let err = hooks.call(&json!("exit 3")).unwrap_err();
        assert!(err.starts_with("exit 3: exited with"));
    }
}
