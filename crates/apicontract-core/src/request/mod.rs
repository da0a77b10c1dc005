//! Request synthesis — parameter values, path substitution, body construction
//!
//! Example values declared on the operation seed every parameter; values in
//! the test spec override them. The result is an immutable [`Request`] that
//! an HTTP client can send as-is.

mod body;

use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SpecError;
use crate::testspec::{ParamLocation, ParameterSpec, TestSpec};

pub use body::{BodyEncoding, BodyPayload, MultipartField, RequestBody, UploadedFile, sniff_mime_type};

/// Methods that never carry a body.
const BODYLESS_METHODS: &[&str] = &["get", "head", "options"];

/// Name → value for one parameter location, in insertion order.
pub type ParameterValues = IndexMap<String, Value>;

/// A parameter declared on an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub name: String,
    pub location: ParamLocation,
    /// Documented example; `None` or `null` seeds nothing
    pub example: Option<Value>,
}

impl ParameterDef {
    #[must_use]
    pub fn new(name: impl Into<String>, location: ParamLocation, example: Option<Value>) -> Self {
        Self {
            name: name.into(),
            location,
            example,
        }
    }
}

/// Resolved parameter values, one bucket per location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    query: ParameterValues,
    header: ParameterValues,
    cookie: ParameterValues,
    path: ParameterValues,
}

impl ParameterTable {
    /// Seed from examples, then apply overrides. Order matters: overrides win.
    #[must_use]
    pub fn resolve(definitions: &[ParameterDef], overrides: &[ParameterSpec]) -> Self {
        let mut table = Self::default();
        for def in definitions {
            if let Some(example) = def.example.as_ref().filter(|v| !v.is_null()) {
                table.set(def.location, &def.name, example.clone());
            }
        }
        for spec in overrides {
            table.set(spec.location, &spec.name, spec.value.clone());
        }
        table
    }

    fn set(&mut self, location: ParamLocation, name: &str, value: Value) {
        self.bucket_mut(location).insert(name.to_string(), value);
    }

    fn bucket_mut(&mut self, location: ParamLocation) -> &mut ParameterValues {
        match location {
            ParamLocation::Query => &mut self.query,
            ParamLocation::Header => &mut self.header,
            ParamLocation::Cookie => &mut self.cookie,
            ParamLocation::Path => &mut self.path,
        }
    }

    #[must_use]
    pub fn get(&self, location: ParamLocation) -> &ParameterValues {
        match location {
            ParamLocation::Query => &self.query,
            ParamLocation::Header => &self.header,
            ParamLocation::Cookie => &self.cookie,
            ParamLocation::Path => &self.path,
        }
    }
}

/// A fully resolved request, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    path: String,
    parameters: ParameterTable,
    body: Option<RequestBody>,
}

impl Request {
    /// Synthesize the request for one test spec.
    ///
    /// The caller is expected to have checked that `spec.response` is a
    /// declared response of the operation.
    ///
    /// # Errors
    ///
    /// Fails if the request body cannot be built: unknown encoding, bad
    /// multipart field, or an unreadable file reference.
    pub fn build(
        method: &str,
        path_template: &str,
        spec: &TestSpec,
        definitions: &[ParameterDef],
        external_base: &Path,
    ) -> Result<Self, SpecError> {
        let method = method.to_lowercase();
        let parameters = ParameterTable::resolve(definitions, &spec.parameters);
        let path = substitute_path(path_template, parameters.get(ParamLocation::Path));

        let body = match &spec.request_body {
            _ if BODYLESS_METHODS.contains(&method.as_str()) => None,
            None => None,
            Some(body_spec) => Some(RequestBody::from_spec(
                &body_spec.kind,
                &body_spec.data,
                external_base,
            )?),
        };

        tracing::debug!(%method, %path, has_body = body.is_some(), "synthesized request");

        Ok(Self {
            method,
            path,
            parameters,
            body,
        })
    }

    /// Lowercase HTTP method
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path with placeholders substituted
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &ParameterValues {
        self.parameters.get(ParamLocation::Query)
    }

    #[must_use]
    pub fn header(&self) -> &ParameterValues {
        self.parameters.get(ParamLocation::Header)
    }

    #[must_use]
    pub fn cookie(&self) -> &ParameterValues {
        self.parameters.get(ParamLocation::Cookie)
    }

    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

/// Replace every `{name}` with its value. No URL encoding; unknown
/// placeholders are left as they are.
#[must_use]
pub fn substitute_path(template: &str, values: &ParameterValues) -> String {
    values.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{name}}}"), &param_string(value))
    })
}

/// Render a parameter value for the wire: strings as-is, everything else as JSON.
#[must_use]
pub fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testspec::RequestBodySpec;
    use serde_json::json;

    fn user_params() -> Vec<ParameterDef> {
        vec![
            ParameterDef::new("userId", ParamLocation::Path, Some(json!(123456))),
            ParameterDef::new("some_query", ParamLocation::Query, Some(json!(123))),
            ParameterDef::new("x-some-header", ParamLocation::Header, Some(json!(123))),
            ParameterDef::new("no_example", ParamLocation::Query, None),
        ]
    }

    fn override_param(name: &str, location: ParamLocation, value: Value) -> ParameterSpec {
        ParameterSpec {
            name: name.into(),
            location,
            value,
        }
    }

    fn build(method: &str, spec: &TestSpec) -> Result<Request, SpecError> {
        Request::build(method, "/v1/users/{userId}", spec, &user_params(), Path::new("."))
    }

    fn with_body(kind: &str, data: Value) -> TestSpec {
        let mut spec = TestSpec::new(201);
        spec.request_body = Some(RequestBodySpec {
            kind: kind.into(),
            data,
        });
        spec
    }

    // ── parameters ──

    #[test]
    fn examples_seed_query_and_header() {
        let req = build("get", &TestSpec::new(200)).unwrap();
        assert_eq!(req.query(), &ParameterValues::from([("some_query".into(), json!(123))]));
        assert_eq!(req.header(), &ParameterValues::from([("x-some-header".into(), json!(123))]));
        assert!(req.cookie().is_empty());
    }

    #[test]
    fn missing_example_produces_no_entry() {
        let req = build("get", &TestSpec::new(200)).unwrap();
        assert!(!req.query().contains_key("no_example"));
    }

    #[test]
    fn null_example_is_unset() {
        let defs = vec![
            ParameterDef::new("userId", ParamLocation::Path, Some(Value::Null)),
            ParameterDef::new("page", ParamLocation::Query, Some(Value::Null)),
            ParameterDef::new("x-trace", ParamLocation::Header, Some(Value::Null)),
        ];
        let req = Request::build("get", "/v1/users/{userId}", &TestSpec::new(200), &defs, Path::new("."))
            .unwrap();
        assert_eq!(req.path(), "/v1/users/{userId}");
        assert!(req.query().is_empty());
        assert!(req.header().is_empty());

        // an explicit null override still counts
        let mut spec = TestSpec::new(200);
        spec.parameters = vec![override_param("page", ParamLocation::Query, Value::Null)];
        let req = Request::build("get", "/v1/users/{userId}", &spec, &defs, Path::new(".")).unwrap();
        assert_eq!(req.query()["page"], Value::Null);
    }

    #[test]
    fn overrides_win_and_add() {
        let mut spec = TestSpec::new(200);
        spec.parameters = vec![
            override_param("some_query", ParamLocation::Query, json!(456)),
            override_param("other_query", ParamLocation::Query, json!(999)),
            override_param("session", ParamLocation::Cookie, json!("abc")),
        ];
        let req = build("get", &spec).unwrap();

        let keys: Vec<_> = req.query().keys().map(String::as_str).collect();
        assert_eq!(keys, ["some_query", "other_query"]);
        assert_eq!(req.query()["some_query"], json!(456));
        assert_eq!(req.query()["other_query"], json!(999));
        assert_eq!(req.cookie()["session"], json!("abc"));
        assert_eq!(req.header()["x-some-header"], json!(123));
    }

    #[test]
    fn override_without_example_uses_spec_value() {
        let mut spec = TestSpec::new(200);
        spec.parameters = vec![override_param("no_example", ParamLocation::Query, json!("x"))];
        let req = build("get", &spec).unwrap();
        assert_eq!(req.query()["no_example"], json!("x"));
    }

    #[test]
    fn same_name_in_different_locations_kept_apart() {
        let mut spec = TestSpec::new(200);
        spec.parameters = vec![override_param("some_query", ParamLocation::Header, json!(1))];
        let req = build("get", &spec).unwrap();
        assert_eq!(req.query()["some_query"], json!(123));
        assert_eq!(req.header()["some_query"], json!(1));
    }

    // ── path ──

    #[test]
    fn path_substituted_from_example() {
        let req = build("get", &TestSpec::new(200)).unwrap();
        assert_eq!(req.path(), "/v1/users/123456");
    }

    #[test]
    fn path_substituted_from_override_without_encoding() {
        let mut spec = TestSpec::new(200);
        spec.parameters = vec![override_param("userId", ParamLocation::Path, json!("a b/c"))];
        let req = build("get", &spec).unwrap();
        assert_eq!(req.path(), "/v1/users/a b/c");
    }

    #[test]
    fn unresolved_placeholder_untouched() {
        let req = Request::build(
            "get",
            "/v1/{org}/users/{userId}",
            &TestSpec::new(200),
            &user_params(),
            Path::new("."),
        )
        .unwrap();
        assert_eq!(req.path(), "/v1/{org}/users/123456");
    }

    #[test]
    fn repeated_placeholder_replaced_everywhere() {
        let values = ParameterValues::from([("id".into(), json!(7))]);
        assert_eq!(substitute_path("/a/{id}/b/{id}", &values), "/a/7/b/7");
    }

    // ── method and body ──

    #[test]
    fn method_lowercased() {
        let req = build("GET", &TestSpec::new(200)).unwrap();
        assert_eq!(req.method(), "get");
    }

    #[test]
    fn no_body_for_bodyless_methods() {
        let spec = with_body("application/json", json!({"title": "Hello"}));
        for method in ["get", "head", "options", "HEAD"] {
            assert!(build(method, &spec).unwrap().body().is_none(), "{method}");
        }
    }

    #[test]
    fn bodyless_method_ignores_unknown_encoding() {
        let spec = with_body("application/x-what-is-this", json!({}));
        assert!(build("get", &spec).unwrap().body().is_none());
    }

    #[test]
    fn no_body_when_spec_has_none() {
        assert!(build("post", &TestSpec::new(201)).unwrap().body().is_none());
    }

    #[test]
    fn json_and_urlencoded_bodies_verbatim() {
        let data = json!({"title": "Hello World", "content": "My first blog"});
        for kind in ["application/json", "application/x-www-form-urlencoded"] {
            let req = build("post", &with_body(kind, data.clone())).unwrap();
            let body = req.body().unwrap();
            assert_eq!(body.kind(), kind);
            assert_eq!(body.payload(), &BodyPayload::Structured(data.clone()));
        }
    }

    #[test]
    fn unknown_encoding_rejected() {
        let err = build("post", &with_body("application/x-what-is-this", json!({}))).unwrap_err();
        assert!(matches!(err, SpecError::UnsupportedRequestBodyType(_)));
    }

    #[test]
    fn param_string_rendering() {
        assert_eq!(param_string(&json!("abc")), "abc");
        assert_eq!(param_string(&json!(42)), "42");
        assert_eq!(param_string(&json!(true)), "true");
        assert_eq!(param_string(&json!([1, 2])), "[1,2]");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn override_always_wins(example in any::<i64>(), value in any::<i64>()) {
                let defs = vec![ParameterDef::new("q", ParamLocation::Query, Some(json!(example)))];
                let overrides = vec![override_param("q", ParamLocation::Query, json!(value))];
                let table = ParameterTable::resolve(&defs, &overrides);
                prop_assert_eq!(&table.get(ParamLocation::Query)["q"], &json!(value));
            }

            #[test]
            fn path_substitution_is_total(id in "[a-zA-Z0-9_-]{1,12}", name in "[a-z]{1,8}") {
                let template = format!("/items/{{{name}}}/sub/{{{name}}}");
                let values = ParameterValues::from([(name.clone(), json!(id.clone()))]);
                let path = substitute_path(&template, &values);
                prop_assert_eq!(path, format!("/items/{id}/sub/{id}"));
            }
        }
    }
}
