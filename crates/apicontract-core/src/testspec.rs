//! Test spec payloads carried by the `x-api-tests` vendor extension
//!
//! ```yaml
//! x-api-tests:
//!   - type: request_test_case
//!     value:
//!       response: 200
//!       description: Get user info
//!       parameters:
//!         - { name: userId, in: path, value: 42 }
//!       requestBody:
//!         type: application/json
//!         data: { title: Hello }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Vendor extension listing the test specs of an operation.
pub const EXTENSION_NAME: &str = "x-api-tests";

/// Discriminator of extension entries that describe a request test case.
pub const REQUEST_TEST_CASE: &str = "request_test_case";

/// Media type used to pick the response schema when a spec names none.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Where a named parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Header,
    Cookie,
    Path,
}

impl ParamLocation {
    /// Parse an OpenAPI `in` value. Unknown locations yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Path => "path",
        }
    }
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `x-api-tests` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtensionEntry {
    /// Entry discriminator, e.g. `request_test_case`
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload; a [`TestSpec`] for `request_test_case` entries
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ExtensionEntry {
    #[must_use]
    pub fn is_request_test_case(&self) -> bool {
        self.kind == REQUEST_TEST_CASE
    }
}

/// Declarative description of one test scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestSpec {
    /// Expected response status code; must be declared on the operation
    #[serde(deserialize_with = "deserialize_status_code")]
    #[schemars(with = "u16")]
    pub response: u16,

    /// Media type of the expected response (default `application/json`)
    #[serde(default, rename = "media-type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Free text appended to the readable test name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parameter values overriding the documented examples
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,

    /// Request payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodySpec>,

    /// Mock definitions, passed through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mocks: Vec<serde_json::Value>,

    /// Hook to run before the request, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_up: Option<serde_json::Value>,

    /// Hook to run after validation, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tear_down: Option<serde_json::Value>,
}

impl TestSpec {
    /// A spec expecting `response` with every optional field unset.
    #[must_use]
    pub fn new(response: u16) -> Self {
        Self {
            response,
            media_type: None,
            description: None,
            parameters: Vec::new(),
            request_body: None,
            mocks: Vec::new(),
            set_up: None,
            tear_down: None,
        }
    }

    /// Parse a spec from an extension entry payload.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the payload is not a valid test spec.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        self.media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE)
    }

    /// Description, empty when unset.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// An explicit parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Request payload and its encoding.
///
/// `kind` is kept as written; it is checked when the request is built so
/// that an unknown encoding is reported against the test case it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequestBodySpec {
    /// `application/json`, `application/x-www-form-urlencoded` or `multipart/form-data`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Accept `200` as well as `"200"`: YAML authors write both.
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u16),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Int(code) => Ok(code),
        Repr::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid status code \"{s}\""))),
    }
}

/// Generate JSON Schema for the test spec payload.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(TestSpec);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
