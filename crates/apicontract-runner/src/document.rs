//! OpenAPI document parsing — resolve `$ref`s, extract operations

use std::path::Path;

use apicontract_core::{ParamLocation, ParameterDef};
use serde_json::{Map, Value};

/// Operation keys of a path item, in the order operations are visited.
pub const METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Maximum `$ref` hops followed from one node.
const MAX_REF_DEPTH: usize = 32;

/// One HTTP method on one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Lowercase method, e.g. `get`
    pub method: String,
    /// Path template, e.g. `/v1/users/{userId}`
    pub path: String,
    pub summary: String,
    /// Path-level parameters followed by operation-level ones
    pub parameters: Vec<ParameterDef>,
    /// Status code (as written) → response object
    pub responses: Map<String, Value>,
    /// `x-*` keys of the operation object
    pub extensions: Map<String, Value>,
    /// Targets of `$ref`s left in place at a cycle, keyed by the ref
    pub definitions: Map<String, Value>,
}

impl Operation {
    #[must_use]
    pub fn has_response(&self, code: u16) -> bool {
        self.responses.contains_key(&code.to_string())
    }

    /// Schema of `content[media_type]` for a response, `{}` when absent.
    ///
    /// Recursive references are rewritten to `#/$defs/...` and their targets
    /// embedded, so the fragment validates on its own.
    #[must_use]
    pub fn response_schema(&self, code: u16, media_type: &str) -> Value {
        let schema = self
            .responses
            .get(&code.to_string())
            .and_then(|r| r.get("content"))
            .and_then(|c| c.get(media_type))
            .and_then(|mt| mt.get("schema"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        embed_definitions(schema, &self.definitions)
    }

    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }

    /// Label used in warnings and logs, e.g. `[get] /v1/posts`
    #[must_use]
    pub fn label(&self) -> String {
        format!("[{}] {}", self.method, self.path)
    }
}

/// Read and parse an OpenAPI document from disk.
///
/// # Errors
///
/// Returns error if the file cannot be read or is neither valid JSON nor YAML.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DocumentError::Io(format!("{}: {e}", path.display())))?;
    parse_document(path, &content)
}

/// Parse an OpenAPI document from JSON or YAML.
///
/// Detection strategy: try extension first (`.yaml`/`.yml`), then fall back to
/// content sniffing (leading `{` → JSON, otherwise YAML).
///
/// # Errors
///
/// Returns error if the content does not parse in the detected format.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, DocumentError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => serde_yml::from_str(content)
            .map_err(|e| DocumentError::Parse(format!("Invalid YAML: {e}"))),
        "json" => serde_json::from_str(content)
            .map_err(|e| DocumentError::Parse(format!("Invalid JSON: {e}"))),
        _ => {
            if content.trim_start().starts_with('{') {
                serde_json::from_str(content)
                    .map_err(|e| DocumentError::Parse(format!("Invalid JSON: {e}")))
            } else {
                serde_yml::from_str(content)
                    .map_err(|e| DocumentError::Parse(format!("Invalid YAML: {e}")))
            }
        }
    }
}

/// Inline every local `$ref` (`#/...`) of the document.
///
/// A reference that points back into its own expansion is left as-is, as
/// are external and dangling references.
#[must_use]
pub fn resolve_refs(document: &Value) -> Value {
    resolve_with_definitions(document).0
}

/// [`resolve_refs`], plus the resolved target of every reference left in
/// place at a cycle (or at the depth limit), keyed by the reference.
fn resolve_with_definitions(document: &Value) -> (Value, Map<String, Value>) {
    let mut cut = Vec::new();
    let resolved = resolve_node(document, document, &mut Vec::new(), &mut cut);

    let mut definitions = Map::new();
    let mut i = 0;
    while i < cut.len() {
        let reference = cut[i].clone();
        i += 1;
        if let Some(target) = local_target(document, &reference) {
            let mut stack = vec![reference.clone()];
            let definition = resolve_node(target, document, &mut stack, &mut cut);
            definitions.insert(reference, definition);
        }
    }

    (resolved, definitions)
}

fn local_target<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    reference
        .strip_prefix('#')
        .and_then(|pointer| root.pointer(pointer))
}

fn resolve_node(node: &Value, root: &Value, stack: &mut Vec<String>, cut: &mut Vec<String>) -> Value {
    match node {
        Value::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                let Some(target) = local_target(root, reference) else {
                    return node.clone();
                };
                if stack.iter().any(|r| r == reference) || stack.len() >= MAX_REF_DEPTH {
                    if !cut.iter().any(|r| r == reference) {
                        cut.push(reference.to_string());
                    }
                    return node.clone();
                }
                stack.push(reference.to_string());
                let resolved = resolve_node(target, root, stack, cut);
                stack.pop();
                return resolved;
            }
            Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), resolve_node(v, root, stack, cut)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(
            arr.iter()
                .map(|v| resolve_node(v, root, stack, cut))
                .collect(),
        ),
        _ => node.clone(),
    }
}

/// Point cut references at `$defs` and attach the definitions they need.
fn embed_definitions(mut schema: Value, definitions: &Map<String, Value>) -> Value {
    let mut needed = Vec::new();
    rewrite_refs(&mut schema, definitions, &mut needed);
    if needed.is_empty() {
        return schema;
    }

    let mut defs = Map::new();
    let mut i = 0;
    while i < needed.len() {
        let reference = needed[i].clone();
        i += 1;
        if let Some(definition) = definitions.get(&reference) {
            let mut definition = definition.clone();
            rewrite_refs(&mut definition, definitions, &mut needed);
            defs.insert(def_key(&reference), definition);
        }
    }

    if let Value::Object(obj) = &mut schema {
        obj.insert("$defs".to_string(), Value::Object(defs));
    }
    schema
}

fn rewrite_refs(node: &mut Value, definitions: &Map<String, Value>, needed: &mut Vec<String>) {
    match node {
        Value::Object(obj) => {
            if let Some(Value::String(reference)) = obj.get_mut("$ref") {
                if definitions.contains_key(reference.as_str()) {
                    if !needed.contains(reference) {
                        needed.push(reference.clone());
                    }
                    let key = def_key(reference);
                    *reference = format!("#/$defs/{}", key.replace('~', "~0"));
                }
            }
            for (k, v) in obj.iter_mut() {
                if k != "$ref" {
                    rewrite_refs(v, definitions, needed);
                }
            }
        }
        Value::Array(arr) => {
            for v in arr {
                rewrite_refs(v, definitions, needed);
            }
        }
        _ => {}
    }
}

/// `#/components/schemas/Node` → `components.schemas.Node`
fn def_key(reference: &str) -> String {
    reference.trim_start_matches("#/").replace('/', ".")
}

/// Extract operations in document order. `$ref`s are resolved first.
#[must_use]
pub fn extract_operations(document: &Value) -> Vec<Operation> {
    let (document, definitions) = resolve_with_definitions(document);
    let mut ops = Vec::new();

    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return ops;
    };

    for (path, path_item) in paths {
        for method in METHODS {
            let Some(operation) = path_item.get(*method) else {
                continue;
            };

            let parameters = [path_item.get("parameters"), operation.get("parameters")]
                .into_iter()
                .flatten()
                .filter_map(Value::as_array)
                .flatten()
                .filter_map(parse_parameter)
                .collect();

            let responses = operation
                .get("responses")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            let extensions = operation
                .as_object()
                .map(|obj| {
                    obj.iter()
                        .filter(|(k, _)| k.starts_with("x-"))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();

            ops.push(Operation {
                method: (*method).to_string(),
                path: path.clone(),
                summary: operation
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                parameters,
                responses,
                extensions,
                definitions: definitions.clone(),
            });
        }
    }

    ops
}

fn parse_parameter(param: &Value) -> Option<ParameterDef> {
    let name = param.get("name")?.as_str()?;
    let location = ParamLocation::parse(param.get("in")?.as_str()?)?;
    Some(ParameterDef::new(name, location, param.get("example").cloned()))
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
