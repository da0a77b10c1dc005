//! Request payloads: encodings, multipart fields and uploaded files

use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SpecError;

/// Bytes read from a file to sniff its MIME type.
const SNIFF_LEN: u64 = 8192;

/// Payload encoding of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyEncoding {
    Json,
    UrlEncoded,
    Multipart,
}

impl BodyEncoding {
    /// The `type` string used in test specs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::UrlEncoded => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
        }
    }
}

impl FromStr for BodyEncoding {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application/json" => Ok(Self::Json),
            "application/x-www-form-urlencoded" => Ok(Self::UrlEncoded),
            "multipart/form-data" => Ok(Self::Multipart),
            other => Err(SpecError::UnsupportedRequestBodyType(other.to_string())),
        }
    }
}

impl std::fmt::Display for BodyEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to a multipart body.
///
/// Only references the file; content is read by whoever sends the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    path: PathBuf,
    original_name: String,
    mime_type: String,
}

impl UploadedFile {
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Location of the file on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename presented to the server
    #[must_use]
    pub fn client_original_name(&self) -> &str {
        &self.original_name
    }

    /// MIME type sniffed from the file content
    #[must_use]
    pub fn client_mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartField {
    Text(String),
    /// Structured value sent as bracketed sub-fields (`name[key]`)
    Nested(Value),
    File(UploadedFile),
}

/// Body payload, shaped by its encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyPayload {
    /// JSON and url-encoded bodies: the test `data` verbatim
    Structured(Value),
    Multipart(IndexMap<String, MultipartField>),
}

/// A request payload tagged with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    encoding: BodyEncoding,
    payload: BodyPayload,
}

impl RequestBody {
    #[must_use]
    pub fn new(encoding: BodyEncoding, payload: BodyPayload) -> Self {
        Self { encoding, payload }
    }

    /// Build a body from its spec `type` and `data`.
    ///
    /// Relative file references in multipart bodies resolve against `external_base`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown encoding, an unrecognized multipart field, or a
    /// file that cannot be read for MIME sniffing.
    pub fn from_spec(kind: &str, data: &Value, external_base: &Path) -> Result<Self, SpecError> {
        let encoding: BodyEncoding = kind.parse()?;
        let payload = match encoding {
            BodyEncoding::Json | BodyEncoding::UrlEncoded => BodyPayload::Structured(data.clone()),
            BodyEncoding::Multipart => BodyPayload::Multipart(build_multipart(data, external_base)?),
        };
        Ok(Self { encoding, payload })
    }

    #[must_use]
    pub const fn encoding(&self) -> BodyEncoding {
        self.encoding
    }

    /// Encoding as a MIME type string.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.encoding.as_str()
    }

    #[must_use]
    pub fn payload(&self) -> &BodyPayload {
        &self.payload
    }
}

/// Field shapes accepted in multipart `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldSpec {
    Text(String),
    Tagged(TaggedField),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedField {
    Array {
        #[serde(default)]
        data: Value,
    },
    File {
        path: String,
        #[serde(default)]
        filename: Option<String>,
    },
}

fn build_multipart(
    data: &Value,
    external_base: &Path,
) -> Result<IndexMap<String, MultipartField>, SpecError> {
    let fields = match data {
        Value::Object(map) => map,
        Value::Null => return Ok(IndexMap::new()),
        other => {
            return Err(SpecError::InvalidMultipartField {
                name: String::new(),
                reason: format!("multipart data must be a mapping, got {other}"),
            });
        }
    };

    let mut result = IndexMap::with_capacity(fields.len());
    for (name, value) in fields {
        let spec = FieldSpec::deserialize(value).map_err(|_| SpecError::InvalidMultipartField {
            name: name.clone(),
            reason: "expected a string, {type: array, data} or {type: file, path}".to_string(),
        })?;

        let field = match spec {
            FieldSpec::Text(s) => MultipartField::Text(s),
            FieldSpec::Tagged(TaggedField::Array { data }) => MultipartField::Nested(data),
            FieldSpec::Tagged(TaggedField::File { path, filename }) => {
                MultipartField::File(resolve_upload(external_base, &path, filename)?)
            }
        };
        result.insert(name.clone(), field);
    }

    Ok(result)
}

/// `base + '/' + relative`, kept literal so reports show the path as written.
fn resolve_upload(
    external_base: &Path,
    relative: &str,
    filename: Option<String>,
) -> Result<UploadedFile, SpecError> {
    let full_path = PathBuf::from(format!("{}/{relative}", external_base.display()));
    let mime_type = sniff_mime_type(&full_path)?;
    let original_name = filename.unwrap_or_else(|| {
        full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    tracing::debug!(path = %full_path.display(), %mime_type, "resolved multipart file");
    Ok(UploadedFile::new(full_path, original_name, mime_type))
}

/// Detect a file's MIME type from its leading bytes.
///
/// Known binary formats come from magic numbers; anything else is
/// `text/plain` when it decodes as UTF-8, `application/octet-stream` otherwise.
///
/// # Errors
///
/// Returns [`SpecError::FileProbe`] if the file cannot be opened or read.
pub fn sniff_mime_type(path: &Path) -> Result<String, SpecError> {
    let sniff_err = |e: std::io::Error| SpecError::FileProbe(path.to_path_buf(), e.to_string());

    let file = std::fs::File::open(path).map_err(sniff_err)?;
    let mut head = Vec::new();
    file.take(SNIFF_LEN)
        .read_to_end(&mut head)
        .map_err(sniff_err)?;

    if let Some(kind) = infer::get(&head) {
        return Ok(kind.mime_type().to_string());
    }

    let mime = if head.is_empty() {
        "application/x-empty"
    } else if std::str::from_utf8(&head).map_or_else(|e| e.error_len().is_none(), |_| true) {
        // error_len() == None: a multi-byte char was cut at SNIFF_LEN
        "text/plain"
    } else {
        "application/octet-stream"
    };
    Ok(mime.to_string())
}
