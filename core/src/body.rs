//! HTTP payload model: none, text, binary or multipart.
//!
//! # Design
//! `HttpBody` is a closed enum, so exactly one payload representation exists
//! at a time and every variant setter replaces the previous payload whole.
//! Text is itself two-state: `TextContent::Raw` holds the string as captured,
//! `TextContent::Json` holds the structured value produced by `jsonify()`.
//! Keyed JSON access only works in the second state, which lets the error
//! say whether the caller forgot `jsonify()` or picked the wrong variant.
//!
//! On the wire a body is `{"type": 0..=3, "payload": ...}`. Binary payloads
//! never travel inline: the host passes a file path in, and serialization
//! spills the in-memory bytes to a fresh `tmp-<uuid>` file and passes that
//! path back out.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::ModelError;
use crate::multipart::MultipartBody;

pub const TYPE_NONE: u64 = 0;
pub const TYPE_TEXT: u64 = 1;
pub const TYPE_BINARY: u64 = 2;
pub const TYPE_MULTIPART: u64 = 3;

/// Charset given to text bodies built from Rust strings.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Text content before and after `jsonify()`.
#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Raw(String),
    Json(Value),
}

/// A text payload plus the charset the host reported for it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    content: TextContent,
    charset: Option<String>,
}

impl TextBody {
    pub fn new(text: impl Into<String>, charset: Option<String>) -> Self {
        Self {
            content: TextContent::Raw(text.into()),
            charset,
        }
    }

    pub fn content(&self) -> &TextContent {
        &self.content
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// The text as it would be sent; jsonified content is re-encoded.
    pub fn to_text(&self) -> String {
        match &self.content {
            TextContent::Raw(text) => text.clone(),
            TextContent::Json(value) => value.to_string(),
        }
    }
}

/// An HTTP message payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HttpBody {
    #[default]
    None,
    Text(TextBody),
    Binary(Vec<u8>),
    Multipart(Vec<MultipartBody>),
}

impl HttpBody {
    /// Wire type code: 0 none, 1 text, 2 binary, 3 multipart.
    pub fn type_code(&self) -> u64 {
        match self {
            HttpBody::None => TYPE_NONE,
            HttpBody::Text(_) => TYPE_TEXT,
            HttpBody::Binary(_) => TYPE_BINARY,
            HttpBody::Multipart(_) => TYPE_MULTIPART,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HttpBody::None => "none",
            HttpBody::Text(_) => "text",
            HttpBody::Binary(_) => "binary",
            HttpBody::Multipart(_) => "multipart",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, HttpBody::None)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, HttpBody::Text(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, HttpBody::Binary(_))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, HttpBody::Multipart(_))
    }

    /// True once a text body went through `jsonify()`.
    pub fn is_json(&self) -> bool {
        matches!(
            self,
            HttpBody::Text(TextBody {
                content: TextContent::Json(_),
                ..
            })
        )
    }

    // -----------------------------------------------------------------------
    // Variant setters
    // -----------------------------------------------------------------------

    pub fn none(&mut self) {
        *self = HttpBody::None;
    }

    /// Replace the payload with text. An existing text body keeps its
    /// charset, so the wire form the host sent is preserved.
    pub fn text(&mut self, text: impl Into<String>) {
        let charset = self.charset().map(str::to_string);
        *self = HttpBody::Text(TextBody::new(text, charset));
    }

    pub fn text_with_charset(&mut self, text: impl Into<String>, charset: impl Into<String>) {
        *self = HttpBody::Text(TextBody::new(text, Some(charset.into())));
    }

    /// Replace the body with the UTF-8 text content of a file.
    pub fn text_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        self.text(text);
        Ok(())
    }

    pub fn binary(&mut self, bytes: impl Into<Vec<u8>>) {
        *self = HttpBody::Binary(bytes.into());
    }

    /// Replace the body with the bytes of a file, read eagerly.
    pub fn file(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ModelError::io(path, e))?;
        self.binary(bytes);
        Ok(())
    }

    pub fn multiparts(&mut self, parts: Vec<MultipartBody>) {
        *self = HttpBody::Multipart(parts);
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Raw text, if this is a text body that has not been jsonified.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HttpBody::Text(TextBody {
                content: TextContent::Raw(text),
                ..
            }) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            HttpBody::Text(TextBody {
                content: TextContent::Json(value),
                ..
            }) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HttpBody::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn parts(&self) -> Option<&[MultipartBody]> {
        match self {
            HttpBody::Multipart(parts) => Some(parts),
            _ => None,
        }
    }

    pub fn charset(&self) -> Option<&str> {
        match self {
            HttpBody::Text(text) => text.charset(),
            _ => None,
        }
    }

    /// Number of characters, json entries, bytes or parts.
    pub fn len(&self) -> usize {
        match self {
            HttpBody::None => 0,
            HttpBody::Text(text) => match &text.content {
                TextContent::Raw(raw) => raw.chars().count(),
                TextContent::Json(Value::Object(map)) => map.len(),
                TextContent::Json(Value::Array(items)) => items.len(),
                TextContent::Json(_) => 1,
            },
            HttpBody::Binary(bytes) => bytes.len(),
            HttpBody::Multipart(parts) => parts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Text operations
    // -----------------------------------------------------------------------

    /// Parse the raw text as JSON in place. Calling it again is a no-op.
    /// On a parse error the body keeps its raw text.
    pub fn jsonify(&mut self) -> Result<&mut Value, ModelError> {
        let kind = self.kind();
        let HttpBody::Text(text) = self else {
            return Err(ModelError::UnsupportedAccess {
                operation: "jsonify",
                kind,
            });
        };
        if let TextContent::Raw(raw) = &text.content {
            let value: Value = serde_json::from_str(raw)?;
            text.content = TextContent::Json(value);
        }
        match &mut text.content {
            TextContent::Json(value) => Ok(value),
            TextContent::Raw(_) => Err(ModelError::NotJsonified),
        }
    }

    /// Replace occurrences of `old` with `new` in raw text, at most `count`
    /// times when given.
    pub fn replace(&mut self, old: &str, new: &str, count: Option<usize>) -> Result<(), ModelError> {
        match self {
            HttpBody::Text(TextBody {
                content: TextContent::Raw(raw),
                ..
            }) => {
                *raw = match count {
                    Some(n) => raw.replacen(old, new, n),
                    None => raw.replace(old, new),
                };
                Ok(())
            }
            HttpBody::Text(_) => Err(ModelError::UnsupportedAccess {
                operation: "replace",
                kind: "jsonified text",
            }),
            other => Err(ModelError::UnsupportedAccess {
                operation: "replace",
                kind: other.kind(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Keyed and indexed access
    // -----------------------------------------------------------------------

    fn json_ref(&self) -> Result<&Value, ModelError> {
        match self {
            HttpBody::Text(text) => match &text.content {
                TextContent::Json(value) => Ok(value),
                TextContent::Raw(_) => Err(ModelError::NotJsonified),
            },
            other => Err(ModelError::UnsupportedAccess {
                operation: "keyed access",
                kind: other.kind(),
            }),
        }
    }

    fn json_mut(&mut self) -> Result<&mut Value, ModelError> {
        match self {
            HttpBody::Text(text) => match &mut text.content {
                TextContent::Json(value) => Ok(value),
                TextContent::Raw(_) => Err(ModelError::NotJsonified),
            },
            other => Err(ModelError::UnsupportedAccess {
                operation: "keyed access",
                kind: other.kind(),
            }),
        }
    }

    /// Look up a key (or array index) in a jsonified body.
    pub fn get<I: serde_json::value::Index>(&self, index: I) -> Result<Option<&Value>, ModelError> {
        Ok(self.json_ref()?.get(index))
    }

    pub fn get_mut<I: serde_json::value::Index>(
        &mut self,
        index: I,
    ) -> Result<Option<&mut Value>, ModelError> {
        Ok(self.json_mut()?.get_mut(index))
    }

    /// Insert or overwrite a key in a jsonified object body.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), ModelError> {
        match self.json_mut()? {
            Value::Object(map) => {
                map.insert(key.into(), value.into());
                Ok(())
            }
            _ => Err(ModelError::NotJsonObject),
        }
    }

    pub fn byte_at(&self, index: usize) -> Result<u8, ModelError> {
        match self {
            HttpBody::Binary(bytes) => bytes.get(index).copied().ok_or(ModelError::IndexOutOfRange {
                index,
                len: bytes.len(),
            }),
            other => Err(unsupported_index(other)),
        }
    }

    pub fn set_byte(&mut self, index: usize, byte: u8) -> Result<(), ModelError> {
        match self {
            HttpBody::Binary(bytes) => {
                let len = bytes.len();
                let slot = bytes
                    .get_mut(index)
                    .ok_or(ModelError::IndexOutOfRange { index, len })?;
                *slot = byte;
                Ok(())
            }
            other => Err(unsupported_index(other)),
        }
    }

    pub fn part(&self, index: usize) -> Result<&MultipartBody, ModelError> {
        match self {
            HttpBody::Multipart(parts) => parts.get(index).ok_or(ModelError::IndexOutOfRange {
                index,
                len: parts.len(),
            }),
            other => Err(unsupported_index(other)),
        }
    }

    pub fn part_mut(&mut self, index: usize) -> Result<&mut MultipartBody, ModelError> {
        match self {
            HttpBody::Multipart(parts) => {
                let len = parts.len();
                parts
                    .get_mut(index)
                    .ok_or(ModelError::IndexOutOfRange { index, len })
            }
            other => Err(unsupported_index(other)),
        }
    }

    pub fn set_part(&mut self, index: usize, part: MultipartBody) -> Result<(), ModelError> {
        *self.part_mut(index)? = part;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Files and wire format
    // -----------------------------------------------------------------------

    /// Write the payload to `path`. A none body writes nothing.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let result = match self {
            HttpBody::None => return Ok(()),
            HttpBody::Text(text) => fs::write(path, text.to_text()),
            HttpBody::Binary(bytes) => fs::write(path, bytes),
            HttpBody::Multipart(_) => return Err(ModelError::MultipartWrite),
        };
        result.map_err(|e| ModelError::io(path, e))
    }

    /// Decode a `{type, payload}` wire body. A missing or `null` body is none.
    /// Binary payloads name a file that is read immediately.
    pub fn from_wire(value: &Value) -> Result<Self, ModelError> {
        if value.is_null() {
            return Ok(HttpBody::None);
        }
        let code = value
            .get("type")
            .and_then(Value::as_u64)
            .ok_or(ModelError::Malformed("body type"))?;
        let payload = value.get("payload").unwrap_or(&Value::Null);
        match code {
            TYPE_NONE => Ok(HttpBody::None),
            TYPE_TEXT => match payload {
                Value::String(text) => Ok(HttpBody::Text(TextBody::new(text.as_str(), None))),
                Value::Object(fields) => {
                    let text = fields
                        .get("text")
                        .and_then(Value::as_str)
                        .ok_or(ModelError::Malformed("text body payload"))?;
                    let charset = fields.get("charset").and_then(Value::as_str).map(str::to_string);
                    Ok(HttpBody::Text(TextBody::new(text, charset)))
                }
                Value::Null => Ok(HttpBody::Text(TextBody::new("", None))),
                _ => Err(ModelError::Malformed("text body payload")),
            },
            TYPE_BINARY => match payload {
                Value::String(path) => {
                    let bytes = fs::read(path).map_err(|e| ModelError::io(path, e))?;
                    Ok(HttpBody::Binary(bytes))
                }
                _ => Ok(HttpBody::Binary(Vec::new())),
            },
            TYPE_MULTIPART => {
                let parts = payload
                    .as_array()
                    .ok_or(ModelError::Malformed("multipart body payload"))?
                    .iter()
                    .map(MultipartBody::from_wire)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(HttpBody::Multipart(parts))
            }
            other => Err(ModelError::UnknownBodyType(other)),
        }
    }

    /// Encode as a `{type, payload}` wire body. Empty payloads collapse to
    /// none; binary payloads are spilled to a new file under `spill_dir`.
    pub fn to_wire(&self, spill_dir: &Path) -> Result<Value, ModelError> {
        let none = json!({ "type": TYPE_NONE, "payload": Value::Null });
        let value = match self {
            HttpBody::None => none,
            HttpBody::Text(text) => {
                let content = text.to_text();
                if content.is_empty() {
                    return Ok(none);
                }
                let payload = match &text.charset {
                    Some(charset) => json!({ "text": content, "charset": charset }),
                    None => Value::String(content),
                };
                json!({ "type": TYPE_TEXT, "payload": payload })
            }
            HttpBody::Binary(bytes) => {
                if bytes.is_empty() {
                    return Ok(none);
                }
                let path = spill(spill_dir, bytes)?;
                json!({ "type": TYPE_BINARY, "payload": path.to_string_lossy() })
            }
            HttpBody::Multipart(parts) => {
                if parts.is_empty() {
                    return Ok(none);
                }
                let payload = parts
                    .iter()
                    .map(|part| part.to_wire(spill_dir))
                    .collect::<Result<Vec<_>, _>>()?;
                json!({ "type": TYPE_MULTIPART, "payload": payload })
            }
        };
        Ok(value)
    }
}

fn unsupported_index(body: &HttpBody) -> ModelError {
    ModelError::UnsupportedAccess {
        operation: "indexed access",
        kind: body.kind(),
    }
}

/// Write `bytes` to a uniquely named `tmp-<uuid>` file under `dir`.
fn spill(dir: &Path, bytes: &[u8]) -> Result<PathBuf, ModelError> {
    let path = dir.join(format!("tmp-{}", Uuid::new_v4()));
    fs::write(&path, bytes).map_err(|e| ModelError::io(&path, e))?;
    debug!(path = %path.display(), len = bytes.len(), "spilled binary body");
    Ok(path)
}

impl fmt::Display for HttpBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpBody::None => Ok(()),
            HttpBody::Text(text) => f.write_str(&text.to_text()),
            HttpBody::Binary(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            HttpBody::Multipart(parts) => write!(f, "Multipart {} body", parts.len()),
        }
    }
}

impl From<()> for HttpBody {
    fn from(_: ()) -> Self {
        HttpBody::None
    }
}

impl From<&str> for HttpBody {
    fn from(text: &str) -> Self {
        HttpBody::Text(TextBody::new(text, Some(DEFAULT_CHARSET.to_string())))
    }
}

impl From<String> for HttpBody {
    fn from(text: String) -> Self {
        HttpBody::Text(TextBody::new(text, Some(DEFAULT_CHARSET.to_string())))
    }
}

impl From<Vec<u8>> for HttpBody {
    fn from(bytes: Vec<u8>) -> Self {
        HttpBody::Binary(bytes)
    }
}

impl From<&[u8]> for HttpBody {
    fn from(bytes: &[u8]) -> Self {
        HttpBody::Binary(bytes.to_vec())
    }
}

/// A JSON value becomes a raw text body holding its encoding.
impl From<Value> for HttpBody {
    fn from(value: Value) -> Self {
        HttpBody::Text(TextBody::new(value.to_string(), Some(DEFAULT_CHARSET.to_string())))
    }
}

impl<T: Into<HttpBody>> From<Option<T>> for HttpBody {
    fn from(body: Option<T>) -> Self {
        body.map_or(HttpBody::None, Into::into)
    }
}
