//! One part of a multipart body: its own headers plus a text or binary body.
//!
//! # Design
//! A part's name and filename are not stored anywhere but in its
//! `Content-Disposition` header. Reading them parses that header; writing
//! them rewrites it in place, touching only the targeted parameter so every
//! other parameter and every other header survives verbatim.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::body::{HttpBody, TextBody};
use crate::error::ModelError;
use crate::headers::HttpHeaders;

const CONTENT_DISPOSITION: &str = "content-disposition";
const CONTENT_LENGTH: &str = "content-length";

/// A single multipart part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    headers: HttpHeaders,
    body: HttpBody,
}

impl MultipartBody {
    /// Build a part from headers and a text, binary or none body.
    pub fn new(headers: HttpHeaders, body: HttpBody) -> Result<Self, ModelError> {
        check_part_body(&body)?;
        Ok(Self { headers, body })
    }

    /// Start building a part with auto-populated length and disposition
    /// headers.
    pub fn builder() -> PartBuilder {
        PartBuilder::default()
    }

    /// Decode a `{headers, body}` wire part.
    pub fn from_wire(value: &Value) -> Result<Self, ModelError> {
        let headers = match value.get("headers") {
            None | Some(Value::Null) => HttpHeaders::new(),
            Some(lines) => serde_json::from_value(lines.clone())
                .map_err(|_| ModelError::Malformed("multipart part headers"))?,
        };
        let body = HttpBody::from_wire(value.get("body").unwrap_or(&Value::Null))?;
        Self::new(headers, body)
    }

    pub fn to_wire(&self, spill_dir: &Path) -> Result<Value, ModelError> {
        Ok(json!({
            "headers": self.headers,
            "body": self.body.to_wire(spill_dir)?,
        }))
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HttpHeaders {
        &mut self.headers
    }

    pub fn set_headers(&mut self, headers: HttpHeaders) {
        self.headers = headers;
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    /// Replace the part body. Parts cannot nest multipart bodies.
    pub fn set_body(&mut self, body: impl Into<HttpBody>) -> Result<(), ModelError> {
        let body = body.into();
        check_part_body(&body)?;
        self.body = body;
        Ok(())
    }

    /// The `name` parameter of the `Content-Disposition` header.
    pub fn name(&self) -> Option<String> {
        self.disposition_param("name")
    }

    /// Rewrite the `name` parameter. Does nothing without a
    /// `Content-Disposition` header.
    pub fn set_name(&mut self, name: &str) {
        self.set_disposition_param("name", name);
    }

    pub fn filename(&self) -> Option<String> {
        self.disposition_param("filename")
    }

    /// Rewrite the `filename` parameter. Does nothing without a
    /// `Content-Disposition` header.
    pub fn set_filename(&mut self, filename: &str) {
        self.set_disposition_param("filename", filename);
    }

    fn disposition_param(&self, param: &str) -> Option<String> {
        let raw = self.headers.get(CONTENT_DISPOSITION)?;
        Disposition::parse(raw).get(param).map(str::to_string)
    }

    fn set_disposition_param(&mut self, param: &str, value: &str) {
        let Some(raw) = self.headers.get(CONTENT_DISPOSITION) else {
            return;
        };
        let mut disposition = Disposition::parse(raw);
        disposition.set(param, value);
        self.headers.set(CONTENT_DISPOSITION, &disposition.to_string());
    }
}

fn check_part_body(body: &HttpBody) -> Result<(), ModelError> {
    if body.is_multipart() {
        return Err(ModelError::UnsupportedAccess {
            operation: "nesting inside a part",
            kind: "multipart",
        });
    }
    Ok(())
}

/// Builder behind `MultipartBody::builder()`.
///
/// `text` and `file` append a `content-length` header and, when a name or
/// filename was given, a `content-disposition` header of the form
/// `{type}; name="{name}"; filename="{filename}"`.
#[derive(Debug, Clone)]
pub struct PartBuilder {
    headers: Vec<String>,
    name: Option<String>,
    filename: Option<String>,
    disposition_type: String,
    charset: String,
}

impl Default for PartBuilder {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            name: None,
            filename: None,
            disposition_type: "form-data".to_string(),
            charset: "UTF-8".to_string(),
        }
    }
}

impl PartBuilder {
    /// Leading header lines, placed before the generated ones.
    pub fn headers<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn disposition_type(mut self, disposition_type: impl Into<String>) -> Self {
        self.disposition_type = disposition_type.into();
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// A text part; its length is counted in characters.
    pub fn text(self, text: impl Into<String>) -> MultipartBody {
        let text = text.into();
        let length = text.chars().count();
        let body = HttpBody::Text(TextBody::new(text, Some(self.charset.clone())));
        self.finish(length, body)
    }

    /// A binary part read from `path`; its length is the file size.
    pub fn file(self, path: impl AsRef<Path>) -> Result<MultipartBody, ModelError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ModelError::io(path, e))?;
        Ok(self.finish(bytes.len(), HttpBody::Binary(bytes)))
    }

    fn finish(self, length: usize, body: HttpBody) -> MultipartBody {
        let mut headers = HttpHeaders::from_lines(self.headers);
        headers.add(CONTENT_LENGTH, &length.to_string());
        let mut disposition = Disposition::new(&self.disposition_type);
        if let Some(name) = &self.name {
            disposition.set("name", name);
        }
        if let Some(filename) = &self.filename {
            disposition.set("filename", filename);
        }
        if !disposition.params.is_empty() {
            headers.add(CONTENT_DISPOSITION, &disposition.to_string());
        }
        MultipartBody { headers, body }
    }
}

/// A parsed `Content-Disposition` value: its type and ordered parameters.
/// Each parameter keeps its raw text so untouched ones re-serialize as-is.
#[derive(Debug, Clone, PartialEq)]
struct Disposition {
    kind: String,
    params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
struct Param {
    name: String,
    value: Option<String>,
    raw: String,
}

impl Param {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
            raw: format!("{name}=\"{}\"", quote(value)),
        }
    }
}

impl Disposition {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: Vec::new(),
        }
    }

    fn parse(raw: &str) -> Self {
        let mut segments = split_semicolons_respecting_quotes(raw).into_iter();
        let kind = segments.next().unwrap_or_default().trim().to_string();
        let params = segments
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (name, value) = match segment.split_once('=') {
                    Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
                    None => (segment, None),
                };
                Param {
                    name: name.to_string(),
                    value,
                    raw: segment.to_string(),
                }
            })
            .collect();
        Self { kind, params }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|param| param.name.eq_ignore_ascii_case(name))
            .and_then(|param| param.value.as_deref())
    }

    fn set(&mut self, name: &str, value: &str) {
        match self
            .params
            .iter_mut()
            .find(|param| param.name.eq_ignore_ascii_case(name))
        {
            Some(param) => *param = Param::new(&param.name.clone(), value),
            None => self.params.push(Param::new(name, value)),
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.kind)?;
        for param in &self.params {
            write!(f, "; {}", param.raw)?;
        }
        Ok(())
    }
}

/// Split on `;` outside of double-quoted strings.
fn split_semicolons_respecting_quotes(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            ';' if !in_quote => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disposition_of(part: &MultipartBody) -> Option<&str> {
        part.headers().get(CONTENT_DISPOSITION)
    }

    #[test]
    fn from_wire_reads_headers_and_body() {
        let part = MultipartBody::from_wire(&json!({
            "headers": ["foo: bar", "abc: 123", "hello: world"],
            "body": {"type": 1, "payload": "Hello World"}
        }))
        .unwrap();
        assert_eq!(part.headers().entries(), ["foo: bar", "abc: 123", "hello: world"]);
        assert_eq!(part.body().as_text(), Some("Hello World"));
    }

    #[test]
    fn wire_round_trip_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let wire = json!({
            "headers": ["foo: bar", "abc: 123", "hello: world"],
            "body": {"type": 1, "payload": "Hello World"}
        });
        let part = MultipartBody::from_wire(&wire).unwrap();
        assert_eq!(part.to_wire(dir.path()).unwrap(), wire);
    }

    #[test]
    fn text_factory_appends_length_and_disposition() {
        let part = MultipartBody::builder()
            .headers(["abc: 123", "foo: bar"])
            .name("python")
            .filename("image.png")
            .text("Hi World");
        assert_eq!(part.body().as_text(), Some("Hi World"));
        assert_eq!(
            part.headers().entries(),
            [
                "abc: 123",
                "foo: bar",
                "content-length: 8",
                "content-disposition: form-data; name=\"python\"; filename=\"image.png\"",
            ]
        );
    }

    #[test]
    fn disposition_clauses_are_independently_omitted() {
        let plain = MultipartBody::builder().text("Hi World");
        assert_eq!(plain.headers().entries(), ["content-length: 8"]);

        let named = MultipartBody::builder().name("python").text("Hi World");
        assert_eq!(disposition_of(&named), Some("form-data; name=\"python\""));

        let filed = MultipartBody::builder().filename("image.png").text("Hi World");
        assert_eq!(disposition_of(&filed), Some("form-data; filename=\"image.png\""));

        let empty = MultipartBody::builder().name("").text("Hi World");
        assert_eq!(disposition_of(&empty), None);
    }

    #[test]
    fn plain_values_fill_the_template_verbatim() {
        for name in ["field", "a b", "a;b", "é.png"] {
            let part = MultipartBody::builder().name(name).filename(name).text("x");
            let expected = format!("form-data; name=\"{name}\"; filename=\"{name}\"");
            assert_eq!(disposition_of(&part), Some(expected.as_str()));
        }
    }

    #[test]
    fn embedded_quotes_are_escaped_and_read_back() {
        let part = MultipartBody::builder().name("say \"hi\"").text("x");
        assert_eq!(disposition_of(&part), Some(r#"form-data; name="say \"hi\"""#));
        assert_eq!(part.name().as_deref(), Some("say \"hi\""));
    }

    #[test]
    fn file_factory_uses_size_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.bin");
        fs::write(&path, [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let part = MultipartBody::builder()
            .name("python")
            .filename("image.png")
            .disposition_type("attachment")
            .file(&path)
            .unwrap();
        assert!(part.body().is_binary());
        assert_eq!(part.body().len(), 8);
        assert_eq!(part.headers().get(CONTENT_LENGTH), Some("8"));
        assert_eq!(
            disposition_of(&part),
            Some("attachment; name=\"python\"; filename=\"image.png\"")
        );
    }

    #[test]
    fn file_factory_fails_for_missing_file() {
        let err = MultipartBody::builder().file("/nonexistent/part.bin").unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn name_and_filename_read_from_disposition() {
        let part = MultipartBody::new(
            HttpHeaders::from_lines(["Content-Disposition: form-data; name=\"a;b\"; filename=plain.txt"]),
            HttpBody::from("x"),
        )
        .unwrap();
        assert_eq!(part.name().as_deref(), Some("a;b"));
        assert_eq!(part.filename().as_deref(), Some("plain.txt"));
    }

    #[test]
    fn setting_name_rewrites_only_that_parameter() {
        let mut part = MultipartBody::new(
            HttpHeaders::from_lines([
                "x-before: 1",
                "content-disposition: form-data; name=\"old\"; filename=\"f.png\"; size=3",
                "x-after: 2",
            ]),
            HttpBody::from("x"),
        )
        .unwrap();
        part.set_name("new");
        part.set_filename("g.png");
        assert_eq!(
            part.headers().entries(),
            [
                "x-before: 1",
                "content-disposition: form-data; name=\"new\"; filename=\"g.png\"; size=3",
                "x-after: 2",
            ]
        );
        assert_eq!(part.name().as_deref(), Some("new"));
    }

    #[test]
    fn setting_missing_parameter_appends_it() {
        let mut part = MultipartBody::builder().name("python").text("Hi");
        part.set_filename("image.png");
        assert_eq!(
            disposition_of(&part),
            Some("form-data; name=\"python\"; filename=\"image.png\"")
        );
    }

    #[test]
    fn setting_name_without_disposition_is_a_no_op() {
        let mut part = MultipartBody::builder().text("Hi");
        let before = part.clone();
        part.set_name("python");
        assert_eq!(part, before);
        assert_eq!(part.name(), None);
    }

    #[test]
    fn quoted_values_are_escaped() {
        let mut part = MultipartBody::builder().name("x").text("Hi");
        part.set_name("say \"hi\"");
        assert_eq!(disposition_of(&part), Some(r#"form-data; name="say \"hi\"""#));
        assert_eq!(part.name().as_deref(), Some("say \"hi\""));
    }

    #[test]
    fn parts_reject_nested_multipart_bodies() {
        let mut part = MultipartBody::builder().text("Hi");
        let err = part.set_body(HttpBody::Multipart(Vec::new())).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedAccess { .. }));
        assert_eq!(part.body().as_text(), Some("Hi"));
    }
}
