//! Captured HTTP request envelope.
//!
//! # Design
//! The host sends the request target as one string that may carry
//! `;params`, `?query` and `#fragment`. It is split once at construction:
//! the path and its params are kept as strings, the query becomes an
//! `HttpQueries` collection, the fragment is dropped. Hooks can then edit
//! path and queries independently, and serialization glues them back as
//! `path [";" params] ["?" query]`.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::body::HttpBody;
use crate::error::ModelError;
use crate::headers::HttpHeaders;
use crate::queries::HttpQueries;

/// Wire shape of a request, as read from the host's JSON document.
#[derive(Debug, Deserialize)]
struct WireRequest {
    method: String,
    path: String,
    protocol: String,
    #[serde(default)]
    headers: Option<HttpHeaders>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    trailers: Option<HttpHeaders>,
}

/// A captured HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: String,
    path: String,
    params: Option<String>,
    queries: HttpQueries,
    protocol: String,
    headers: HttpHeaders,
    trailers: HttpHeaders,
    body: HttpBody,
}

impl HttpRequest {
    /// Build a request from a method and a raw request target such as
    /// `/search;v=1?q=rust`.
    pub fn new(method: &str, target: &str, protocol: &str) -> Result<Self, ModelError> {
        if method.is_empty() {
            return Err(ModelError::EmptyMethod);
        }
        let target = Target::split(target);
        Ok(Self {
            method: method.to_string(),
            path: target.path,
            params: target.params,
            queries: HttpQueries::parse(&target.query),
            protocol: protocol.to_string(),
            headers: HttpHeaders::new(),
            trailers: HttpHeaders::new(),
            body: HttpBody::None,
        })
    }

    /// Decode the `request` object of a host document. Binary bodies are
    /// read from the file they point at.
    pub fn from_wire(value: &Value) -> Result<Self, ModelError> {
        let wire = WireRequest::deserialize(value)?;
        let mut request = Self::new(&wire.method, &wire.path, &wire.protocol)?;
        request.headers = wire.headers.unwrap_or_default();
        request.trailers = wire.trailers.unwrap_or_default();
        request.body = HttpBody::from_wire(&wire.body)?;
        Ok(request)
    }

    /// Encode for the callback document. Binary bodies are spilled to a new
    /// file under `spill_dir`.
    pub fn to_wire(&self, spill_dir: &Path) -> Result<Value, ModelError> {
        Ok(json!({
            "method": self.method,
            "path": self.target(),
            "protocol": self.protocol,
            "headers": self.headers,
            "body": self.body.to_wire(spill_dir)?,
            "trailers": self.trailers,
        }))
    }

    pub fn to_json(&self, spill_dir: &Path) -> Result<String, ModelError> {
        Ok(self.to_wire(spill_dir)?.to_string())
    }

    /// The request target as it goes back on the wire.
    pub fn target(&self) -> String {
        let mut target = self.path.clone();
        if let Some(params) = &self.params {
            target.push(';');
            target.push_str(params);
        }
        if !self.queries.is_empty() {
            target.push('?');
            target.push_str(&self.queries.serialize());
        }
        target
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) -> Result<(), ModelError> {
        let method = method.into();
        if method.is_empty() {
            return Err(ModelError::EmptyMethod);
        }
        self.method = method;
        Ok(())
    }

    /// Path without params or query.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> Result<(), ModelError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ModelError::EmptyPath);
        }
        self.path = path;
        Ok(())
    }

    /// The `;params` part of the last path segment, if any.
    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn queries(&self) -> &HttpQueries {
        &self.queries
    }

    pub fn queries_mut(&mut self) -> &mut HttpQueries {
        &mut self.queries
    }

    pub fn set_queries(&mut self, queries: HttpQueries) {
        self.queries = queries;
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

    pub fn trailers(&self) -> &HttpHeaders {
        &self.trailers
    }

    pub fn trailers_mut(&mut self) -> &mut HttpHeaders {
        &mut self.trailers
    }

    pub fn set_trailers(&mut self, trailers: HttpHeaders) {
        self.trailers = trailers;
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut HttpBody {
        &mut self.body
    }

    pub fn set_body(&mut self, body: impl Into<HttpBody>) {
        self.body = body.into();
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    pub fn mime(&self) -> Option<String> {
        self.headers.mime()
    }
}

/// A request target split into its parts.
#[derive(Debug, PartialEq)]
struct Target {
    path: String,
    params: Option<String>,
    query: String,
}

impl Target {
    fn split(raw: &str) -> Self {
        let raw = raw.split_once('#').map_or(raw, |(head, _)| head);
        let (rest, query) = raw.split_once('?').unwrap_or((raw, ""));

        // Params only attach to the last path segment.
        let segment_start = rest.rfind('/').unwrap_or(0);
        let (path, params) = match rest[segment_start..].find(';') {
            Some(i) => {
                let at = segment_start + i;
                (&rest[..at], Some(&rest[at + 1..]))
            }
            None => (rest, None),
        };

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            path,
            params: params.filter(|p| !p.is_empty()).map(str::to_string),
            query: query.to_string(),
        }
    }
}
