//! Captured HTTP response envelope, carrying the request it answers.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::body::HttpBody;
use crate::error::ModelError;
use crate::headers::HttpHeaders;
use crate::request::HttpRequest;

/// Lowest and highest status code a hook may set.
pub const MIN_STATUS: u16 = 100;
pub const MAX_STATUS: u16 = 600;

#[derive(Debug, Deserialize)]
struct WireResponse {
    request: Value,
    code: u16,
    #[serde(default)]
    message: Option<String>,
    protocol: String,
    #[serde(default)]
    headers: Option<HttpHeaders>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    trailers: Option<HttpHeaders>,
}

/// A captured HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    request: HttpRequest,
    code: u16,
    message: Option<String>,
    protocol: String,
    headers: HttpHeaders,
    trailers: HttpHeaders,
    body: HttpBody,
}

impl HttpResponse {
    pub fn new(request: HttpRequest, code: u16, protocol: &str) -> Result<Self, ModelError> {
        check_code(code)?;
        Ok(Self {
            request,
            code,
            message: None,
            protocol: protocol.to_string(),
            headers: HttpHeaders::new(),
            trailers: HttpHeaders::new(),
            body: HttpBody::None,
        })
    }

    /// Decode the `response` object of a host document, including its
    /// embedded request. The host's status code is taken as-is.
    pub fn from_wire(value: &Value) -> Result<Self, ModelError> {
        let wire = WireResponse::deserialize(value)?;
        Ok(Self {
            request: HttpRequest::from_wire(&wire.request)?,
            code: wire.code,
            message: wire.message,
            protocol: wire.protocol,
            headers: wire.headers.unwrap_or_default(),
            trailers: wire.trailers.unwrap_or_default(),
            body: HttpBody::from_wire(&wire.body)?,
        })
    }

    pub fn to_wire(&self, spill_dir: &Path) -> Result<Value, ModelError> {
        Ok(json!({
            "request": self.request.to_wire(spill_dir)?,
            "code": self.code,
            "message": self.message,
            "protocol": self.protocol,
            "headers": self.headers,
            "body": self.body.to_wire(spill_dir)?,
            "trailers": self.trailers,
        }))
    }

    pub fn to_json(&self, spill_dir: &Path) -> Result<String, ModelError> {
        Ok(self.to_wire(spill_dir)?.to_string())
    }

    /// The request this response answers. Read-only.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// Set the status code; anything outside 100..=600 is rejected.
    pub fn set_code(&mut self, code: u16) -> Result<(), ModelError> {
        check_code(code)?;
        self.code = code;
        Ok(())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
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

fn check_code(code: u16) -> Result<(), ModelError> {
    if (MIN_STATUS..=MAX_STATUS).contains(&code) {
        Ok(())
    } else {
        Err(ModelError::StatusOutOfRange(code))
    }
}
