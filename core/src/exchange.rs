//! One file-based hook invocation.
//!
//! # Design
//! The host writes a JSON document, runs the script once with the phase
//! name and the document path, and reads back `<path>.cb` when the script
//! exits. `run` performs exactly that sequence for one message:
//!
//! 1. read and decode the document (context + request or response),
//! 2. hand both to the user's [`Addon`],
//! 3. if the addon returned a message, write the callback document next to
//!    the input; if it returned `None`, write nothing.
//!
//! No retries, no partial output: any failure, including an error returned
//! by the hook, aborts before the callback file is touched.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::{ModelError, ScriptError};
use crate::request::HttpRequest;
use crate::response::HttpResponse;

/// Suffix the host expects on the callback file.
pub const CALLBACK_SUFFIX: &str = ".cb";

/// Which half of the exchange is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Request,
    Response,
}

impl Phase {
    /// Key of the message inside both the input and callback documents.
    pub fn key(self) -> &'static str {
        match self {
            Phase::Request => "request",
            Phase::Response => "response",
        }
    }
}

impl FromStr for Phase {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Phase::Request),
            "response" => Ok(Phase::Response),
            other => Err(ScriptError::UnexpectedPhase(other.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// User hooks. Returning `Ok(None)` means there is nothing to report back
/// and suppresses the callback file.
pub trait Addon {
    fn on_request(
        &mut self,
        _context: &mut Context,
        request: HttpRequest,
    ) -> anyhow::Result<Option<HttpRequest>> {
        Ok(Some(request))
    }

    fn on_response(
        &mut self,
        _context: &mut Context,
        response: HttpResponse,
    ) -> anyhow::Result<Option<HttpResponse>> {
        Ok(Some(response))
    }
}

/// Hands every message back untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Addon for PassThrough {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Where non-empty binary bodies are spilled. `None` means the working
    /// directory at the time the callback is written.
    pub temp_dir: Option<PathBuf>,
    pub callback_suffix: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            callback_suffix: CALLBACK_SUFFIX.to_string(),
        }
    }
}

impl ExchangeConfig {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_callback_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.callback_suffix = suffix.into();
        self
    }

    /// Path of the callback file for `input`.
    pub fn callback_path(&self, input: &Path) -> PathBuf {
        let mut name = input.as_os_str().to_owned();
        name.push(&self.callback_suffix);
        PathBuf::from(name)
    }

    fn spill_dir(&self) -> Result<PathBuf, ScriptError> {
        match &self.temp_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|source| ScriptError::Io {
                path: PathBuf::from("."),
                source,
            }),
        }
    }
}

/// What one invocation left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The callback document was written to this path.
    Written(PathBuf),
    /// The hook returned `None`; no callback file exists.
    Skipped,
}

/// Process the document at `path` for `phase`.
pub fn run<A: Addon + ?Sized>(
    addon: &mut A,
    phase: Phase,
    path: &Path,
    config: &ExchangeConfig,
) -> Result<Outcome, ScriptError> {
    debug!(%phase, path = %path.display(), "processing document");
    let document = read_document(path)?;

    let context = document
        .get("context")
        .ok_or(ModelError::Malformed("document, missing `context`"))?;
    let mut context = Context::from_wire(context)?;
    let message = document.get(phase.key()).ok_or(ModelError::Malformed(match phase {
        Phase::Request => "document, missing `request`",
        Phase::Response => "document, missing `response`",
    }))?;

    let reply = match phase {
        Phase::Request => {
            let request = HttpRequest::from_wire(message)?;
            debug!(method = request.method(), path = request.path(), "decoded request");
            match addon.on_request(&mut context, request).map_err(ScriptError::Hook)? {
                Some(request) => Some(request.to_wire(&config.spill_dir()?)?),
                None => None,
            }
        }
        Phase::Response => {
            let response = HttpResponse::from_wire(message)?;
            debug!(code = response.code(), "decoded response");
            match addon.on_response(&mut context, response).map_err(ScriptError::Hook)? {
                Some(response) => Some(response.to_wire(&config.spill_dir()?)?),
                None => None,
            }
        }
    };

    let Some(message) = reply else {
        debug!(%phase, "hook returned none, skipping callback");
        return Ok(Outcome::Skipped);
    };

    let callback = callback_document(phase, message, &context);
    let out = config.callback_path(path);
    fs::write(&out, callback.to_string()).map_err(|source| ScriptError::Io {
        path: out.clone(),
        source,
    })?;
    debug!(path = %out.display(), "wrote callback");
    Ok(Outcome::Written(out))
}

fn read_document(path: &Path) -> Result<Value, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ScriptError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn callback_document(phase: Phase, message: Value, context: &Context) -> Value {
    let mut callback = Map::new();
    callback.insert(phase.key().to_string(), message);
    callback.insert("shared".to_string(), context.shared().clone());
    if let Some(highlight) = context.highlight() {
        callback.insert("highlight".to_string(), Value::from(highlight.code()));
    }
    if let Some(comment) = context.changed_comment() {
        callback.insert("comment".to_string(), Value::from(comment));
    }
    Value::Object(callback)
}
