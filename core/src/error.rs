//! Error types for the capture data model and the exchange driver.
//!
//! # Design
//! `ModelError` covers everything a hook can trip over while mutating a
//! message: rejected setter values, body operations attempted on the wrong
//! variant, and malformed wire documents. `ScriptError` wraps those together
//! with the I/O and hook failures of one driver invocation. Every error is
//! terminal to the invocation; nothing here is retried.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data model (collections, bodies, messages).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request method must be a non-empty string")]
    EmptyMethod,

    #[error("request path must be a non-empty string")]
    EmptyPath,

    #[error("response code must be an integer between 100 and 600, got {0}")]
    StatusOutOfRange(u16),

    /// Bulk-replace input of a shape the collection cannot take.
    #[error("unsupported {0} data type")]
    UnsupportedShape(&'static str),

    /// Keyed access on a text body that is still raw text.
    #[error("text body is not jsonified, call `jsonify()` before operating on json content")]
    NotJsonified,

    /// Keyed/indexed access or a text-only operation on the wrong variant.
    #[error("{operation} is not supported on a {kind} body")]
    UnsupportedAccess {
        operation: &'static str,
        kind: &'static str,
    },

    #[error("jsonified body is not a json object")]
    NotJsonObject,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("writing a multipart body to a file is not supported")]
    MultipartWrite,

    #[error("unknown body type {0}")]
    UnknownBodyType(u64),

    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A wire document has the wrong structure.
    #[error("malformed {0}")]
    Malformed(&'static str),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by one driver invocation.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("unexpected phase `{0}`, expected `request` or `response`")]
    UnexpectedPhase(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: invalid json document: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The user hook failed; no callback file is written.
    #[error("hook failed: {0:#}")]
    Hook(anyhow::Error),
}
