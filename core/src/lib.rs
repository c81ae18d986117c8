//! Data model and driver for HTTP capture hooks.
//!
//! # Overview
//! A debugging proxy captures an HTTP exchange, writes it to a JSON file and
//! runs a hook script against it. This crate decodes that file into typed
//! values (`Context`, `HttpRequest`, `HttpResponse`), lets user code mutate
//! them through an [`Addon`], and writes the result back as a callback file
//! the proxy picks up. The proxy does all network I/O; this side only ever
//! touches the two files (plus temp files for binary bodies).
//!
//! # Design
//! - Messages are plain owned data. Every field is private and mutated
//!   through setters, so validation (`set_method`, `set_path`, `set_code`)
//!   runs at the call site and a rejected value leaves the message as it was.
//! - Decoding (`from_wire`) and encoding (`to_wire`) are kept apart from the
//!   mutation API; only `exchange::run` touches the file system on behalf of
//!   the caller.
//! - Text bodies are either raw or parsed JSON (`TextContent`), so keyed
//!   access before `jsonify()` is an explicit error rather than a silent
//!   string lookup.

pub mod body;
pub mod context;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod multipart;
pub mod queries;
pub mod request;
pub mod response;

pub use body::{HttpBody, TextBody, TextContent};
pub use context::{App, Context, Highlight};
pub use error::{ModelError, ScriptError};
pub use exchange::{run, Addon, ExchangeConfig, Outcome, PassThrough, Phase};
pub use headers::HttpHeaders;
pub use multipart::{MultipartBody, PartBuilder};
pub use queries::HttpQueries;
pub use request::HttpRequest;
pub use response::HttpResponse;
