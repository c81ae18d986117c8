//! Session metadata handed to every hook.
//!
//! # Design
//! Everything the host reports about the connection and session is
//! read-only. Three things are writable: the opaque `shared` value, which is
//! echoed in the callback document so the host can hand it to the response
//! phase of the same exchange; and the highlight color and comment, which
//! are only echoed when a hook changed them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ModelError;

/// The application that issued the request, when the host could tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl App {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bundle id, package name or similar.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Install path of the application.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// Row highlight colors understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    None = 0,
    Red = 1,
    Yellow = 2,
    Green = 3,
    Blue = 4,
    Teal = 5,
    Strikethrough = 6,
}

impl Highlight {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Metadata about the exchange being processed.
#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    url: String,
    scheme: String,
    host: String,
    port: u16,
    cid: i64,
    ctime: i64,
    sid: i64,
    stime: i64,
    #[serde(default)]
    env: Option<Map<String, Value>>,
    #[serde(default)]
    app: Option<App>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    shared: Value,
    #[serde(skip)]
    highlight: Option<Highlight>,
    #[serde(skip)]
    comment_changed: bool,
}

impl Context {
    /// Decode the `context` object of a host document.
    pub fn from_wire(value: &Value) -> Result<Self, ModelError> {
        Ok(Self::deserialize(value)?)
    }

    /// Full request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// TCP connection id.
    pub fn cid(&self) -> i64 {
        self.cid
    }

    /// Connection timestamp.
    pub fn ctime(&self) -> i64 {
        self.ctime
    }

    /// HTTP session id.
    pub fn sid(&self) -> i64 {
        self.sid
    }

    /// Session timestamp.
    pub fn stime(&self) -> i64 {
        self.stime
    }

    /// Unique id of the exchange: `{ctime}-{cid}-{sid}`.
    pub fn uid(&self) -> String {
        format!("{}-{}-{}", self.ctime, self.cid, self.sid)
    }

    pub fn env(&self) -> Option<&Map<String, Value>> {
        self.env.as_ref()
    }

    /// A single environment variable, if present and a string.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.as_ref()?.get(name)?.as_str()
    }

    pub fn app(&self) -> Option<&App> {
        self.app.as_ref()
    }

    pub fn highlight(&self) -> Option<Highlight> {
        self.highlight
    }

    pub fn set_highlight(&mut self, highlight: Highlight) {
        self.highlight = Some(highlight);
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
        self.comment_changed = true;
    }

    /// The value shared between the request and response phases.
    pub fn shared(&self) -> &Value {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut Value {
        &mut self.shared
    }

    pub fn set_shared(&mut self, shared: impl Into<Value>) {
        self.shared = shared.into();
    }

    /// The comment, only when a hook changed it.
    pub(crate) fn changed_comment(&self) -> Option<&str> {
        self.comment.as_deref().filter(|_| self.comment_changed)
    }

    /// Every field, rendered as one JSON object.
    pub fn to_json(&self) -> String {
        json!({
            "url": self.url,
            "scheme": self.scheme,
            "host": self.host,
            "port": self.port,
            "cid": self.cid,
            "ctime": self.ctime,
            "sid": self.sid,
            "stime": self.stime,
            "env": self.env,
            "app": self.app,
            "shared": self.shared,
            "highlight": self.highlight.map(Highlight::code),
            "comment": self.comment,
        })
        .to_string()
    }
}
