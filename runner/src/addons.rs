//! The hooks this runner executes. Edit this file.
//!
//! `on_request` sees every request before the proxy forwards it;
//! `on_response` sees every response before the proxy returns it to the
//! client. Return the message (changed or not) to report it back, or
//! `Ok(None)` to leave the exchange exactly as the proxy has it. Returning
//! an error fails the invocation and nothing is reported.
//!
//! Useful entry points:
//! - `context.url()`, `context.env_var(..)`, `context.app()`,
//!   `context.set_shared(..)` to carry a value into the response phase,
//!   `context.set_highlight(..)` and `context.set_comment(..)`.
//! - `request.set_method(..)`, `request.set_path(..)`,
//!   `request.queries_mut()`, `request.headers_mut()`,
//!   `request.trailers_mut()`.
//! - `response.set_code(..)` plus the same header and trailer accessors.
//! - `body_mut()`: `jsonify()` then `get`/`set` for JSON payloads,
//!   `text(..)`, `binary(..)`, `file(..)`, `multiparts(..)` to replace it.

use capture_core::{Addon, Context, HttpRequest, HttpResponse};

#[derive(Debug, Default)]
pub struct Addons;

impl Addon for Addons {
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
