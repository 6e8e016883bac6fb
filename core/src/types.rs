//! Request descriptors.
//!
//! # Design
//! A descriptor is built by the caller right before a call and only borrowed
//! by the executor, so one descriptor can be reused or shared across threads.
//! Fields are public for struct-literal construction; the builder helpers
//! cover the common cases.

use std::collections::HashMap;
use std::fmt;

use crate::http::BoxError;

/// Callable invoked when its status code is received. Its result becomes the
/// outcome of the call.
pub type StatusHandler = Box<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// Status code treated as success unless the caller picks another one.
pub const DEFAULT_OK_STATUS: u16 = 200;

/// The part shared by every request: where it goes, which headers it carries
/// and how the response status is interpreted.
///
/// `Request::new` and `Default` set `ok_status_code` to [`DEFAULT_OK_STATUS`]
/// (200); any other success code must be set with [`Request::ok_status`] or
/// in a struct literal.
pub struct Request {
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub status_handlers: HashMap<u16, StatusHandler>,
    pub ok_status_code: u16,
}

impl Request {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Register `handler` for `status`. It takes precedence over every other
    /// check, the success code included.
    pub fn on_status<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.status_handlers.insert(status, Box::new(handler));
        self
    }

    pub fn ok_status(mut self, status: u16) -> Self {
        self.ok_status_code = status;
        self
    }
}

impl Default for Request {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            headers: HashMap::new(),
            status_handlers: HashMap::new(),
            ok_status_code: DEFAULT_OK_STATUS,
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handled: Vec<&u16> = self.status_handlers.keys().collect();
        handled.sort();
        f.debug_struct("Request")
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers)
            .field("status_handlers", &handled)
            .field("ok_status_code", &self.ok_status_code)
            .finish()
    }
}

/// A POST request; `payload` is sent verbatim as the body.
#[derive(Debug, Default)]
pub struct PostRequest {
    pub base: Request,
    pub payload: String,
}

impl PostRequest {
    pub fn new(base: Request, payload: impl Into<String>) -> Self {
        Self {
            base,
            payload: payload.into(),
        }
    }
}

/// A GET request.
#[derive(Debug, Default)]
pub struct GetRequest {
    pub base: Request,
}

impl GetRequest {
    pub fn new(base: Request) -> Self {
        Self { base }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_defaults_to_200() {
        let req = Request::new("http://localhost:3000/");
        assert_eq!(req.endpoint, "http://localhost:3000/");
        assert_eq!(req.ok_status_code, 200);
        assert!(req.headers.is_empty());
        assert!(req.status_handlers.is_empty());
    }

    #[test]
    fn default_and_literal_success_codes() {
        assert_eq!(Request::default().ok_status_code, DEFAULT_OK_STATUS);
        assert_eq!(GetRequest::default().base.ok_status_code, DEFAULT_OK_STATUS);

        let literal = Request {
            ok_status_code: 0,
            ..Request::new("http://localhost:3000/")
        };
        assert_eq!(literal.ok_status_code, 0);
    }

    #[test]
    fn builder_collects_headers_and_handlers() {
        let req = Request::new("http://localhost:3000/")
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .on_status(401, || Err("unauthorized".into()))
            .ok_status(201);

        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.headers["Content-Type"], "application/json");
        assert_eq!(req.ok_status_code, 201);

        let handler = &req.status_handlers[&401];
        assert_eq!(handler().unwrap_err().to_string(), "unauthorized");
    }

    #[test]
    fn later_header_replaces_earlier_one() {
        let req = Request::new("http://localhost:3000/")
            .header("Accept", "text/plain")
            .header("Accept", "application/json");
        assert_eq!(req.headers["Accept"], "application/json");
    }

    #[test]
    fn debug_lists_handled_codes() {
        let req = Request::new("http://localhost:3000/")
            .on_status(404, || Ok(()))
            .on_status(401, || Ok(()));
        let rendered = format!("{req:?}");
        assert!(rendered.contains("[401, 404]"));
    }

    #[test]
    fn post_request_keeps_payload() {
        let req = PostRequest::new(Request::new("http://localhost:3000/"), r#"{"a":1}"#);
        assert_eq!(req.payload, r#"{"a":1}"#);
        assert_eq!(req.base.ok_status_code, 200);
    }
}
