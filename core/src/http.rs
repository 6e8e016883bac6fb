//! HTTP transport types and the client seam.
//!
//! # Design
//! Requests and responses are plain data. The executor builds an
//! `HttpRequest`, hands it to an `HttpClient` and classifies the returned
//! `HttpResponse`; the client alone performs network I/O. The response body
//! stays a reader so the executor decides whether (and when) it is consumed.
//! Dropping the response releases the body.

use std::fmt;
use std::io::Read;

/// Boxed error used at the client and status-handler boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by the executor from a descriptor. Headers keep the caller's
/// spelling; `body` is `None` for requests without a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    /// Header values that are not valid UTF-8 are converted lossily.
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Read + 'static) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs the network round trip for one `HttpRequest`.
///
/// Any error returned here is a transport failure (DNS, refused connection,
/// timeout, ...). Non-success statuses must come back as `Ok` responses so
/// the executor can classify them.
pub trait HttpClient {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_renders_as_verb() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
    }

    #[test]
    fn response_debug_omits_body() {
        let response = HttpResponse::new(204, std::io::empty());
        let rendered = format!("{response:?}");
        assert!(rendered.contains("204"));
        assert!(!rendered.contains("body"));
    }
}
