//! The request pipeline shared by every operation.
//!
//! # Design
//! POST-json, GET-json and GET-plain run the same steps: validate and build
//! the request, send it, classify the status, read the body, then hand the
//! bytes to a sink (JSON decode or UTF-8 text). The destination is written
//! only once the sink succeeds, so every failure leaves it untouched.

use std::io::{self, Read};

use ::http::{HeaderName, HeaderValue, Uri};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::http::{HttpClient, HttpMethod, HttpRequest};
use crate::types::{GetRequest, PostRequest, Request};

/// Reserved status that fails with `Error::NotImplemented` unless a handler
/// claims it.
pub const NOT_IMPLEMENTED: u16 = 501;

/// Sends descriptors through a client and decodes the responses.
///
/// Holds nothing but the client; it can be created per call or kept around
/// and shared if the client allows it.
#[derive(Debug, Clone)]
pub struct RequestExecutor<C> {
    client: C,
}

impl<C: HttpClient> RequestExecutor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// POST `req.payload` and decode a JSON response into `result`.
    pub fn post_json<T: DeserializeOwned>(&self, req: &PostRequest, result: &mut T) -> Result<(), Error> {
        run(&self.client, &req.base, HttpMethod::Post, Some(&req.payload), decode_json, result)
    }

    /// GET and decode a JSON response into `result`.
    pub fn get_json<T: DeserializeOwned>(&self, req: &GetRequest, result: &mut T) -> Result<(), Error> {
        run(&self.client, &req.base, HttpMethod::Get, None, decode_json, result)
    }

    /// GET and copy the response body into `result` as text.
    pub fn get_plain(&self, req: &GetRequest, result: &mut String) -> Result<(), Error> {
        run(&self.client, &req.base, HttpMethod::Get, None, decode_text, result)
    }
}

impl PostRequest {
    /// Send this request through `client`; see [`RequestExecutor::post_json`].
    pub fn post<C, T>(&self, client: &C, result: &mut T) -> Result<(), Error>
    where
        C: HttpClient + ?Sized,
        T: DeserializeOwned,
    {
        RequestExecutor::new(client).post_json(self, result)
    }
}

impl GetRequest {
    /// Send this request through `client`; see [`RequestExecutor::get_json`].
    pub fn get<C, T>(&self, client: &C, result: &mut T) -> Result<(), Error>
    where
        C: HttpClient + ?Sized,
        T: DeserializeOwned,
    {
        RequestExecutor::new(client).get_json(self, result)
    }

    /// Send this request through `client`; see [`RequestExecutor::get_plain`].
    pub fn get_plain<C>(&self, client: &C, result: &mut String) -> Result<(), Error>
    where
        C: HttpClient + ?Sized,
    {
        RequestExecutor::new(client).get_plain(self, result)
    }
}

/// Run one round trip and store what `sink` makes of the body in `result`.
/// `result` is only written when the sink succeeds.
fn run<C, T>(
    client: &C,
    req: &Request,
    method: HttpMethod,
    payload: Option<&str>,
    sink: impl FnOnce(Vec<u8>) -> Result<T, Error>,
    result: &mut T,
) -> Result<(), Error>
where
    C: HttpClient + ?Sized,
{
    if let Some(body) = execute(client, req, method, payload)? {
        *result = sink(body)?;
    }
    Ok(())
}

/// Run one round trip and return the body bytes, or `None` when a status
/// handler accepted the response.
fn execute<C: HttpClient + ?Sized>(
    client: &C,
    req: &Request,
    method: HttpMethod,
    payload: Option<&str>,
) -> Result<Option<Vec<u8>>, Error> {
    let request = build_request(req, method, payload)?;
    debug!(method = %request.method, url = %request.url, "sending request");

    // The response owns the body reader; it is dropped on every return below.
    let mut response = client.send(request).map_err(Error::Transport)?;
    let status = response.status;
    debug!(status, "received response");

    if let Some(handler) = req.status_handlers.get(&status) {
        debug!(status, "status handler takes over");
        return handler().map(|()| None).map_err(Error::Handled);
    }
    if status == NOT_IMPLEMENTED {
        return Err(Error::NotImplemented);
    }
    if status != req.ok_status_code {
        return Err(Error::UnexpectedStatus(status));
    }

    let mut body = Vec::new();
    response.body.read_to_end(&mut body).map_err(Error::BodyRead)?;
    Ok(Some(body))
}

fn build_request(req: &Request, method: HttpMethod, payload: Option<&str>) -> Result<HttpRequest, Error> {
    validate_endpoint(&req.endpoint)?;

    let mut headers = Vec::with_capacity(req.headers.len());
    for (name, value) in &req.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidRequest(format!("invalid header name `{name}`")))?;
        HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidRequest(format!("invalid value for header `{name}`")))?;
        headers.push((name.clone(), value.clone()));
    }

    Ok(HttpRequest {
        method,
        url: req.endpoint.clone(),
        headers,
        body: payload.map(str::to_string),
    })
}

fn validate_endpoint(endpoint: &str) -> Result<(), Error> {
    let uri: Uri = endpoint
        .parse()
        .map_err(|e| Error::InvalidRequest(format!("invalid endpoint `{endpoint}`: {e}")))?;
    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(Error::InvalidRequest(format!(
            "invalid endpoint `{endpoint}`: expected an absolute URL"
        )));
    }
    Ok(())
}

fn decode_json<T: DeserializeOwned>(body: Vec<u8>) -> Result<T, Error> {
    serde_json::from_slice(&body).map_err(Error::Decode)
}

fn decode_text(body: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(body).map_err(|e| Error::BodyRead(io::Error::new(io::ErrorKind::InvalidData, e)))
}
