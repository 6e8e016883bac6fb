//! `HttpClient` binding for `ureq`.

use ureq::http::{HeaderMap, Response};
use ureq::{Agent, Body};

use crate::http::{BoxError, HttpClient, HttpMethod, HttpRequest, HttpResponse};

/// A `ureq` agent that returns 4xx/5xx responses as data instead of errors,
/// leaving status interpretation to the executor.
pub fn agent() -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl HttpClient for Agent {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                let payload = request.body.unwrap_or_default();
                builder.send(payload.as_bytes())
            }
        };

        match result {
            Ok(response) => Ok(into_response(response)),
            // Agents built with `http_status_as_error(true)` report statuses
            // as errors; turn them back into responses so they get classified.
            Err(ureq::Error::StatusCode(status)) => Ok(HttpResponse::new(status, std::io::empty())),
            Err(err) => Err(Box::new(err)),
        }
    }
}

fn into_response(response: Response<Body>) -> HttpResponse {
    let (parts, body) = response.into_parts();
    HttpResponse {
        status: parts.status.as_u16(),
        headers: header_pairs(&parts.headers),
        body: Box::new(body.into_reader()),
    }
}

/// Values that are not valid UTF-8 are kept, with invalid bytes replaced.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ureq::http::HeaderValue;

    use super::*;

    #[test]
    fn header_pairs_keep_every_value() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.insert("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let mut pairs = header_pairs(&headers);
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("content-type".to_string(), "text/plain".to_string()),
                ("x-name".to_string(), "caf\u{fffd}".to_string()),
            ]
        );
    }
}
