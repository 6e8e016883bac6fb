//! Error type for request execution.
//!
//! # Design
//! One variant per terminal failure state of a call. Errors coming from the
//! client or from a caller's status handler are passed through untouched so
//! their message reaches the caller verbatim.

use std::io;

use crate::http::BoxError;

/// Errors returned by the executor operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The descriptor could not be turned into a request (bad endpoint or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client failed to complete the round trip.
    #[error(transparent)]
    Transport(BoxError),

    /// A status handler registered for the received code returned an error.
    #[error(transparent)]
    Handled(BoxError),

    /// The server answered 501 and no handler was registered for it.
    #[error("not implemented")]
    NotImplemented,

    /// The status differs from the descriptor's success code.
    #[error("status code {0}")]
    UnexpectedStatus(u16),

    #[error("failed to read response body: {0}")]
    BodyRead(#[source] io::Error),

    #[error("failed to unmarshal JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

impl Error {
    /// The response status that caused this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotImplemented => Some(crate::executor::NOT_IMPLEMENTED),
            Error::UnexpectedStatus(status) => Some(*status),
            _ => None,
        }
    }
}
