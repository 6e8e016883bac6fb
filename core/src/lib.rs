//! Single-call HTTP helpers with status policies and JSON decoding.
//!
//! # Overview
//! A caller describes one request (endpoint, headers, per-status handlers,
//! success code), passes it with an `HttpClient` and a destination, and gets
//! back `Ok(())` with the destination filled in or a typed `Error`.
//!
//! # Design
//! - The executor never touches the network; `HttpClient` does. `ureq::Agent`
//!   implements it out of the box (see [`agent()`]).
//! - One pipeline serves POST-json, GET-json and GET-plain. Status checks run
//!   in a fixed order: registered handler, then 501, then the success code.
//! - Exactly one attempt per call. Retries, timeouts and pooling belong to
//!   the client.
//!
//! ```no_run
//! use rapi::{GetRequest, Request};
//!
//! #[derive(serde::Deserialize, Default)]
//! struct Item {
//!     id: String,
//! }
//!
//! let req = GetRequest::new(
//!     Request::new("http://localhost:3000/items/0")
//!         .header("Accept", "application/json")
//!         .on_status(404, || Err("no such item".into())),
//! );
//! let mut item = Item::default();
//! req.get(&rapi::agent(), &mut item)?;
//! # Ok::<(), rapi::Error>(())
//! ```

pub mod agent;
pub mod error;
pub mod executor;
pub mod http;
pub mod types;

pub use agent::agent;
pub use error::Error;
pub use executor::{RequestExecutor, NOT_IMPLEMENTED};
pub use http::{BoxError, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use types::{GetRequest, PostRequest, Request, StatusHandler, DEFAULT_OK_STATUS};
