//! Scripted HTTP server for exercising HTTP clients.
//!
//! Each path is configured with a list of canned responses served in order
//! (the last one repeats). Unknown paths answer 404. A canned response can
//! also drop the connection halfway through its body. Every request is
//! recorded so tests can assert on what a client actually sent.

use std::{collections::HashMap, io, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{oneshot, RwLock},
};
use tracing::{debug, warn};

/// Chunk written before a dropped connection is aborted.
const PARTIAL_BODY: &[u8] = b"{\"partial\":";

/// Pause between the pieces of a dropped response so the status line and
/// the partial chunk reach the client before the abort.
const DROP_DELAY: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub responses: Vec<CannedResponse>,
}

impl Route {
    pub fn new(responses: impl IntoIterator<Item = CannedResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedResponse {
    pub status: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub drop_connection: bool,
}

impl CannedResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: Vec::new(),
            drop_connection: false,
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send the status and headers, then abort the connection mid-body.
    pub fn dropped(mut self) -> Self {
        self.drop_connection = true;
        self
    }
}

/// A request as seen by the server. Header names are lowercase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
struct RouteState {
    responses: Vec<CannedResponse>,
    served: usize,
}

impl RouteState {
    fn next(&mut self) -> Option<CannedResponse> {
        let index = self.served.min(self.responses.len().checked_sub(1)?);
        self.served += 1;
        self.responses.get(index).cloned()
    }
}

#[derive(Debug, Default)]
pub struct ServerState {
    routes: HashMap<String, RouteState>,
    received: Vec<RecordedRequest>,
}

impl ServerState {
    fn new(routes: HashMap<String, Route>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, route)| {
                let state = RouteState {
                    responses: route.responses,
                    served: 0,
                };
                (path, state)
            })
            .collect();
        Self {
            routes,
            received: Vec::new(),
        }
    }
}

pub type Shared = Arc<RwLock<ServerState>>;

pub fn app(routes: HashMap<String, Route>) -> Router {
    router(Arc::new(RwLock::new(ServerState::new(routes))))
}

fn router(state: Shared) -> Router {
    Router::new().fallback(respond).with_state(state)
}

pub async fn run(listener: TcpListener, routes: HashMap<String, Route>) -> Result<(), io::Error> {
    axum::serve(listener, app(routes)).await
}

async fn respond(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let canned = {
        let mut state = state.write().await;
        state.received.push(RecordedRequest {
            method: method.to_string(),
            path: path.clone(),
            headers: headers
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|value| (name.to_string(), value.to_string()))
                })
                .collect(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        state.routes.get_mut(&path).and_then(RouteState::next)
    };

    match canned {
        Some(canned) => {
            debug!(%method, %path, status = canned.status, dropped = canned.drop_connection, "serving canned response");
            render(canned)
        }
        None => {
            debug!(%method, %path, "no canned response configured");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn render(canned: CannedResponse) -> Response {
    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = if canned.drop_connection {
        dropped_body()
    } else {
        Body::from(canned.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    for (name, value) in canned.headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            warn!(%name, "skipping invalid canned header");
            continue;
        };
        response.headers_mut().append(name, value);
    }
    response
}

/// A body that yields one partial chunk and then fails, which makes hyper
/// abort the connection without finishing the chunked encoding.
fn dropped_body() -> Body {
    let pieces = [
        Ok(Bytes::from_static(PARTIAL_BODY)),
        Err(io::Error::new(io::ErrorKind::ConnectionAborted, "connection dropped")),
    ];
    let chunks = stream::iter(pieces).then(|piece| async move {
        tokio::time::sleep(DROP_DELAY).await;
        piece
    });
    Body::from_stream(chunks)
}

/// A server running on its own thread, bound to a random local port.
///
/// Shut down when dropped.
pub struct MockServer {
    addr: SocketAddr,
    state: Shared,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    pub fn start(routes: HashMap<String, Route>) -> Result<Self, io::Error> {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let state: Shared = Arc::new(RwLock::new(ServerState::new(routes)));
        let app = router(Arc::clone(&state));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        std::thread::spawn(move || {
            let result = rt.block_on(async move {
                let listener = TcpListener::from_std(std_listener)?;
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
            });
            if let Err(err) = result {
                warn!(%err, "mock server stopped with an error");
            }
        });

        debug!(%addr, "mock server started");
        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far. Must not be called from async code.
    pub fn received(&self) -> Vec<RecordedRequest> {
        self.state.blocking_read().received.clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Runtime settings for the `mock-server` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub routes_file: Option<String>,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 3000;

    /// Read `PORT` and `ROUTES` from the environment.
    pub fn from_env() -> Result<Self, io::Error> {
        Self::from_vars(std::env::var("PORT").ok(), std::env::var("ROUTES").ok())
    }

    fn from_vars(port: Option<String>, routes_file: Option<String>) -> Result<Self, io::Error> {
        let port = match port {
            Some(port) => port
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid PORT `{port}`: {e}")))?,
            None => Self::DEFAULT_PORT,
        };
        Ok(Self { port, routes_file })
    }

    /// Load the routes file, or no routes when none is configured.
    pub fn load_routes(&self) -> Result<HashMap<String, Route>, io::Error> {
        let Some(path) = &self.routes_file else {
            return Ok(HashMap::new());
        };
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
