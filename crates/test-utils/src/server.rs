//! Local HTTP fixture server for client tests.
//!
//! Serves canned bodies on `127.0.0.1:0` so that fetch, retry, timeout and
//! status handling can be tested without external network.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A canned response for one path.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub status: u16,
    pub body: String,
    /// Delay before responding
    pub delay: Option<Duration>,
    /// Answer the first N requests with 503 before serving `body`
    pub fail_first: usize,
}

impl Fixture {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
            fail_first: 0,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: None,
            fail_first: 0,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_first(mut self, count: usize) -> Self {
        self.fail_first = count;
        self
    }
}

#[derive(Default)]
struct ServerState {
    routes: HashMap<String, Fixture>,
    hits: Mutex<HashMap<String, usize>>,
    queries: Mutex<Vec<String>>,
}

/// A running fixture server. Lives until the test runtime shuts down.
pub struct FixtureServer {
    base_url: String,
    state: Arc<ServerState>,
}

impl FixtureServer {
    /// Bind to an ephemeral port and start serving.
    ///
    /// Paths are matched exactly; query strings are recorded but ignored
    /// for routing. Unknown paths answer 404.
    pub async fn start<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = (S, Fixture)>,
        S: Into<String>,
    {
        let state = Arc::new(ServerState {
            routes: routes.into_iter().map(|(p, f)| (p.into(), f)).collect(),
            ..Default::default()
        });

        let app = Router::new()
            .fallback(respond)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fixture server");
        let addr = listener
            .local_addr()
            .expect("Fixture server has no local address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fixture server failed");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .expect("hits lock poisoned")
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Query strings seen so far, in arrival order.
    pub fn queries(&self) -> Vec<String> {
        self.state
            .queries
            .lock()
            .expect("queries lock poisoned")
            .clone()
    }
}

async fn respond(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let hit = {
        let mut hits = state.hits.lock().expect("hits lock poisoned");
        let count = hits.entry(path.clone()).or_insert(0);
        *count += 1;
        *count
    };
    if let Some(query) = uri.query() {
        state
            .queries
            .lock()
            .expect("queries lock poisoned")
            .push(query.to_string());
    }

    let Some(fixture) = state.routes.get(&path).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(delay) = fixture.delay {
        tokio::time::sleep(delay).await;
    }
    if hit <= fixture.fail_first {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let status = StatusCode::from_u16(fixture.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, fixture.body).into_response()
}
