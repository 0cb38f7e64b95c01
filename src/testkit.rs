//! In-process stub agent for tests.

use crate::model::{AgentConfig, Contract, PageContext};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
pub(crate) struct StubState {
    hits: Mutex<HashMap<String, usize>>,
    status_reply: Mutex<Option<(StatusCode, Value)>>,
    save_reply: Mutex<Option<(StatusCode, Value)>>,
    search_reply: Mutex<Option<(StatusCode, Value)>>,
    last_body: Mutex<Option<Value>>,
    delay: Mutex<Duration>,
}

pub(crate) struct StubAgent {
    pub base_url: String,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for StubAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl StubAgent {
    /// Serve an arbitrary router, counting hits per path.
    pub async fn spawn(router: Router) -> Self {
        Self::serve(router, Arc::new(StubState::default())).await
    }

    pub async fn desktop() -> Self {
        let state = Arc::new(StubState::default());
        *state.status_reply.lock().unwrap() = Some((
            StatusCode::OK,
            json!({"agent": "running", "ready": true, "message": "Ready for operations"}),
        ));
        let router = Router::new()
            .route("/api/status", get(status))
            .route("/api/kinic/save", post(save))
            .route("/api/kinic/search-extract", post(search))
            .with_state(state.clone());
        Self::serve(router, state).await
    }

    pub async fn simple() -> Self {
        let state = Arc::new(StubState::default());
        *state.status_reply.lock().unwrap() =
            Some((StatusCode::OK, json!({"service": "Kinic API", "status": "running"})));
        let router = Router::new()
            .route("/", get(status))
            .route("/save", post(save))
            .route("/search-ai-extract", post(search))
            .with_state(state.clone());
        Self::serve(router, state).await
    }

    async fn serve(router: Router, state: Arc<StubState>) -> Self {
        let router = router.layer(middleware::from_fn_with_state(state.clone(), count_hits));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    /// Stop listening and close kept-alive connections, as if the agent process exited.
    pub async fn shut_down(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(2), &mut self.task).await;
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }

    /// Poll until `path` has been hit `n` times.
    pub async fn wait_for_hits(&self, path: &str, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.hits(path) < n {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {n} hit(s) on {path}"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn set_status_reply(&self, code: StatusCode, body: Value) {
        *self.state.status_reply.lock().unwrap() = Some((code, body));
    }

    pub fn set_save_reply(&self, code: StatusCode, body: Value) {
        *self.state.save_reply.lock().unwrap() = Some((code, body));
    }

    pub fn set_search_reply(&self, code: StatusCode, body: Value) {
        *self.state.search_reply.lock().unwrap() = Some((code, body));
    }

    /// Hold every operation reply for `d` before answering.
    pub fn set_delay(&self, d: Duration) {
        *self.state.delay.lock().unwrap() = d;
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().unwrap().clone()
    }
}

async fn count_hits(State(state): State<Arc<StubState>>, req: Request, next: Next) -> Response {
    *state
        .hits
        .lock()
        .unwrap()
        .entry(req.uri().path().to_string())
        .or_default() += 1;
    next.run(req).await
}

async fn status(State(state): State<Arc<StubState>>) -> (StatusCode, Json<Value>) {
    let (code, body) = state
        .status_reply
        .lock()
        .unwrap()
        .clone()
        .unwrap_or((StatusCode::OK, json!({})));
    (code, Json(body))
}

async fn save(State(state): State<Arc<StubState>>, body: Bytes) -> (StatusCode, Json<Value>) {
    let reply = state.save_reply.lock().unwrap().clone();
    answer(&state, body, reply, json!({"success": true, "message": "Page saved to Kinic memory"}))
        .await
}

async fn search(State(state): State<Arc<StubState>>, body: Bytes) -> (StatusCode, Json<Value>) {
    let reply = state.search_reply.lock().unwrap().clone();
    answer(&state, body, reply, json!({"success": true, "operation_id": "op-1", "ai_response": "stub answer"}))
        .await
}

async fn answer(
    state: &StubState,
    body: Bytes,
    reply: Option<(StatusCode, Value)>,
    fallback: Value,
) -> (StatusCode, Json<Value>) {
    *state.last_body.lock().unwrap() = serde_json::from_slice(&body).ok();
    let delay = *state.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let (code, body) = reply.unwrap_or((StatusCode::OK, fallback));
    (code, Json(body))
}

pub(crate) fn config(base_url: &str, contract: Contract) -> AgentConfig {
    AgentConfig {
        base_url: base_url.to_string(),
        contract,
        poll_interval: Duration::from_millis(50),
        probe_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(5),
        user_agent: "kinic-console-test".to_string(),
        page: PageContext::new(
            "https://example.com/article".into(),
            "Example".into(),
            "Body text".into(),
        ),
    }
}

/// A base URL nothing listens on.
pub(crate) async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
