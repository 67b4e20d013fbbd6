//! In-process webtarot backend on an ephemeral port
//!
//! Interpretation replies are scripted per id (the last reply repeats), and the
//! notify WebSocket plays a scripted sequence after the client subscribes.
//! Every HTTP request, subscription and close frame is recorded.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use webtarot_common::InterpretationResult;

pub const NEW_READING_ID: &str = "7d0f6a52-3c1e-4b8e-9f7a-2e5d4c3b2a10";
pub const ACCESS_TOKEN: &str = "tok_5f2c9a7e1b3d4f6a8c0e2b4d6f8a0c2e4b6d8f0a";

#[derive(Debug, Clone)]
pub enum Reply {
    Result(InterpretationResult),
    Json(StatusCode, Value),
    Text(StatusCode, &'static str),
}

impl Reply {
    pub fn pending() -> Self {
        Reply::Result(InterpretationResult {
            done: false,
            interpretation: "Will I get the job?".to_string(),
            ..Default::default()
        })
    }

    pub fn done(text: &str) -> Self {
        Reply::Result(InterpretationResult {
            done: true,
            interpretation: text.to_string(),
            ..Default::default()
        })
    }
}

/// What the notify socket does after the subscribe arrives
#[derive(Debug, Clone)]
pub enum PushStep {
    Send(String),
    Binary(Vec<u8>),
    Pause(Duration),
    /// Server-initiated close
    Close,
}

impl PushStep {
    pub fn done(id: &str) -> Self {
        PushStep::Send(format!(r#"{{"done":{{"uuid":"{}"}}}}"#, id))
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub query: Option<String>,
    pub user_uuid: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct BackendState {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    push_steps: Mutex<Vec<PushStep>>,
    requests: Mutex<Vec<RecordedRequest>>,
    subscriptions: Mutex<Vec<(Option<String>, String)>>,
    closes: AtomicUsize,
    connections: AtomicUsize,
}

impl BackendState {
    fn record(
        &self,
        method: &'static str,
        path: String,
        query: Option<String>,
        headers: &HeaderMap,
        body: Option<Value>,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path,
            query,
            user_uuid: header("x-user-uuid"),
            authorization: header("authorization"),
            body,
        });
    }

    fn next_reply(&self, id: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/v1/reading", post(create_reading))
            .route("/api/v1/interpretation/history", get(history))
            .route("/api/v1/interpretation/notify", get(notify))
            .route(
                "/api/v1/interpretation/:id",
                get(get_interpretation).delete(delete_interpretation),
            )
            .route("/api/v1/stats", get(stats))
            .route("/api/v1/login", post(log_in))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }

    /// Replies for `GET /api/v1/interpretation/{id}`; unscripted ids get a 404 not-found
    pub fn script(&self, id: &str, replies: Vec<Reply>) {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(id.to_string(), replies.into());
    }

    pub fn push(&self, steps: Vec<PushStep>) {
        *self.state.push_steps.lock().unwrap() = steps;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn gets(&self, id: &str) -> usize {
        let path = format!("/api/v1/interpretation/{}", id);
        self.requests()
            .iter()
            .filter(|r| r.method == "GET" && r.path == path)
            .count()
    }

    /// `(subprotocol header, subscribe text)` per connection
    pub fn subscriptions(&self) -> Vec<(Option<String>, String)> {
        self.state.subscriptions.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn get_interpretation(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "GET",
        format!("/api/v1/interpretation/{}", id),
        None,
        &headers,
        None,
    );
    match state.next_reply(&id) {
        Some(Reply::Result(result)) => Json(result).into_response(),
        Some(Reply::Json(status, body)) => (status, Json(body)).into_response(),
        Some(Reply::Text(status, body)) => (status, body).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(InterpretationResult::not_found()),
        )
            .into_response(),
    }
}

async fn delete_interpretation(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    state.record(
        "DELETE",
        format!("/api/v1/interpretation/{}", id),
        None,
        &headers,
        None,
    );
    StatusCode::NO_CONTENT
}

async fn create_reading(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record("POST", "/api/v1/reading".to_string(), None, &headers, Some(body));
    Json(json!({
        "shuffledTimes": 7,
        "cards": [
            {"arcana": {"major": {"name": "tower"}}, "flipped": false},
            {"arcana": {"minor": {"rank": "ace", "suit": "cups"}}, "flipped": true}
        ],
        "interpretationId": NEW_READING_ID
    }))
}

async fn history(
    State(state): State<Arc<BackendState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Json<Value> {
    state.record(
        "GET",
        "/api/v1/interpretation/history".to_string(),
        query,
        &headers,
        None,
    );
    Json(json!([
        {"Pending": reading_json("0b7e8c1d-2f3a-4b5c-8d9e-0f1a2b3c4d5e", "Is it a good time to move?")},
        {"Done": [
            reading_json("1c8f9d2e-3a4b-4c6d-9e0f-1a2b3c4d5e6f", "Will I get the job?"),
            "The Tower speaks of sudden change.",
            "2025-01-02T03:05:00"
        ]}
    ]))
}

async fn stats(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Json<Value> {
    state.record("GET", "/api/v1/stats".to_string(), None, &headers, None);
    Json(json!({
        "totalReadings": 2,
        "totalCardsDrawn": 6,
        "arcanaStats": [
            {
                "arcana": {"major": {"name": "tower"}},
                "drawnFlippedCount": 1,
                "drawnCount": 2,
                "totalCount": 2,
                "percentFlipped": 50.0,
                "percentDrawn": 33.3,
                "percentTotal": 33.3
            }
        ],
        "neverDrawn": [{"major": {"name": "fool"}}]
    }))
}

async fn log_in(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let password_ok = body.get("password").and_then(Value::as_str) == Some("correct horse");
    state.record("POST", "/api/v1/login".to_string(), None, &headers, Some(body));
    if !password_ok {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid email or password"})),
        )
            .into_response();
    }
    Json(json!({
        "accessToken": ACCESS_TOKEN,
        "user": {
            "authenticated": {
                "id": "6f1c2b5e-8a3d-4c7f-9e21-0b4a5d6c7e8f",
                "createdAt": "2025-01-01T00:00:00",
                "updatedAt": "2025-01-01T00:00:00",
                "email": "alice@example.com",
                "name": "Alice",
                "selfDescription": "",
                "accessToken": {
                    "id": 3,
                    "createdAt": "2025-01-01T00:00:00",
                    "lastUserIp": "127.0.0.1",
                    "lastUserAgent": "webtarot"
                }
            }
        }
    }))
    .into_response()
}

async fn notify(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<BackendState>>,
) -> Response {
    let protocol = headers
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.connections.fetch_add(1, Ordering::SeqCst);

    let ws = match &protocol {
        Some(protocol) => ws.protocols([protocol.clone()]),
        None => ws,
    };
    ws.on_upgrade(move |socket| serve_notify(socket, state, protocol))
}

async fn serve_notify(mut socket: WebSocket, state: Arc<BackendState>, protocol: Option<String>) {
    let subscribe = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Close(_))) => {
                state.closes.fetch_add(1, Ordering::SeqCst);
                return;
            }
            Some(Ok(_)) => continue,
            _ => return,
        }
    };
    state
        .subscriptions
        .lock()
        .unwrap()
        .push((protocol, subscribe));

    let steps = state.push_steps.lock().unwrap().clone();
    for step in steps {
        match step {
            PushStep::Send(text) => {
                if socket.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            PushStep::Binary(bytes) => {
                if socket.send(Message::Binary(bytes)).await.is_err() {
                    return;
                }
            }
            PushStep::Pause(duration) => tokio::time::sleep(duration).await,
            PushStep::Close => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        }
    }

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Close(_)) => {
                state.closes.fetch_add(1, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
}

fn reading_json(id: &str, question: &str) -> Value {
    json!({
        "id": id,
        "createdAt": "2025-01-02T03:04:05Z",
        "question": question,
        "shuffledTimes": 3,
        "cards": [{"arcana": {"major": {"name": "tower"}}, "flipped": false}],
        "userId": null
    })
}
