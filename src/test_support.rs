//! In-process fake portal backend for network tests.

use crate::error::ClientResult;
use crate::speech::{SpeechEvent, SpeechRecognizer, SpeechSynthesizer};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

const API_PREFIX: &str = "/api";

#[derive(Clone)]
enum RouteBody {
    Json(Value),
    Raw(String),
}

#[derive(Clone)]
struct Route {
    status: u16,
    body: RouteBody,
}

struct BackendState {
    routes: HashMap<String, Route>,
    hits: Mutex<Vec<(String, Value)>>,
}

pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
}

pub struct FakeBackendBuilder {
    routes: HashMap<String, Route>,
}

impl FakeBackend {
    pub fn start() -> FakeBackendBuilder {
        FakeBackendBuilder {
            routes: HashMap::new(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }

    /// Paths hit so far, in arrival order.
    pub async fn hits(&self) -> Vec<String> {
        self.state
            .hits
            .lock()
            .await
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub async fn count(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .await
            .iter()
            .filter(|(hit, _)| hit == path)
            .count()
    }

    /// JSON bodies received on `path`, in arrival order.
    pub async fn bodies(&self, path: &str) -> Vec<Value> {
        self.state
            .hits
            .lock()
            .await
            .iter()
            .filter(|(hit, _)| hit == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl FakeBackendBuilder {
    pub fn respond(self, path: &str, body: Value) -> Self {
        self.route(path, 200, RouteBody::Json(body))
    }

    pub fn respond_status(self, path: &str, status: u16, body: Value) -> Self {
        self.route(path, status, RouteBody::Json(body))
    }

    pub fn respond_raw(self, path: &str, body: &str) -> Self {
        self.route(path, 500, RouteBody::Raw(body.to_string()))
    }

    fn route(mut self, path: &str, status: u16, body: RouteBody) -> Self {
        self.routes.insert(path.to_string(), Route { status, body });
        self
    }

    async fn serve(self) -> FakeBackend {
        let state = Arc::new(BackendState {
            routes: self.routes,
            hits: Mutex::new(Vec::new()),
        });

        let app = axum::Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        FakeBackend { addr, state }
    }
}

impl IntoFuture for FakeBackendBuilder {
    type Output = FakeBackend;
    type IntoFuture = Pin<Box<dyn Future<Output = FakeBackend> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.serve())
    }
}

async fn handle(State(state): State<Arc<BackendState>>, uri: Uri, body: Bytes) -> Response {
    let path = uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or(uri.path())
        .to_string();
    let body = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    state.hits.lock().await.push((path.clone(), body));

    let Some(route) = state.routes.get(&path).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("no route for {}", path)})),
        )
            .into_response();
    };

    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::OK);
    match route.body {
        RouteBody::Json(value) => (status, Json(value)).into_response(),
        RouteBody::Raw(text) => (status, [(CONTENT_TYPE, "text/html")], text).into_response(),
    }
}

/// Recognizer that replays a fixed list of events.
pub struct ScriptedRecognizer {
    events: Vec<SpeechEvent>,
}

impl ScriptedRecognizer {
    pub fn new(events: Vec<SpeechEvent>) -> Self {
        Self { events }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn listen(&self, _locale: &str) -> ClientResult<BoxStream<'static, SpeechEvent>> {
        Ok(futures::stream::iter(self.events.clone()).boxed())
    }
}

/// Synthesizer that records what it was asked to say.
#[derive(Default)]
pub struct RecordingSynthesizer {
    spoken: std::sync::Mutex<Vec<String>>,
    cancels: std::sync::atomic::AtomicUsize,
}

impl RecordingSynthesizer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl SpeechSynthesizer for RecordingSynthesizer {
    fn speak(&self, text: &str) {
        self.cancel();
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
    }

    fn cancel(&self) {
        self.cancels
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
