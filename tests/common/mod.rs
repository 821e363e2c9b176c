//! A small mock of the Jupyter contents API, served by axum on a random
//! local port.
//!
//! Routes:
//!
//! - `GET /api/contents/{path}`: stored model, or 404 with a `message`
//! - `PUT /api/contents/{path}`: store the body, answer with the model
//!   minus its content
//! - `GET /api/contents/broken`: always 500 with a plain-text body
//!
//! When a token is configured, requests without `Authorization: token <t>`
//! get a 403.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Inner {
    models: HashMap<String, Value>,
    token: Option<String>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct MockJupyter {
    inner: Arc<Mutex<Inner>>,
}

impl MockJupyter {
    pub fn with_token(token: &str) -> Self {
        let mock = Self::default();
        mock.inner.lock().unwrap().token = Some(token.to_string());
        mock
    }

    /// Seed `path` with a model of the given `type`.
    pub fn insert(&self, path: &str, kind: &str, content: Value) {
        let name = path.rsplit('/').next().unwrap_or(path);
        let format = if kind == "notebook" { "json" } else { "text" };
        let model = json!({
            "name": name,
            "path": path,
            "type": kind,
            "format": format,
            "mimetype": if kind == "file" { Value::from("text/plain") } else { Value::Null },
            "last_modified": "2024-01-02T03:04:05Z",
            "content": content,
        });
        self.inner
            .lock()
            .unwrap()
            .models
            .insert(path.to_string(), model);
    }

    pub fn model(&self, path: &str) -> Option<Value> {
        self.inner.lock().unwrap().models.get(path).cloned()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Bind to a random port and serve until the runtime shuts down.
    pub async fn serve(&self) -> SocketAddr {
        let app = Router::new()
            .route("/api/contents/{*path}", get(get_contents).put(put_contents))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn record(&self, recorded: Recorded) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let allowed = match &inner.token {
            Some(token) => recorded.authorization.as_deref() == Some(&format!("token {}", token)),
            None => true,
        };
        inner.requests.push(recorded);
        allowed
    }
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "message": "Forbidden" }))).into_response()
}

async fn get_contents(
    State(mock): State<MockJupyter>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let allowed = mock.record(Recorded {
        method: "GET",
        path: path.clone(),
        query: query.clone(),
        authorization: authorization(&headers),
        body: None,
    });
    if !allowed {
        return forbidden();
    }
    if path == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "kaboom").into_response();
    }

    match mock.model(&path) {
        Some(mut model) => {
            if query.get("content").map(String::as_str) == Some("0") {
                model["content"] = Value::Null;
            }
            (StatusCode::OK, Json(model)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("No such file or directory: {}", path) })),
        )
            .into_response(),
    }
}

async fn put_contents(
    State(mock): State<MockJupyter>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let allowed = mock.record(Recorded {
        method: "PUT",
        path: path.clone(),
        query: HashMap::new(),
        authorization: authorization(&headers),
        body: Some(body.clone()),
    });
    if !allowed {
        return forbidden();
    }

    let kind = body["type"].as_str().unwrap_or("file").to_string();
    mock.insert(&path, &kind, body["content"].clone());
    let mut ack = mock.model(&path).unwrap();
    ack["content"] = Value::Null;
    (StatusCode::CREATED, Json(ack)).into_response()
}
