//! `JupyterContentStore` against a mock contents server, plus the full
//! pipeline running over HTTP.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{base_url, MockJupyter};
use content_sync::config::ClientConfig;
use content_sync::jupyter::JupyterContentStore;
use content_sync::materialize::DiskMaterializer;
use content_sync::runtime::{ContentSync, SyncOptions};
use content_sync::stream::next_result_for;
use content_sync_core::actions::{Action, FetchContent, Save};
use content_sync_core::errors::ContentError;
use content_sync_core::models::{ContentModel, ContentRecord, ContentRef, Host, ServerConfig};
use content_sync_core::serialize::SaveModel;
use content_sync_core::state::AppState;
use content_sync_core::store::ContentStore;

fn client() -> JupyterContentStore {
    JupyterContentStore::new(&ClientConfig { timeout_secs: 5 }).unwrap()
}

fn server(addr: std::net::SocketAddr, token: Option<&str>) -> ServerConfig {
    ServerConfig {
        endpoint: base_url(addr),
        token: token.map(str::to_string),
    }
}

#[tokio::test]
async fn test_get_sends_token_and_params() {
    let mock = MockJupyter::with_token("secret");
    mock.insert("work/a.ipynb", "notebook", json!({"cells": []}));
    let addr = mock.serve().await;

    let params = BTreeMap::from([
        ("type".to_string(), "notebook".to_string()),
        ("content".to_string(), "0".to_string()),
    ]);
    let response = client()
        .get(&server(addr, Some("secret")), "/work/a.ipynb", Some(&params))
        .await
        .unwrap();

    assert!(response.is_ok());
    assert_eq!(response.response["type"], "notebook");
    assert!(response.response["content"].is_null());

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "work/a.ipynb");
    assert_eq!(requests[0].authorization.as_deref(), Some("token secret"));
    assert_eq!(requests[0].query.get("type").map(String::as_str), Some("notebook"));
}

#[tokio::test]
async fn test_get_returns_error_statuses() {
    let mock = MockJupyter::with_token("secret");
    let addr = mock.serve().await;
    let store = client();

    let missing = store
        .get(&server(addr, Some("secret")), "nope.txt", None)
        .await
        .unwrap();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.message(), "No such file or directory: nope.txt");

    let forbidden = store.get(&server(addr, None), "nope.txt", None).await.unwrap();
    assert_eq!(forbidden.status, 403);

    let broken = store
        .get(&server(addr, Some("secret")), "broken", None)
        .await
        .unwrap();
    assert_eq!(broken.status, 500);
    assert_eq!(broken.response, json!("kaboom"));
}

#[tokio::test]
async fn test_save_puts_model() {
    let mock = MockJupyter::default();
    let addr = mock.serve().await;

    let model = SaveModel {
        content: json!("hi"),
        kind: "file".into(),
        format: Some("text".into()),
    };
    let ack = client().save(&server(addr, None), "/b.txt", &model).await.unwrap();
    assert_eq!(ack["path"], "b.txt");
    assert!(ack["content"].is_null());

    let put = mock.requests().pop().unwrap();
    assert_eq!(put.method, "PUT");
    assert_eq!(
        put.body,
        Some(json!({"content": "hi", "type": "file", "format": "text"}))
    );
    assert_eq!(mock.model("b.txt").unwrap()["content"], "hi");
}

#[tokio::test]
async fn test_save_rejected_is_error() {
    let mock = MockJupyter::with_token("secret");
    let addr = mock.serve().await;

    let model = SaveModel {
        content: json!("hi"),
        kind: "file".into(),
        format: Some("text".into()),
    };
    let err = client()
        .save(&server(addr, Some("wrong")), "b.txt", &model)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("403"));
    assert!(mock.model("b.txt").is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client().get(&server(addr, None), "a.txt", None).await;
    assert!(result.is_err());
}

// ─── Pipelines over HTTP ────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_then_save_round_trip() {
    let mock = MockJupyter::with_token("secret");
    mock.insert("notes.txt", "file", json!("draft"));
    let addr = mock.serve().await;

    let tmp = tempfile::TempDir::new().unwrap();
    let host = Host::Jupyter {
        base_url: format!("{}/", base_url(addr)),
        token: Some("secret".into()),
    };
    let sync = ContentSync::start(
        AppState::new(host).with_app_version("2.0.0"),
        Arc::new(client()),
        Arc::new(DiskMaterializer::new(tmp.path())),
        SyncOptions::default(),
    );

    let r = sync.stream().open(ContentRecord::unset("notes.txt"));
    let mut rx = sync.subscribe();
    sync.dispatch(Action::FetchContent(FetchContent::new("notes.txt", r.clone())));

    let fetched = tokio::time::timeout(Duration::from_secs(5), next_result_for(&mut rx, &r))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.kind(), "FETCH_CONTENT_FULFILLED");
    let record = sync.stream().content(&r).unwrap();
    assert_eq!(
        record.model,
        ContentModel::File {
            text: "draft".into()
        }
    );
    assert!(record.last_saved.is_some());

    sync.dispatch(Action::Save(Save {
        content_ref: r.clone(),
    }));
    let saved = tokio::time::timeout(Duration::from_secs(5), next_result_for(&mut rx, &r))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.kind(), "SAVE_FULFILLED");
    assert_eq!(mock.model("notes.txt").unwrap()["content"], "draft");

    sync.shutdown().await;
}

#[tokio::test]
async fn test_fetch_forbidden_attaches_error() {
    let mock = MockJupyter::with_token("secret");
    mock.insert("notes.txt", "file", json!("draft"));
    let addr = mock.serve().await;

    let tmp = tempfile::TempDir::new().unwrap();
    let host = Host::Jupyter {
        base_url: base_url(addr),
        token: None,
    };
    let sync = ContentSync::start(
        AppState::new(host),
        Arc::new(client()),
        Arc::new(DiskMaterializer::new(tmp.path())),
        SyncOptions::default(),
    );

    let r = ContentRef::from("r");
    sync.stream()
        .open_as(r.clone(), ContentRecord::unset("notes.txt"));
    let mut rx = sync.subscribe();
    sync.dispatch(Action::FetchContent(FetchContent::new("notes.txt", r.clone())));

    let failed = tokio::time::timeout(Duration::from_secs(5), next_result_for(&mut rx, &r))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        failed.error(),
        Some(&ContentError::Status {
            status: 403,
            body: "Forbidden".into()
        })
    );
    assert!(sync.stream().content(&r).unwrap().error.is_some());

    sync.shutdown().await;
}
