// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::*;

async fn spawn(router: Router) -> anyhow::Result<Url> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(Url::parse(&format!("http://{addr}/api/"))?)
}

fn echo_router() -> Router {
    Router::new()
        .route(
            "/api/echo/",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                Json(json!({ "auth": auth, "body": body }))
            }),
        )
        .route(
            "/api/slow/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK
            }),
        )
        .route("/api/empty/", get(|| async { StatusCode::NO_CONTENT }))
}

#[test]
fn endpoint_joins_beneath_base() -> anyhow::Result<()> {
    let base = Url::parse("http://localhost:8000/api/")?;
    let client = BackendClient::new(base, Duration::from_secs(1))?;
    assert_eq!(client.endpoint("auth/login/")?.as_str(), "http://localhost:8000/api/auth/login/");
    assert_eq!(client.endpoint("/movies/3/")?.as_str(), "http://localhost:8000/api/movies/3/");
    Ok(())
}

#[tokio::test]
async fn request_sends_bearer_and_body() -> anyhow::Result<()> {
    let base = spawn(echo_router()).await?;
    let client = BackendClient::new(base, Duration::from_secs(5))?;

    let body = json!({ "title": "Alien" });
    let resp = client.request(Method::POST, "echo/", Some("A1"), Some(&body)).await?;
    assert_eq!(resp.status, 200);
    let value: Value = resp.json()?;
    assert_eq!(value["auth"], "Bearer A1");
    assert_eq!(value["body"]["title"], "Alien");
    Ok(())
}

#[tokio::test]
async fn empty_body_is_reported_as_empty() -> anyhow::Result<()> {
    let base = spawn(echo_router()).await?;
    let client = BackendClient::new(base, Duration::from_secs(5))?;

    let resp = client.request(Method::GET, "empty/", None, None).await?;
    assert_eq!(resp.status, 204);
    assert!(resp.is_empty());
    assert!(matches!(resp.json::<Value>(), Err(GatewayError::Protocol(_))));
    Ok(())
}

#[tokio::test]
async fn timeout_is_backend_unavailable() -> anyhow::Result<()> {
    let base = spawn(echo_router()).await?;
    let client = BackendClient::new(base, Duration::from_millis(100))?;

    let err = client.request(Method::GET, "slow/", None, None).await.err();
    match err {
        Some(GatewayError::BackendUnavailable(msg)) => assert!(msg.contains("timed out"), "{msg}"),
        other => anyhow::bail!("expected BackendUnavailable, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn connection_refused_is_backend_unavailable() -> anyhow::Result<()> {
    // Bind then drop to get a port nobody is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client =
        BackendClient::new(Url::parse(&format!("http://{addr}/api/"))?, Duration::from_secs(2))?;
    let err = client.post_json("auth/login/", &json!({})).await.err();
    assert!(matches!(err, Some(GatewayError::BackendUnavailable(_))), "got {err:?}");
    assert!(err.is_some_and(|e| e.is_retryable()));
    Ok(())
}

#[yare::parameterized(
    empty = { b"  ", json!({}) },
    object = { br#"{"id": 3}"#, json!({ "id": 3 }) },
    text = { b"created", json!("created") },
)]
fn relay_body_never_fails(bytes: &[u8], expected: Value) {
    let resp = RawResponse { status: 201, bytes: bytes.to_vec() };
    assert_eq!(resp.relay_body(), expected);
}
