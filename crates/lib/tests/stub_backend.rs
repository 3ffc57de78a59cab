//! Integration test: start a stub chatbot backend on a free port and drive
//! the real ApiClient against it. Does not require the actual backend.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

use lib::api::{ApiClient, ApiError, Source};

async fn stub_chat(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let message = body.get("message").and_then(|v| v.as_str()).unwrap_or("");
    if message == "boom" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "knowledge base unavailable" })),
        ));
    }
    let session_id = body
        .get("session_id")
        .and_then(|v| v.as_str())
        .unwrap_or("sess-stub-1");
    // "weird" exercises the unknown-source normalization path.
    let source = if message == "weird" { "hallucination" } else { "KB" };
    Ok(Json(json!({
        "reply": format!("echo: {}", message),
        "source": source,
        "session_id": session_id,
    })))
}

fn stub_messages() -> Value {
    json!([
        {
            "id": "m1",
            "sessionId": "sess-stub-1",
            "role": "user",
            "content": "What is X?",
            "source": null,
            "createdAt": "2024-05-01T12:00:00Z"
        },
        {
            "id": "m2",
            "sessionId": "sess-stub-1",
            "role": "assistant",
            "content": "X is a thing.",
            "source": "KB",
            "createdAt": "2024-05-01T12:00:05Z"
        }
    ])
}

async fn stub_sessions() -> Json<Value> {
    Json(json!([
        {
            "id": "sess-stub-1",
            "userId": null,
            "createdAt": "2024-05-01T12:00:00Z",
            "lastActive": "2024-05-01T12:00:05Z",
            "messages": stub_messages(),
        }
    ]))
}

async fn stub_session_messages(Path(_id): Path<String>) -> Json<Value> {
    Json(stub_messages())
}

async fn stub_delete(Path(id): Path<String>) -> StatusCode {
    if id == "sess-stub-1" {
        StatusCode::NO_CONTENT
    } else {
        // Same shape an older backend without the route produces.
        StatusCode::NOT_FOUND
    }
}

async fn stub_health() -> Json<Value> {
    Json(json!({ "status": "ok", "database": "connected" }))
}

/// Start the stub backend on a free port; returns the base URL.
async fn start_stub() -> String {
    let app = Router::new()
        .route("/chat", post(stub_chat))
        .route("/sessions", get(stub_sessions))
        .route("/sessions/:id/messages", get(stub_session_messages))
        .route("/sessions/:id", delete(stub_delete))
        .route("/health", get(stub_health));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let base = format!("http://{}", addr);

    let client = ApiClient::new(Some(base.clone()));
    for _ in 0..100 {
        if client.health().await.is_ok() {
            return base;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("stub backend did not become healthy within 2s at {}", base);
}

#[tokio::test]
async fn chat_round_trip_returns_session_and_normalizes_source() {
    let client = ApiClient::new(Some(start_stub().await));

    let reply = client.send_message(None, "hello", true).await.expect("send");
    assert_eq!(reply.reply, "echo: hello");
    assert_eq!(reply.source, Source::Kb);
    assert_eq!(reply.session_id, "sess-stub-1");

    // An unrecognized source value renders as LLM, never an error.
    let reply = client
        .send_message(Some("sess-stub-1"), "weird", false)
        .await
        .expect("send");
    assert_eq!(reply.source, Source::Llm);
}

#[tokio::test]
async fn chat_error_carries_server_detail() {
    let client = ApiClient::new(Some(start_stub().await));
    let err = client.send_message(None, "boom", true).await.unwrap_err();
    match err {
        ApiError::Api { status, detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail, "knowledge base unavailable");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn sessions_and_messages_fetch() {
    let client = ApiClient::new(Some(start_stub().await));

    let sessions = client.list_sessions().await.expect("list sessions");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "sess-stub-1");
    assert_eq!(sessions[0].messages.len(), 2);

    let messages = client
        .session_messages("sess-stub-1")
        .await
        .expect("messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[1].source, Some(Source::Kb));
}

#[tokio::test]
async fn delete_distinguishes_missing_endpoint() {
    let client = ApiClient::new(Some(start_stub().await));

    client.delete_session("sess-stub-1").await.expect("delete");

    let err = client.delete_session("sess-gone").await.unwrap_err();
    assert!(matches!(err, ApiError::EndpointMissing(_)));
}

#[tokio::test]
async fn health_reports_database() {
    let client = ApiClient::new(Some(start_stub().await));
    let health = client.health().await.expect("health");
    assert_eq!(health.status, "ok");
    assert_eq!(health.database.as_deref(), Some("connected"));
    assert!(health.error.is_none());
}
