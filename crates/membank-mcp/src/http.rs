//! HTTP transport with SSE notifications.
//!
//! `POST /mcp` carries one JSON-RPC request. The initial request must be an
//! `initialize` call; the response carries a server-generated session id in
//! the `mcp-session-id` header, required on every subsequent request.
//! `GET /mcp` upgrades to an SSE stream of the session's progress events.
//! `DELETE /mcp` terminates the session and cancels in-flight work.

use crate::progress::{NoopProgress, ProgressSink, SseProgress};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::McpServer;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Build the HTTP router.
pub fn app(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(post_mcp).get(get_mcp).delete(delete_mcp))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Serve until ctrl-c.
pub async fn serve(server: Arc<McpServer>, addr: std::net::SocketAddr) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("membank HTTP transport listening on {addr}");
    axum::serve(listener, app(server))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}

fn session_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn rpc_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(JsonRpcResponse::error(Value::Null, -32000, message)),
    )
        .into_response()
}

async fn post_mcp(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    // The handshake creates the session and returns its id in the header.
    if request.method == "initialize" {
        let key = uuid::Uuid::new_v4().to_string();
        server.sessions.create(&key);
        let id = request.id.unwrap_or(Value::Null);
        let response = server.handle_request(
            &key,
            "initialize",
            request.params.as_ref(),
            id,
            &NoopProgress,
            &membank_core::CancelToken::new(),
        );
        return ([(SESSION_HEADER, key)], Json(response)).into_response();
    }

    let Some(key) = session_key(&headers) else {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            "missing mcp-session-id header; call initialize first",
        );
    };
    if !server.sessions.exists(&key) {
        return rpc_error(StatusCode::NOT_FOUND, "unknown session");
    }

    // Notifications get no response body.
    let Some(id) = request.id.clone() else {
        server.handle_notification(&key, &request.method);
        return StatusCode::ACCEPTED.into_response();
    };

    let cancel = server.sessions.begin_request(&key);
    let events = server.sessions.events(&key);
    let server_task = Arc::clone(&server);
    let key_task = key.clone();

    let result = tokio::task::spawn_blocking(move || {
        // Progress goes to the session's SSE stream; with no channel the
        // events are dropped and the final payload is the response body.
        let progress: Box<dyn ProgressSink> = match events {
            Some(tx) => Box::new(SseProgress::new(tx)),
            None => Box::new(NoopProgress),
        };
        server_task.handle_request(
            &key_task,
            &request.method,
            request.params.as_ref(),
            id,
            progress.as_ref(),
            &cancel,
        )
    })
    .await;

    match result {
        Ok(response) => ([(SESSION_HEADER, key)], Json(response)).into_response(),
        Err(e) => rpc_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("handler failed: {e}"),
        ),
    }
}

async fn get_mcp(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    let Some(key) = session_key(&headers) else {
        return Err(rpc_error(
            StatusCode::BAD_REQUEST,
            "missing mcp-session-id header",
        ));
    };
    let Some(rx) = server.sessions.subscribe(&key) else {
        return Err(rpc_error(StatusCode::NOT_FOUND, "unknown session"));
    };

    let stream = BroadcastStream::new(rx).filter_map(|event| async move {
        match event {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => Some(Ok(Event::default().event("progress").data(payload))),
                Err(_) => None,
            },
            // Lagged receiver: skip dropped events, keep the stream alive.
            Err(_) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

async fn delete_mcp(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
) -> Response {
    let Some(key) = session_key(&headers) else {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            "missing mcp-session-id header",
        );
    };
    if server.sessions.terminate(&key) {
        Json(serde_json::json!({ "terminated": true })).into_response()
    } else {
        rpc_error(StatusCode::NOT_FOUND, "unknown session")
    }
}
