//! Line-delimited duplex transport: newline-delimited JSON-RPC over
//! stdin/stdout. One implicit session per process connection. A single
//! writer task serialises responses and progress notifications so ordering
//! within a request is preserved.

use crate::progress::LineProgress;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::McpServer;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Key of the single implicit stdio session.
const SESSION_KEY: &str = "stdio";

/// Run the stdio transport until stdin closes.
pub async fn run(server: Arc<McpServer>) -> io::Result<()> {
    server.sessions.create(SESSION_KEY);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task: owns stdout for the whole connection.
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let resp =
                    JsonRpcResponse::error(Value::Null, -32700, format!("Parse error: {e}"));
                send_json(&tx, &resp);
                continue;
            }
        };

        // Notifications are handled inline (cancellation must not queue
        // behind the request it is cancelling).
        let Some(id) = request.id else {
            server.handle_notification(SESSION_KEY, &request.method);
            continue;
        };

        let server = Arc::clone(&server);
        let tx_task = tx.clone();
        tokio::spawn(async move {
            let cancel = server.sessions.begin_request(SESSION_KEY);
            let response = tokio::task::spawn_blocking(move || {
                let progress = LineProgress::new(tx_task.clone());
                let response = server.handle_request(
                    SESSION_KEY,
                    &request.method,
                    request.params.as_ref(),
                    id,
                    &progress,
                    &cancel,
                );
                (response, tx_task)
            })
            .await;

            match response {
                Ok((response, tx_task)) => send_json(&tx_task, &response),
                Err(e) => tracing::error!("handler panicked: {e}"),
            }
        });
    }

    server.sessions.terminate(SESSION_KEY);
    drop(tx);
    let _ = writer.await;
    Ok(())
}

fn send_json(tx: &mpsc::UnboundedSender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            let _ = tx.send(line);
        }
        Err(e) => tracing::error!("failed to serialise response: {e}"),
    }
}
