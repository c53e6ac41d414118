//! `/ws` streaming endpoint (spec §4.9): drives `executor::execute_task_streaming`
//! and forwards chunks as they arrive instead of waiting for the full response.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::executor::TaskRequest;
use crate::runtime::Runtime;

#[derive(Deserialize)]
struct ExecuteFrame {
    #[allow(dead_code)]
    action: String,
    goblin: String,
    task: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    Start {
        goblin: &'a str,
        timestamp: chrono::DateTime<Utc>,
    },
    Chunk {
        goblin: &'a str,
        data: String,
        timestamp: chrono::DateTime<Utc>,
    },
    Complete {
        goblin: &'a str,
        data: &'a crate::executor::TaskResponse,
        timestamp: chrono::DateTime<Utc>,
    },
    Error {
        goblin: &'a str,
        error: String,
        timestamp: chrono::DateTime<Utc>,
    },
}

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(runtime): State<Arc<Runtime>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, runtime))
}

async fn handle_socket(mut socket: WebSocket, runtime: Arc<Runtime>) {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };

        let frame: ExecuteFrame = match serde_json::from_str(&text) {
            Ok(f) => f,
            Err(e) => {
                let _ = send(&mut socket, &OutboundFrame::Error {
                    goblin: "",
                    error: format!("malformed request: {}", e),
                    timestamp: Utc::now(),
                })
                .await;
                continue;
            }
        };

        let _ = send(
            &mut socket,
            &OutboundFrame::Start {
                goblin: &frame.goblin,
                timestamp: Utc::now(),
            },
        )
        .await;

        let (tx, mut rx) = mpsc::channel::<String>(64);
        let request = TaskRequest {
            agent_id: frame.goblin.clone(),
            task_text: frame.task.clone(),
            context: None,
            dry_run: false,
        };

        let runtime_for_task = Arc::clone(&runtime);
        let execution = tokio::spawn(async move {
            let ctx = crate::executor::ExecutorContext {
                catalog: &runtime_for_task.catalog,
                providers: &runtime_for_task.providers,
                history: &runtime_for_task.history,
                cost_tracker: &runtime_for_task.cost_tracker,
                audit_url: runtime_for_task.config.audit_url.clone(),
            };
            crate::executor::execute_task_streaming(&ctx, request, tx).await
        });

        while let Some(chunk) = rx.recv().await {
            if send(
                &mut socket,
                &OutboundFrame::Chunk {
                    goblin: &frame.goblin,
                    data: chunk,
                    timestamp: Utc::now(),
                },
            )
            .await
            .is_err()
            {
                break;
            }
        }

        match execution.await {
            Ok(Ok(response)) => {
                let _ = send(
                    &mut socket,
                    &OutboundFrame::Complete {
                        goblin: &frame.goblin,
                        data: &response,
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
            Ok(Err(e)) => {
                let _ = send(
                    &mut socket,
                    &OutboundFrame::Error {
                        goblin: &frame.goblin,
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
            Err(join_error) => {
                let _ = send(
                    &mut socket,
                    &OutboundFrame::Error {
                        goblin: &frame.goblin,
                        error: format!("task panicked: {}", join_error),
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
        }
    }
}

async fn send(socket: &mut WebSocket, frame: &OutboundFrame<'_>) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text.into())).await
}
