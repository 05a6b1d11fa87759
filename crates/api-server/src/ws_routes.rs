use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use credit_store::CreditStore;
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::time;

use crate::AppState;

// ---------------------------------------------------------------------------
// Messages pushed to live clients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    ScoresChanged { count: i64 },
}

/// Remembers the last score count a client was told about.
#[derive(Debug, Default)]
pub struct ScoreChangeTracker {
    last_count: Option<i64>,
}

impl ScoreChangeTracker {
    /// Event for the first observation and for every change after it.
    pub fn observe(&mut self, count: i64) -> Option<LiveEvent> {
        if self.last_count == Some(count) {
            return None;
        }
        self.last_count = Some(count);
        Some(LiveEvent::ScoresChanged { count })
    }
}

// ---------------------------------------------------------------------------
// WebSocket handler: /ws/latest
// ---------------------------------------------------------------------------

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws/latest", get(ws_latest_handler))
}

async fn ws_latest_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_latest_socket(socket, state))
}

async fn handle_latest_socket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let store = state.store.clone();
    let period = state.config.ws_poll_interval;

    let mut send_task = tokio::spawn(async move {
        push_score_changes(&store, period, sender).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // whichever side ends first takes the other down with it
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!("Live score client disconnected");
}

/// Poll the score count every `period` and push a message when it changes.
///
/// Returns once the sink rejects a message. Failed polls are logged and
/// retried on the next tick.
pub(crate) async fn push_score_changes<S>(store: &CreditStore, period: Duration, mut sink: S)
where
    S: Sink<Message> + Unpin,
{
    let mut tracker = ScoreChangeTracker::default();
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let count = match store.score_count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Live score poll failed: {:#}", e);
                continue;
            }
        };

        let Some(event) = tracker.observe(count) else {
            continue;
        };

        let payload = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode live event: {}", e);
                continue;
            }
        };

        if sink.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
