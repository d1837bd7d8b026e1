//! Fake webhook endpoint recording every payload it is sent.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use super::constants::DELIVERY_WAIT_TIMEOUT_MS;

#[derive(Default)]
struct ReceiverState {
    received: Mutex<Vec<serde_json::Value>>,
    failures_remaining: AtomicUsize,
}

pub struct WebhookReceiver {
    pub url: String,
    state: Arc<ReceiverState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

async fn receive(
    State(state): State<Arc<ReceiverState>>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    state.received.lock().unwrap().push(payload);
    let failing = state
        .failures_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

impl WebhookReceiver {
    /// Starts a receiver that answers 500 to the first `failures` requests and 200 afterwards.
    pub async fn spawn(failures: usize) -> Self {
        let state = Arc::new(ReceiverState::default());
        state.failures_remaining.store(failures, Ordering::SeqCst);

        let app = Router::new()
            .route("/hook", post(receive))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind webhook receiver");
        let port = listener.local_addr().unwrap().port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Webhook receiver failed");
        });

        Self {
            url: format!("http://127.0.0.1:{}/hook", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn received(&self) -> Vec<serde_json::Value> {
        self.state.received.lock().unwrap().clone()
    }

    /// Polls until at least `count` requests arrived. Panics on timeout.
    pub async fn wait_for_requests(&self, count: usize) -> Vec<serde_json::Value> {
        let start = std::time::Instant::now();
        loop {
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            if start.elapsed() > Duration::from_millis(DELIVERY_WAIT_TIMEOUT_MS) {
                panic!(
                    "Expected {} webhook requests, got {} within {}ms",
                    count,
                    received.len(),
                    DELIVERY_WAIT_TIMEOUT_MS
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for WebhookReceiver {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
