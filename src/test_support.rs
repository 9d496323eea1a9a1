//! Programmable loopback backends for unit tests.

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Shared {
    status: AtomicU16,
    hits: AtomicUsize,
}

/// A backend answering every path and method with a switchable status code.
pub(crate) struct MockBackend {
    pub url: String,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start(status: u16) -> Self {
        let shared = Arc::new(Shared {
            status: AtomicU16::new(status),
            hits: AtomicUsize::new(0),
        });
        let app = Router::new().fallback(respond).with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{}", addr),
            shared,
            handle,
        }
    }

    pub fn set_status(&self, status: u16) {
        self.shared.status.store(status, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.shared.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(State(shared): State<Arc<Shared>>) -> StatusCode {
    shared.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::from_u16(shared.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
