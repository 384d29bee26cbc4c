//! Mock endpoints shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A cloudflared-style `/ready` endpoint answering with a fixed body.
pub async fn ready_endpoint(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route("/ready", get(move || async move { (status, body) }));
    format!("http://{}/ready", serve(app).await)
}

/// A `/ping` endpoint counting how often it was hit.
pub struct PingEndpoint {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl PingEndpoint {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/ping",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        );
        let url = format!("http://{}/ping", serve(app).await);
        Self { url, hits }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
