// Server module entry point
// Accept loop, per-connection tasks and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::assets::Handler;
use crate::logger;

pub use connection::{accept_connection, ConnectionSettings};
pub use listener::create_reusable_listener;
pub use signal::shutdown_signal;

/// How long in-flight connections may run after shutdown starts
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept connections until `shutdown` resolves, then wait for in-flight
/// connections to finish (bounded by `DRAIN_TIMEOUT`).
pub async fn run<H, F>(
    listener: TcpListener,
    handler: Arc<H>,
    settings: Arc<ConnectionSettings>,
    shutdown: F,
) where
    H: Handler + 'static,
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => match accept_result {
                Ok((stream, peer_addr)) => {
                    accept_connection(stream, peer_addr, &handler, &settings, &active_connections);
                }
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = &mut shutdown => break,
        }
    }

    drop(listener);
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutting down with {} connections still open",
                active_connections.load(Ordering::SeqCst)
            ));
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    logger::log_info("Server stopped");
}
