// Connection handling module
// Serves one TCP connection per task and writes access log lines

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::{Body as _, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response};
use hyper_util::rt::TokioIo;

use crate::assets::Handler;
use crate::config::Config;
use crate::http::response::{build_405_response, build_options_response, Body};
use crate::logger::{self, AccessLogEntry};

/// Per-connection settings, fixed at startup
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub keep_alive: bool,
    pub timeout: Duration,
    pub max_connections: Option<usize>,
    pub access_log: bool,
    pub access_log_format: String,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keep_alive: config.performance.keep_alive,
            timeout: Duration::from_secs(config.performance.connection_timeout),
            max_connections: config.performance.max_connections,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        }
    }
}

/// Only GET and HEAD reach the asset handler
fn check_http_method(method: &Method) -> Option<Response<Body>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(build_405_response())
        }
    }
}

fn header_string(req: &Request<()>, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Handle one request: method gate, asset handler, access log
pub async fn serve_request<H: Handler>(
    handler: &H,
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    settings: &ConnectionSettings,
) -> Response<Body> {
    let started = Instant::now();
    // Request bodies are never read
    let (parts, _body) = req.into_parts();
    let req = Request::from_parts(parts, ());

    let resp = match check_http_method(req.method()) {
        Some(resp) => resp,
        None => handler.handle(&req).await,
    };

    if settings.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri()
                .path_and_query()
                .map_or_else(|| req.uri().path().to_string(), ToString::to_string),
        );
        entry.http_version = format!("{:?}", req.version())
            .trim_start_matches("HTTP/")
            .to_string();
        entry.status = resp.status().as_u16();
        entry.body_bytes = resp
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.referer = header_string(&req, header::REFERER);
        entry.user_agent = header_string(&req, header::USER_AGENT);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &settings.access_log_format);
    }

    resp
}

/// Accept a connection unless the connection limit is reached, then serve
/// it on its own task.
pub fn accept_connection<H: Handler + 'static>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    handler: &Arc<H>,
    settings: &Arc<ConnectionSettings>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = settings.max_connections {
        if prev_count >= max_conn {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    let handler = Arc::clone(handler);
    let settings = Arc::clone(settings);
    let conn_counter = Arc::clone(conn_counter);

    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let mut builder = http1::Builder::new();
        builder.keep_alive(settings.keep_alive);

        let service_settings = Arc::clone(&settings);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let handler = Arc::clone(&handler);
                let settings = Arc::clone(&service_settings);
                async move {
                    Ok::<_, Infallible>(serve_request(&*handler, req, peer_addr, &settings).await)
                }
            }),
        );

        match tokio::time::timeout(settings.timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                settings.timeout.as_secs()
            )),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
