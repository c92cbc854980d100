//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use edge_gateway::config::{DomainConfig, GatewayConfig, RouteConfig};
use edge_gateway::{Dispatcher, GatewayState};

/// A running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<String>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw head (request line and headers) of the last request received.
    pub fn last_request(&self) -> String {
        self.last_request.lock().unwrap().clone()
    }

    /// Value of a header in the last request, matched case-insensitively.
    pub fn last_header(&self, name: &str) -> Option<String> {
        self.last_request().lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> MockBackend {
    start_programmable_backend(move |_head| async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend; `f` receives the raw request head.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(String::new())),
    };
    let f = Arc::new(f);
    let shared = backend.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let shared = shared.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        shared.hits.fetch_add(1, Ordering::SeqCst);
                        *shared.last_request.lock().unwrap() = head.clone();

                        let (status, body) = f(head).await;
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Start a backend that accepts connections but answers only after `delay`.
pub async fn start_slow_backend(delay: Duration) -> MockBackend {
    start_programmable_backend(move |_head| async move {
        tokio::time::sleep(delay).await;
        (200, "late".to_string())
    })
    .await
}

/// Start a backend that sends headers and part of the body, then goes silent.
pub async fn start_stalling_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(String::new())),
    };
    let shared = backend.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let shared = shared.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                shared.hits.fetch_add(1, Ordering::SeqCst);
                *shared.last_request.lock().unwrap() = head;

                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 100\r\n\r\npartial")
                    .await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    backend
}

/// Start a backend that answers every request with the raw bytes of `reply`.
pub async fn start_raw_backend(reply: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(String::new())),
    };
    let shared = backend.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let shared = shared.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                shared.hits.fetch_add(1, Ordering::SeqCst);
                *shared.last_request.lock().unwrap() = head;

                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    backend
}

/// An address nothing is listening on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A domain with the given proxy routes and no other features.
pub fn domain(name: &str, routes: Vec<RouteConfig>) -> DomainConfig {
    DomainConfig {
        domain: name.to_string(),
        proxy_routes: routes,
        ..DomainConfig::default()
    }
}

/// A prefix proxy route.
pub fn route(path: &str, backend: &str) -> RouteConfig {
    RouteConfig {
        path: path.to_string(),
        backend: backend.to_string(),
        ..RouteConfig::default()
    }
}

/// Configuration serving `domains` on a plaintext-only gateway.
pub fn config(domains: Vec<DomainConfig>) -> GatewayConfig {
    GatewayConfig {
        domains,
        ..GatewayConfig::default()
    }
}

/// Build a plaintext dispatcher for `config`.
pub fn gateway(config: &GatewayConfig) -> Dispatcher {
    edge_gateway::observability::metrics::init_metrics();
    let state = GatewayState::from_config(config).unwrap();
    Dispatcher::new(state)
}

/// A GET request for `host` + `path` arriving from `ip`.
pub fn request(host: &str, path: &str, ip: &str) -> Request<Body> {
    let mut req = Request::builder()
        .uri(path)
        .header("host", host)
        .body(Body::empty())
        .unwrap();
    let remote: SocketAddr = format!("{}:40000", ip).parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(remote));
    req
}

/// Send a GET through the dispatcher from 127.0.0.1.
pub async fn get(dispatcher: &Dispatcher, host: &str, path: &str) -> Response {
    dispatcher.dispatch(request(host, path, "127.0.0.1")).await
}

/// Collect the body as a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Header value as a string, if present.
pub fn header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "headers: {:?}", response.headers());
}
