//! Reverse proxying, caching, rate limiting and compression end to end.

mod common;

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use edge_gateway::config::{GatewayConfig, RouteConfig};
use edge_gateway::http::response;
use http_body_util::BodyExt;

fn uncached(mut config: GatewayConfig) -> GatewayConfig {
    config.cache.enabled = false;
    config
}

#[tokio::test]
async fn test_forwarding_headers_and_injection() {
    let backend = start_mock_backend("ok").await;
    let mut headers = BTreeMap::new();
    headers.insert("X-Tenant".to_string(), "acme".to_string());
    let gw = gateway(&config(vec![domain(
        "app.test",
        vec![RouteConfig {
            headers,
            ..route("/api", &format!("{}/v1", backend.url()))
        }],
    )]));

    let mut req = request("app.test", "/api/users?page=2", "203.0.113.9");
    req.headers_mut()
        .insert("x-forwarded-for", "6.6.6.6".parse().unwrap());
    req.headers_mut().insert("x-tenant", "spoofed".parse().unwrap());
    let res = gw.dispatch(req).await;
    assert_status(&res, StatusCode::OK);
    assert_eq!(body_string(res).await, "ok");

    let head = backend.last_request();
    assert!(head.starts_with("GET /v1/api/users?page=2 HTTP/1.1"), "{}", head);
    assert_eq!(backend.last_header("x-forwarded-for").as_deref(), Some("203.0.113.9"));
    assert_eq!(backend.last_header("x-forwarded-proto").as_deref(), Some("http"));
    assert_eq!(backend.last_header("x-forwarded-host").as_deref(), Some("app.test"));
    assert_eq!(backend.last_header("host").as_deref(), Some("app.test"));
    assert_eq!(backend.last_header("x-tenant").as_deref(), Some("acme"));
}

#[tokio::test]
async fn test_backend_status_is_relayed() {
    let backend = start_programmable_backend(|_| async { (503, "down for maintenance".to_string()) }).await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    let res = get(&gw, "app.test", "/").await;
    assert_status(&res, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(res).await, "down for maintenance");
}

#[tokio::test]
async fn test_unreachable_backend_is_502() {
    let dead = closed_address().await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &format!("http://{}", dead))])]));

    let res = get(&gw, "app.test", "/").await;
    assert_status(&res, StatusCode::BAD_GATEWAY);
    assert_eq!(body_string(res).await, response::BAD_GATEWAY_BODY);
}

#[tokio::test]
async fn test_slow_backend_is_504() {
    let backend = start_slow_backend(Duration::from_secs(3)).await;
    let mut config = config(vec![domain("app.test", vec![route("/", &backend.url())])]);
    config.timeouts.backend_secs = 1;
    let gw = gateway(&config);

    let res = get(&gw, "app.test", "/").await;
    assert_status(&res, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_string(res).await, response::GATEWAY_TIMEOUT_BODY);
}

#[tokio::test]
async fn test_stalled_body_is_cut_off_when_caching() {
    let backend = start_stalling_backend().await;
    let mut config = config(vec![domain("app.test", vec![route("/", &backend.url())])]);
    config.timeouts.backend_secs = 1;
    let gw = gateway(&config);

    let res = tokio::time::timeout(Duration::from_secs(8), get(&gw, "app.test", "/x"))
        .await
        .expect("request must finish once the backend goes quiet");
    assert_status(&res, StatusCode::BAD_GATEWAY);
    assert!(gw.state().cache.is_empty());
}

#[tokio::test]
async fn test_stalled_body_is_cut_off_when_streaming() {
    let backend = start_stalling_backend().await;
    let mut config = uncached(config(vec![domain("app.test", vec![route("/", &backend.url())])]));
    config.timeouts.backend_secs = 1;
    let gw = gateway(&config);

    let outcome = tokio::time::timeout(Duration::from_secs(8), async {
        let res = get(&gw, "app.test", "/x").await;
        assert_status(&res, StatusCode::OK);
        res.into_body().collect().await
    })
    .await
    .expect("body must end once the backend goes quiet");
    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_cache_serves_repeat_gets() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let backend = start_programmable_backend(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { (200, format!("generated #{}", n)) }
    })
    .await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    let first = get(&gw, "app.test", "/page?x=1").await;
    assert_eq!(header(&first, "x-cache").as_deref(), Some("MISS"));
    let first = body_string(first).await;

    let second = get(&gw, "app.test", "/page?x=1").await;
    assert_eq!(header(&second, "x-cache").as_deref(), Some("HIT"));
    assert_eq!(body_string(second).await, first);
    assert_eq!(backend.hits(), 1);

    // The query string is part of the key.
    let other = get(&gw, "app.test", "/page?x=2").await;
    assert_eq!(header(&other, "x-cache").as_deref(), Some("MISS"));
    assert_eq!(backend.hits(), 2);
}

#[tokio::test]
async fn test_personalised_responses_are_not_cached() {
    for reply in [
        "HTTP/1.1 200 OK\r\nSet-Cookie: session=alice\r\nContent-Length: 5\r\nConnection: close\r\n\r\nalice",
        "HTTP/1.1 200 OK\r\nCache-Control: private\r\nContent-Length: 5\r\nConnection: close\r\n\r\nalice",
        "HTTP/1.1 200 OK\r\nCache-Control: no-store\r\nContent-Length: 5\r\nConnection: close\r\n\r\nalice",
    ] {
        let backend = start_raw_backend(reply).await;
        let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

        for _ in 0..2 {
            let res = get(&gw, "app.test", "/me").await;
            assert_status(&res, StatusCode::OK);
            assert!(header(&res, "x-cache").is_none());
            assert_eq!(body_string(res).await, "alice");
        }
        assert_eq!(backend.hits(), 2);
        assert!(gw.state().cache.is_empty());
    }
}

#[tokio::test]
async fn test_errors_and_other_methods_are_not_cached() {
    let backend = start_programmable_backend(|_| async { (500, "boom".to_string()) }).await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    get(&gw, "app.test", "/").await;
    let res = get(&gw, "app.test", "/").await;
    assert!(header(&res, "x-cache").is_none());
    assert_eq!(backend.hits(), 2);

    let mut req = request("app.test", "/", "127.0.0.1");
    *req.method_mut() = axum::http::Method::DELETE;
    let res = gw.dispatch(req).await;
    assert!(header(&res, "x-cache").is_none());
    assert_eq!(backend.hits(), 3);
}

#[tokio::test]
async fn test_rate_limit_bucket_is_shared_by_clients() {
    let backend = start_mock_backend("ok").await;
    let gw = gateway(&uncached(config(vec![domain(
        "app.test",
        vec![RouteConfig {
            rate_limit: 1,
            burst: 5,
            ..route("/", &backend.url())
        }],
    )])));

    let mut ok = 0;
    let mut limited = Vec::new();
    for i in 0..6 {
        let ip = if i % 2 == 0 { "198.51.100.1" } else { "198.51.100.2" };
        let res = gw.dispatch(request("app.test", "/", ip)).await;
        match res.status() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited.push(res),
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(limited.len(), 1);
    let retry_after: u64 = header(&limited[0], "retry-after").unwrap().parse().unwrap();
    assert!(retry_after >= 1);
    assert_eq!(backend.hits(), 5);
}

#[tokio::test]
async fn test_zero_rate_limit_is_unlimited() {
    let backend = start_mock_backend("ok").await;
    let gw = gateway(&uncached(config(vec![domain("app.test", vec![route("/", &backend.url())])])));

    for _ in 0..20 {
        assert_status(&get(&gw, "app.test", "/").await, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_gzip_when_accepted() {
    let text = "compress me please ".repeat(200);
    let payload = text.clone();
    let backend = start_programmable_backend(move |_| {
        let body = payload.clone();
        async move { (200, body) }
    })
    .await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    let mut req = request("app.test", "/big", "127.0.0.1");
    req.headers_mut()
        .insert("accept-encoding", "br;q=1.0, gzip;q=0.8".parse().unwrap());
    let res = gw.dispatch(req).await;
    assert_status(&res, StatusCode::OK);
    assert_eq!(header(&res, "content-encoding").as_deref(), Some("gzip"));
    assert!(header(&res, "vary").unwrap().to_ascii_lowercase().contains("accept-encoding"));

    let compressed = res.into_body().collect().await.unwrap().to_bytes();
    assert!(compressed.len() < text.len());
    let mut decoded = String::new();
    flate2::read::GzDecoder::new(&compressed[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, text);

    // The cache holds the identity body; a plain client gets it back uncompressed.
    let res = get(&gw, "app.test", "/big").await;
    assert_eq!(header(&res, "x-cache").as_deref(), Some("HIT"));
    assert!(header(&res, "content-encoding").is_none());
    assert_eq!(body_string(res).await, text);
    assert_eq!(backend.hits(), 1);
}
