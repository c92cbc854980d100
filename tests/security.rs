//! Access control, security headers and HTTPS redirects.

mod common;

use axum::http::StatusCode;
use common::*;
use edge_gateway::config::{DomainConfig, GatewayConfig};
use edge_gateway::http::response;
use edge_gateway::security::headers::HSTS_VALUE;
use edge_gateway::Dispatcher;

fn guarded(backend: &MockBackend, allow: &[&str], deny: &[&str]) -> DomainConfig {
    DomainConfig {
        allow_ips: allow.iter().map(|s| s.to_string()).collect(),
        deny_ips: deny.iter().map(|s| s.to_string()).collect(),
        ..domain("app.test", vec![route("/", &backend.url())])
    }
}

#[tokio::test]
async fn test_deny_list_wins_over_allow_list() {
    let backend = start_mock_backend("ok").await;
    let gw = gateway(&config(vec![guarded(&backend, &["10.0.0.1", "10.0.0.2"], &["10.0.0.2"])]));

    let res = gw.dispatch(request("app.test", "/", "10.0.0.1")).await;
    assert_status(&res, StatusCode::OK);

    let res = gw.dispatch(request("app.test", "/", "10.0.0.2")).await;
    assert_status(&res, StatusCode::FORBIDDEN);
    assert_eq!(body_string(res).await, response::FORBIDDEN_BODY);

    let res = gw.dispatch(request("app.test", "/", "10.0.0.3")).await;
    assert_status(&res, StatusCode::FORBIDDEN);

    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_deny_list_alone_admits_everyone_else() {
    let backend = start_mock_backend("ok").await;
    let gw = gateway(&config(vec![guarded(&backend, &[], &["::1"])]));

    let res = gw.dispatch(request("app.test", "/", "[::1]")).await;
    assert_status(&res, StatusCode::FORBIDDEN);

    let res = gw.dispatch(request("app.test", "/", "192.0.2.7")).await;
    assert_status(&res, StatusCode::OK);
}

#[tokio::test]
async fn test_hsts_and_csp_on_proxied_responses() {
    let backend = start_mock_backend("ok").await;
    let gw = gateway(&config(vec![DomainConfig {
        hsts: true,
        csp: Some("default-src 'self'".into()),
        ..domain("app.test", vec![route("/", &backend.url())])
    }]));

    let res = get(&gw, "app.test", "/").await;
    assert_status(&res, StatusCode::OK);
    assert_eq!(
        header(&res, "strict-transport-security").as_deref(),
        Some(HSTS_VALUE)
    );
    assert_eq!(header(&res, "content-security-policy").as_deref(), Some("default-src 'self'"));
}

#[tokio::test]
async fn test_no_security_headers_unless_configured() {
    let backend = start_mock_backend("ok").await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    let res = get(&gw, "app.test", "/").await;
    assert!(header(&res, "strict-transport-security").is_none());
    assert!(header(&res, "content-security-policy").is_none());
}

fn tls_config(domains: Vec<DomainConfig>) -> GatewayConfig {
    let mut config = config(domains);
    config.server.tls_cert = Some("cert.pem".into());
    config.server.tls_key = Some("key.pem".into());
    config
}

#[tokio::test]
async fn test_plaintext_redirects_to_https() {
    let backend = start_mock_backend("ok").await;
    let config = tls_config(vec![DomainConfig {
        redirect_to_https: true,
        ..domain("app.test", vec![route("/", &backend.url())])
    }]);
    let plain = gateway(&config);

    let res = get(&plain, "app.test:80", "/login?next=%2Fhome").await;
    assert_status(&res, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        header(&res, "location").as_deref(),
        Some("https://app.test/login?next=%2Fhome")
    );
    assert_eq!(backend.hits(), 0);

    let secure = Dispatcher::new(plain.state().clone()).with_tls(true);
    let res = get(&secure, "app.test", "/login").await;
    assert_status(&res, StatusCode::OK);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_plaintext_listener_hides_domains_when_tls_is_on() {
    let backend = start_mock_backend("ok").await;
    let config = tls_config(vec![domain("app.test", vec![route("/", &backend.url())])]);
    let plain = gateway(&config);

    let res = get(&plain, "app.test", "/").await;
    assert_status(&res, StatusCode::NOT_FOUND);

    let mut config = config;
    config.server.plaintext_routing = true;
    let plain = gateway(&config);
    let res = get(&plain, "app.test", "/").await;
    assert_status(&res, StatusCode::OK);
}
