//! Virtual-host and path routing through the dispatcher.

mod common;

use axum::http::StatusCode;
use common::*;
use edge_gateway::config::{DomainConfig, GatewayConfig, RouteConfig};

#[tokio::test]
async fn test_welcome_page_without_domains() {
    let gw = gateway(&GatewayConfig::default());

    let res = get(&gw, "anything.test", "/some/path").await;
    assert_status(&res, StatusCode::OK);
    assert!(header(&res, "content-type").unwrap().starts_with("text/html"));
    assert!(body_string(res).await.contains("<html"));
}

#[tokio::test]
async fn test_health_and_metrics_answer_on_any_host() {
    let backend = start_mock_backend("app").await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    let res = get(&gw, "unknown.test", "/health").await;
    assert_status(&res, StatusCode::OK);
    assert_eq!(body_string(res).await, "OK");

    let res = get(&gw, "unknown.test", "/metrics").await;
    assert_status(&res, StatusCode::OK);
    assert!(header(&res, "content-type").unwrap().starts_with("text/plain"));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_unmatched_host_is_plain_404() {
    let backend = start_mock_backend("app").await;
    let mut d = domain("app.test", vec![route("/", &backend.url())]);
    d.hsts = true;
    let gw = gateway(&config(vec![d]));

    let res = get(&gw, "other.test", "/").await;
    assert_status(&res, StatusCode::NOT_FOUND);
    assert!(header(&res, "strict-transport-security").is_none());
    assert!(header(&res, "x-request-id").is_some());
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_first_matching_route_wins() {
    let api = start_mock_backend("api").await;
    let v2 = start_mock_backend("v2").await;
    let root = start_mock_backend("root").await;
    let gw = gateway(&config(vec![domain(
        "app.test",
        vec![
            route("/api", &api.url()),
            route("/api/v2", &v2.url()),
            route("/", &root.url()),
        ],
    )]));

    let res = get(&gw, "app.test", "/api/v2/users").await;
    assert_eq!(body_string(res).await, "api");

    let res = get(&gw, "app.test", "/apix").await;
    assert_eq!(body_string(res).await, "root");

    assert_eq!(v2.hits(), 0);
}

#[tokio::test]
async fn test_host_port_and_case_are_ignored() {
    let backend = start_mock_backend("app").await;
    let gw = gateway(&config(vec![domain("app.test", vec![route("/", &backend.url())])]));

    let res = get(&gw, "APP.test:8080", "/").await;
    assert_status(&res, StatusCode::OK);
    assert_eq!(body_string(res).await, "app");
}

#[tokio::test]
async fn test_regex_domain_and_regex_route() {
    let images = start_mock_backend("images").await;
    let rest = start_mock_backend("rest").await;
    let gw = gateway(&config(vec![DomainConfig {
        domain: r"[a-z]+\.tenant\.test".into(),
        domain_regex: true,
        proxy_routes: vec![
            RouteConfig {
                path: r"/img/\d+\.png".into(),
                regex: true,
                ..route("", &images.url())
            },
            route("/", &rest.url()),
        ],
        ..DomainConfig::default()
    }]));

    let res = get(&gw, "acme.tenant.test", "/img/42.png").await;
    assert_eq!(body_string(res).await, "images");

    // Full match only: a trailing suffix falls through to the next route.
    let res = get(&gw, "acme.tenant.test", "/img/42.png.bak").await;
    assert_eq!(body_string(res).await, "rest");

    let res = get(&gw, "evil.acme.tenant.test.com", "/").await;
    assert_status(&res, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_first_matching_domain_wins() {
    let first = start_mock_backend("first").await;
    let second = start_mock_backend("second").await;
    let gw = gateway(&config(vec![
        DomainConfig {
            domain: r".*\.test".into(),
            domain_regex: true,
            ..domain("", vec![route("/", &first.url())])
        },
        domain("app.test", vec![route("/", &second.url())]),
    ]));

    let res = get(&gw, "app.test", "/").await;
    assert_eq!(body_string(res).await, "first");
    assert_eq!(second.hits(), 0);
}

#[tokio::test]
async fn test_matched_domain_without_target_is_404_with_policies() {
    let backend = start_mock_backend("api").await;
    let mut d = domain("app.test", vec![route("/api", &backend.url())]);
    d.hsts = true;
    let gw = gateway(&config(vec![d]));

    let res = get(&gw, "app.test", "/elsewhere").await;
    assert_status(&res, StatusCode::NOT_FOUND);
    assert!(header(&res, "strict-transport-security").is_some());
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let gw = gateway(&GatewayConfig::default());
    let mut req = request("app.test", "/", "127.0.0.1");
    req.headers_mut()
        .insert("x-request-id", "trace-me".parse().unwrap());

    let res = gw.dispatch(req).await;
    assert_eq!(header(&res, "x-request-id").as_deref(), Some("trace-me"));
}
