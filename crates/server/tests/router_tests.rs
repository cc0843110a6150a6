//! HTTP handler tests for the gateway router.
//!
//! Exercises every branch of the request contract: preflight, demo redirect,
//! callback echo and delegation to the issuer, plus the CORS guarantees that
//! hold across all of them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use axum_test::TestServer;
use safemore_auth::AppResources;
use safemore_auth::api;
use safemore_auth::config::{AppConfig, CorsConfig, DemoConfig, IssuerConfig};
use safemore_auth::cors::CorsPolicy;
use safemore_auth::issuer::Issuer;
use url::Url;

/// Stand-in for the issuer collaborator: echoes the request path and stamps
/// its own CORS header so tests can prove the gateway overwrites it.
struct EchoIssuer;

#[async_trait]
impl Issuer for EchoIssuer {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        let mut response = (StatusCode::IM_A_TEAPOT, "issuer response").into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://issuer.invalid"),
        );
        response.headers_mut().insert(
            HeaderName::from_static("x-issuer-path"),
            HeaderValue::from_str(&path_and_query).expect("path header"),
        );
        response
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        issuer: IssuerConfig {
            upstream_url: "http://issuer.internal:8788".into(),
        },
        cors: CorsConfig::default(),
        demo: DemoConfig {
            client_id: "demo-client-123".into(),
        },
        code_delivery: Default::default(),
        smtp: None,
        theme: Default::default(),
    }
}

async fn test_server() -> TestServer {
    let config = Arc::new(test_config());
    let policy = CorsPolicy::from_config(&config.cors).expect("policy");
    let resources = AppResources { config };
    let app = api::app(resources, Arc::new(EchoIssuer), policy);
    TestServer::new(app).expect("test server")
}

fn assert_cors_headers(response: &axum_test::TestResponse) {
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "https://safemore.pl"
    );
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_METHODS),
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_HEADERS),
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn options_preflight_is_terminal_on_any_path() {
    let server = test_server().await;

    for path in ["/", "/callback", "/authorize", "/token", "/anything"] {
        let response = server.method(Method::OPTIONS, path).await;
        assert_eq!(
            response.status_code(),
            StatusCode::NO_CONTENT,
            "preflight on {path}"
        );
        assert!(response.text().is_empty(), "preflight body on {path}");
        assert_cors_headers(&response);
        // Preflights never reach the issuer.
        assert!(response.maybe_header("x-issuer-path").is_none());
    }
}

#[tokio::test]
async fn root_redirects_into_the_authorize_flow() {
    let server = test_server().await;

    let response = server
        .get("/?foo=bar")
        .add_header(header::HOST, HeaderValue::from_static("auth.example.test"))
        .add_header(
            HeaderName::from_static("x-forwarded-proto"),
            HeaderValue::from_static("https"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_cors_headers(&response);

    let location = response.header(header::LOCATION);
    let location = Url::parse(location.to_str().expect("location str")).expect("location url");
    assert_eq!(location.origin().ascii_serialization(), "https://auth.example.test");
    assert_eq!(location.path(), "/authorize");

    let params: HashMap<String, String> = location
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "demo-client-123");
    assert_eq!(params["redirect_uri"], "https://auth.example.test/callback");
    assert_eq!(params["foo"], "bar", "incoming query parameters survive");
}

#[tokio::test]
async fn root_redirect_overrides_flow_parameters_from_the_query() {
    let server = test_server().await;

    let response = server
        .get("/?client_id=attacker&response_type=token")
        .add_header(header::HOST, HeaderValue::from_static("auth.example.test"))
        .await;

    assert_eq!(response.status_code(), StatusCode::FOUND);
    let location = response.header(header::LOCATION);
    let location = Url::parse(location.to_str().expect("location str")).expect("location url");
    let params: Vec<(String, String)> = location
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let client_ids: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "client_id")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(client_ids, vec!["demo-client-123"]);

    let response_types: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "response_type")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(response_types, vec!["code"]);
}

#[tokio::test]
async fn demo_paths_route_by_path_not_method() {
    let server = test_server().await;

    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let response = server.method(method.clone(), "/").await;
        assert_eq!(
            response.status_code(),
            StatusCode::FOUND,
            "{method} / still redirects"
        );
        assert_cors_headers(&response);

        let response = server.method(method.clone(), "/callback?code=abc").await;
        assert_eq!(
            response.status_code(),
            StatusCode::OK,
            "{method} /callback still echoes"
        );
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "OAuth flow complete!");
        assert_eq!(body["params"]["code"], "abc");
    }
}

#[tokio::test]
async fn callback_echoes_query_parameters_as_json() {
    let server = test_server().await;

    let response = server.get("/callback?a=1&b=2").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response
            .header(header::CONTENT_TYPE)
            .to_str()
            .expect("content type"),
        "application/json"
    );
    assert_cors_headers(&response);

    let body: serde_json::Value = response.json();
    assert_eq!(
        body,
        serde_json::json!({
            "message": "OAuth flow complete!",
            "params": { "a": "1", "b": "2" }
        })
    );
}

#[tokio::test]
async fn unknown_paths_are_delegated_to_the_issuer() {
    let server = test_server().await;

    let response = server.get("/token?grant_type=authorization_code").await;

    // Status, body and issuer headers survive untouched...
    assert_eq!(response.status_code(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.text(), "issuer response");
    assert_eq!(
        response.header("x-issuer-path"),
        "/token?grant_type=authorization_code"
    );
    // ...except the CORS headers, which the gateway owns.
    assert_cors_headers(&response);
}

#[tokio::test]
async fn every_branch_carries_the_cors_policy() {
    let server = test_server().await;

    let responses = vec![
        server.method(Method::OPTIONS, "/authorize").await,
        server.get("/").await,
        server.get("/callback").await,
        server.get("/healthz").await,
        server.post("/token").await,
    ];
    for response in &responses {
        assert_cors_headers(response);
    }
}

#[tokio::test]
async fn health_check_responds_ok() {
    let server = test_server().await;

    let response = server.get("/healthz").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");
}
