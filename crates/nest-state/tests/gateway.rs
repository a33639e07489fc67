//! Gateway request wrapping behavior.

mod fixtures;

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::FakeProvider;
use nest_state::{Gateway, IdentityProvider, RequestBody, RequestOptions};

async fn mock_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_header_attached_when_signed_in() {
    let server = MockServer::start().await;
    mock_ping(&server).await;

    let provider = FakeProvider::signed_in("u1", false);
    let gateway =
        Gateway::new(server.uri(), provider.clone() as Arc<dyn IdentityProvider>).unwrap();

    let response = gateway.get("/ping").await.unwrap();
    assert_eq!(response.status(), 200);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer token-u1"
    );
}

#[tokio::test]
async fn test_anonymous_request_has_no_bearer_header() {
    let server = MockServer::start().await;
    mock_ping(&server).await;

    let provider = FakeProvider::anonymous();
    let gateway =
        Gateway::new(server.uri(), provider.clone() as Arc<dyn IdentityProvider>).unwrap();

    gateway.get("/ping").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_token_failure_degrades_to_unauthenticated() {
    let server = MockServer::start().await;
    mock_ping(&server).await;

    let provider = FakeProvider::signed_in("u1", false);
    provider.break_tokens();
    let gateway =
        Gateway::new(server.uri(), provider.clone() as Arc<dyn IdentityProvider>).unwrap();

    // The call still goes out; it just carries no credential.
    let response = gateway.get("/ping").await.unwrap();
    assert_eq!(response.status(), 200);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_json_content_type_set_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let provider = FakeProvider::anonymous();
    let gateway =
        Gateway::new(server.uri(), provider.clone() as Arc<dyn IdentityProvider>).unwrap();

    gateway.put_json("/data", json!({"k": "v"})).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_caller_content_type_wins() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let provider = FakeProvider::anonymous();
    let gateway =
        Gateway::new(server.uri(), provider.clone() as Arc<dyn IdentityProvider>).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    gateway
        .request(
            "/data",
            RequestOptions {
                method: Method::PUT,
                headers,
                body: Some(RequestBody::Json(json!("raw"))),
            },
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "text/plain"
    );
}

#[tokio::test]
async fn test_unauthorized_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = FakeProvider::anonymous();
    let gateway =
        Gateway::new(server.uri(), provider.clone() as Arc<dyn IdentityProvider>).unwrap();

    // 401 is a caller decision, not a gateway error.
    let response = gateway.get("/private").await.unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_absolute_endpoint_bypasses_base_url() {
    let server = MockServer::start().await;
    mock_ping(&server).await;

    let provider = FakeProvider::anonymous();
    let gateway = Gateway::new(
        "http://base-url.invalid",
        provider.clone() as Arc<dyn IdentityProvider>,
    )
    .unwrap();

    let response = gateway
        .get(&format!("{}/ping", server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let provider = FakeProvider::anonymous();
    assert!(Gateway::new("not a url", provider as Arc<dyn IdentityProvider>).is_err());
}
