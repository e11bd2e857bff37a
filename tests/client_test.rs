//! HTTP client tests against a mock management API.

use promote::client::{ApiError, HttpClient, RemoteApi, list_as};
use promote::models::Role;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(&format!("{}/", server.uri()), "secret").unwrap()
}

#[tokio::test]
async fn test_list_unwraps_envelope_and_requests_all_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .and(query_param("limit", "-1"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "r1", "name": "Editor" }, { "id": "r2", "name": "Viewer" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server).await;
    let roles: Vec<Role> = list_as(&api, "roles").await.unwrap();
    assert_eq!(roles.len(), 2);
    assert_eq!(roles[1].name, "Viewer");
}

#[tokio::test]
async fn test_list_null_data_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let api = client(&server).await;
    assert!(api.list("flows").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_rejects_non_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": "r1" } })))
        .mount(&server)
        .await;

    let api = client(&server).await;
    let err = api.list("roles").await.unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
    assert!(err.to_string().contains("expected a list of roles"));
}

#[tokio::test]
async fn test_snapshot_keeps_envelope() {
    let server = MockServer::start().await;
    let document = json!({
        "data": { "version": 1, "collections": [{ "collection": "articles" }] }
    });
    Mock::given(method("GET"))
        .and(path("/schema/snapshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document.clone()))
        .mount(&server)
        .await;

    let api = client(&server).await;
    assert_eq!(api.snapshot().await.unwrap(), document);
}

#[tokio::test]
async fn test_create_posts_body_and_returns_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fields/articles"))
        .and(body_json(json!({ "field": "title", "type": "string" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "collection": "articles", "field": "title" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server).await;
    let item = api
        .create("fields/articles", &json!({ "field": "title", "type": "string" }))
        .await
        .unwrap();
    assert_eq!(item["field"], "title");
}

#[tokio::test]
async fn test_patch_targets_item_path() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/operations/op-1"))
        .and(body_json(json!({ "resolve": "op-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "op-1", "resolve": "op-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server).await;
    let item = api
        .patch("operations", "op-1", &json!({ "resolve": "op-2" }))
        .await
        .unwrap();
    assert_eq!(item["resolve"], "op-2");
}

#[tokio::test]
async fn test_structured_error_message_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{
                "message": "Collection \"articles\" already exists.",
                "extensions": { "code": "INVALID_PAYLOAD" }
            }]
        })))
        .mount(&server)
        .await;

    let api = client(&server).await;
    let err = api
        .create("collections", &json!({ "collection": "articles" }))
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Collection \"articles\" already exists.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_raw_error_body_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/permissions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let api = client(&server).await;
    let err = api.list("permissions").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
}

#[tokio::test]
async fn test_empty_error_body_reports_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/roles"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let api = client(&server).await;
    let err = api
        .create("roles", &json!({ "name": "Editor" }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 400: Bad Request");
}

#[tokio::test]
async fn test_unreachable_instance_is_transport_error() {
    let api = HttpClient::new("http://127.0.0.1:1", "secret").unwrap();
    let err = api.snapshot().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
