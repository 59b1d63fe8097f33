//! HTTP surface tests driven through the full router with `oneshot`.

use std::sync::Arc;

use aviary_server::network::{NetworkConfig, NetworkModule};
use aviary_server::service::domain::builtin_modules;
use aviary_server::service::{Registry, ServiceConfig};
use aviary_server::storage::MemoryStore;
use aviary_server::traits::SightingStore;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    let store: Arc<dyn SightingStore> = Arc::new(MemoryStore::new());
    let registry = Registry::build(&builtin_modules(&store), &ServiceConfig::default()).unwrap();
    NetworkModule::new(NetworkConfig::default(), Arc::new(registry)).build_router()
}

async fn send(router: &Router, method: Method, path: &str, body: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, "aviary.test:8080")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn post_json(router: &Router, path: &str, body: &str) -> Value {
    let (status, bytes) = send(router, Method::POST, path, body).await;
    assert_eq!(status, StatusCode::OK, "dispatch always answers 200");
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn index_serves_banner() {
    let (status, body) = send(&router(), Method::GET, "/", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "Welcome to the Aviary backend");
}

#[tokio::test]
async fn sightings_round_trip_through_dispatch() {
    let router = router();

    let put = post_json(
        &router,
        "/birds/put",
        r#"{"name":"kestrel","long":4.35,"lat":50.85}"#,
    )
    .await;
    assert_eq!(put["statusCode"], 0);
    assert_eq!(put["data"]["name"], "kestrel");
    assert!(put["data"]["_id"].is_string());

    let get = post_json(&router, "/birds/get", "").await;
    assert_eq!(get["statusCode"], 0);
    assert_eq!(get["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn node_upsert_keeps_local_id() {
    let router = router();
    post_json(&router, "/node/put", r#"{"_id":"n1","long":1.0,"lat":2.0}"#).await;
    post_json(&router, "/node/put", r#"{"_id":"n2","long":3.0,"lat":4.0}"#).await;
    let moved = post_json(&router, "/node/put", r#"{"_id":"n1","long":9.0,"lat":9.0}"#).await;
    assert_eq!(moved["data"]["localId"], 0);

    let nodes = post_json(&router, "/node/get", "").await;
    let ids: Vec<&str> = nodes["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["n1", "n2"]);
}

#[tokio::test]
async fn unknown_namespace_is_controller_not_found() {
    let env = post_json(&router(), "/gadgets/list", "").await;
    assert_eq!(env, json!({ "statusCode": 2, "error": "Controller not found" }));
}

#[tokio::test]
async fn unknown_operation_is_service_not_found() {
    let env = post_json(&router(), "/birds/delete", "").await;
    assert_eq!(env, json!({ "statusCode": 3, "error": "Service not found" }));
}

#[tokio::test]
async fn root_post_is_controller_not_found() {
    let env = post_json(&router(), "/", "").await;
    assert_eq!(env["statusCode"], 2);
}

#[tokio::test]
async fn post_to_probe_paths_is_dispatched() {
    let router = router();
    for path in ["/health", "/health/live", "/health/ready"] {
        let env = post_json(&router, path, "").await;
        assert_eq!(
            env,
            json!({ "statusCode": 2, "error": "Controller not found" }),
            "{path}"
        );
    }
}

#[tokio::test]
async fn form_encoded_sighting_is_accepted() {
    let router = router();
    let request = Request::post("/birds/put")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=blue+tit&long=4.35&lat=50.85"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let env: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(env["statusCode"], 0);
    assert_eq!(env["data"]["name"], "blue tit");
    assert_eq!(env["data"]["long"], 4.35);
}

#[tokio::test]
async fn sighting_without_position_is_stored() {
    let env = post_json(&router(), "/birds/put", r#"{"name":"robin"}"#).await;
    assert_eq!(env["statusCode"], 0);
    assert!(env["data"].get("lat").is_none());
}

#[tokio::test]
async fn query_string_does_not_affect_lookup() {
    let env = post_json(&router(), "/birds/get?limit=5", "").await;
    assert_eq!(env["statusCode"], 0);
}

#[tokio::test]
async fn malformed_json_is_unknown_with_200() {
    let env = post_json(&router(), "/birds/put", "{oops").await;
    assert_eq!(env["statusCode"], 1);
    assert!(env["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(env.get("data").is_none());
}

#[tokio::test]
async fn invalid_bird_body_is_unknown() {
    let env = post_json(&router(), "/birds/put", r#"{"name":"jay","long":"east"}"#).await;
    assert_eq!(env["statusCode"], 1);
}

#[tokio::test]
async fn explore_lists_every_operation_for_the_caller_host() {
    let listing = post_json(&router(), "/explore", "").await;
    assert_eq!(
        listing,
        json!({
            "Routes for birds": [
                "http://aviary.test:8080/birds/get",
                "http://aviary.test:8080/birds/put"
            ],
            "Routes for node": [
                "http://aviary.test:8080/node/get",
                "http://aviary.test:8080/node/put"
            ]
        })
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let request = Request::post("/birds/get").body(Body::empty()).unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn health_reports_relay_and_lifecycle() {
    let (status, body) = send(&router(), Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["state"], "starting");
    assert_eq!(health["relay_connections"], 0);
    assert_eq!(health["namespaces"], 2);
}
