//! HTTP API integration tests.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::TestServer;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn put_request(name: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/v1/files/{name}"))
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

fn get_request(name: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/v1/files/{name}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn put_then_get_round_trip() {
    let server = TestServer::new().await;

    let put = server
        .router
        .clone()
        .oneshot(put_request("hello.txt", b"hello multi-part world"))
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::OK);

    let get = server
        .router
        .clone()
        .oneshot(get_request("hello.txt"))
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(
        get.headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok()),
        Some("22")
    );

    let bytes = get.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"hello multi-part world");
}

#[tokio::test]
async fn empty_file_round_trip() {
    let server = TestServer::new().await;

    let put = server
        .router
        .clone()
        .oneshot(put_request("empty", b""))
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::OK);

    let get = server
        .router
        .clone()
        .oneshot(get_request("empty"))
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);
    let bytes = get.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn put_without_content_length_is_rejected() {
    let server = TestServer::new().await;

    let request = Request::builder()
        .method("PUT")
        .uri("/v1/files/nolength")
        .body(Body::from("data"))
        .unwrap();

    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "bad_request");

    // Nothing was stored under that name.
    let get = server
        .router
        .clone()
        .oneshot(get_request("nolength"))
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_with_short_body_is_rejected() {
    let server = TestServer::new().await;

    let request = Request::builder()
        .method("PUT")
        .uri("/v1/files/short")
        .header(header::CONTENT_LENGTH, 100)
        .body(Body::from("only a few bytes"))
        .unwrap();

    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "body_length_mismatch");
}

#[tokio::test]
async fn get_unknown_file_is_not_found() {
    let server = TestServer::new().await;

    let response = server
        .router
        .clone()
        .oneshot(get_request("ghost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn duplicate_upload_conflicts() {
    let server = TestServer::new().await;

    let first = server
        .router
        .clone()
        .oneshot(put_request("taken", b"original content"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = server
        .router
        .clone()
        .oneshot(put_request("taken", b"replacement bytes"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // The original content is untouched.
    let get = server
        .router
        .clone()
        .oneshot(get_request("taken"))
        .await
        .unwrap();
    let bytes = get.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"original content");
}

#[tokio::test]
async fn health_check_reports_ok() {
    let server = TestServer::new().await;

    let request = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(Body::empty())
        .unwrap();

    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}
