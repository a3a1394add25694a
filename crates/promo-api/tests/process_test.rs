//! `/process` integration tests.

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use helpers::{data_uri, products_body, spawn_app, wait_for_status, TestEnv, PDF};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_process_explains_usage() {
    let extraction = MockServer::start().await;
    let app = spawn_app(TestEnv::new(&extraction));

    let response = app.server.get("/process").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({ "message": "This endpoint is for processing files via POST request." })
    );
}

#[tokio::test]
async fn test_process_pdf_returns_products() {
    let extraction = MockServer::start().await;
    let uri = data_uri(PDF, b"%PDF-1.4 ofertas");
    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({ "fileType": "pdf", "fileDataUri": uri })))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body(&[
            ("7790001", "Dove"),
            ("7790002", "Axe"),
        ])))
        .expect(1)
        .mount(&extraction)
        .await;
    let app = spawn_app(TestEnv::new(&extraction));

    let response = app
        .server
        .post("/process")
        .json(&json!({ "type": "pdf", "file": uri }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["product_code"], "7790001");

    // Nothing is tracked for inline processing.
    let list: Value = app.server.get("/api/v0/files").await.json();
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_process_accepts_extraction_field_names() {
    let extraction = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({ "fileType": "excel" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body(&[("1", "Dove")])))
        .expect(1)
        .mount(&extraction)
        .await;
    let app = spawn_app(TestEnv::new(&extraction));

    let csv = "codigo,marca\n1,Dove\n";
    let response = app
        .server
        .post("/process")
        .json(&json!({
            "fileType": "excel",
            "fileDataUri": data_uri("text/csv", csv.as_bytes())
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["products"][0]["brand"], "Dove");
}

#[tokio::test]
async fn test_process_rejects_malformed_body() {
    let extraction = MockServer::start().await;
    let app = spawn_app(TestEnv::new(&extraction));

    let response = app
        .server
        .post("/process")
        .json(&json!({ "type": "pdf" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid request body.");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_process_rejects_invalid_data_uri_and_type() {
    let extraction = MockServer::start().await;
    let app = spawn_app(TestEnv::new(&extraction));

    let not_a_uri = app
        .server
        .post("/process")
        .json(&json!({ "type": "pdf", "file": "JVBERi0xLjQ=" }))
        .await;
    assert_eq!(not_a_uri.status_code(), 400);

    let bad_type = app
        .server
        .post("/process")
        .json(&json!({ "type": "word", "file": data_uri(PDF, b"%PDF") }))
        .await;
    assert_eq!(bad_type.status_code(), 400);
}

#[tokio::test]
async fn test_process_reports_extraction_failure() {
    let extraction = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "model crashed",
            "error": "boom"
        })))
        .mount(&extraction)
        .await;
    let app = spawn_app(TestEnv::new(&extraction));

    let response = app
        .server
        .post("/process")
        .json(&json!({ "type": "pdf", "file": data_uri(PDF, b"%PDF-1.4") }))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["message"], "Internal Server Error during file processing.");
    assert!(body["error"].as_str().unwrap().contains("model crashed"));
}

#[tokio::test]
async fn test_process_waits_for_the_queued_extraction() {
    let extraction = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(products_body(&[("7790001", "Dove")]))
                .set_delay(Duration::from_millis(600)),
        )
        .expect(3)
        .mount(&extraction)
        .await;
    let app = spawn_app(TestEnv::new(&extraction));
    let started = tokio::time::Instant::now();

    let upload = app
        .server
        .post("/api/v0/files")
        .multipart(
            MultipartForm::new().add_part(
                "file",
                Part::bytes(Bytes::from_static(b"%PDF-1.4 cola"))
                    .file_name("cola.pdf")
                    .mime_type(PDF),
            ),
        )
        .await;
    assert_eq!(upload.status_code(), 201);
    let body: Value = upload.json();
    let id = body["accepted"][0]["id"].as_str().unwrap().to_string();

    let first = async {
        app.server
            .post("/process")
            .json(&json!({ "type": "pdf", "file": data_uri(PDF, b"%PDF-1.4 uno") }))
            .await
    };
    let second = async {
        app.server
            .post("/process")
            .json(&json!({ "type": "pdf", "file": data_uri(PDF, b"%PDF-1.4 dos") }))
            .await
    };
    let in_flight = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        extraction.received_requests().await.unwrap().len()
    };

    let (first, second, in_flight) = tokio::join!(first, second, in_flight);
    assert_eq!(in_flight, 1);
    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 200);
    assert!(started.elapsed() >= Duration::from_millis(1800));
    wait_for_status(&app, &id, "done").await;
}
