//! Shared setup for the API integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use promo_api::setup::{routes::setup_routes, services::build_state};
use promo_api::AppState;
use promo_core::Config;
use promo_extract::{ExtractionClient, HttpExtractionBackend};
use serde_json::Value;
use wiremock::MockServer;

pub const PDF: &str = "application/pdf";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

/// Environment for a test app; extraction always points at `extraction`.
#[derive(Default)]
pub struct TestEnv {
    pub vars: HashMap<&'static str, String>,
}

impl TestEnv {
    pub fn new(extraction: &MockServer) -> Self {
        let mut env = Self::default();
        env.vars
            .insert("EXTRACTION_URL", format!("{}/extract", extraction.uri()));
        env
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.vars.insert(key, value.into());
        self
    }

    pub fn config(&self) -> Config {
        Config::from_lookup(|key| self.vars.get(key).cloned()).expect("valid test config")
    }
}

pub fn spawn_app(env: TestEnv) -> TestApp {
    let config = env.config();
    config.validate().expect("test config validates");

    let backend = HttpExtractionBackend::new(
        config.extraction_url(),
        config.extraction_api_key().map(str::to_string),
    )
    .expect("extraction backend");
    let extraction = ExtractionClient::new(
        Arc::new(backend),
        Duration::from_secs(config.extraction_timeout_secs()),
        Duration::from_secs(config.workbook_timeout_secs()),
    );

    let state = build_state(&config, extraction.clone(), Arc::new(extraction))
        .expect("application state");
    let router = setup_routes(&config, state.clone()).expect("router");
    let server = TestServer::new(router).expect("test server");

    TestApp { server, state }
}

pub fn products_body(products: &[(&str, &str)]) -> Value {
    let products: Vec<Value> = products
        .iter()
        .map(|(code, brand)| {
            serde_json::json!({
                "providerCode": "PRV-1",
                "productCode": code,
                "description": format!("Producto {}", code),
                "brand": brand,
                "category": "Almacen",
                "discountDescription": "2x1"
            })
        })
        .collect();
    serde_json::json!({ "products": products })
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    promo_extract::data_uri::encode(mime, bytes)
}

/// Polls the detail endpoint until the file reaches `status`.
pub async fn wait_for_status(app: &TestApp, id: &str, status: &str) -> Value {
    let poll = async {
        loop {
            let detail: Value = app
                .server
                .get(&format!("/api/v0/files/{}", id))
                .await
                .json();
            if detail["status"] == status {
                return detail;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), poll)
        .await
        .unwrap_or_else(|_| panic!("file {} never reached {}", id, status))
}
