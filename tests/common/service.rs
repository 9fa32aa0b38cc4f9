//! Mock conversion service and file host built on wiremock

use serde_json::{Value, json};
use sheet_relay::ConversionConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Document id returned by the mock upload endpoint
pub const DOCUMENT_ID: &str = "67cc3e5f2a9b4c0012ab34cd";

/// Path the mock server serves the spreadsheet from
pub const FILE_PATH: &str = "/files/models.xlsx";

/// Bytes standing in for a spreadsheet; the mock service never parses them
pub const FAKE_XLSX: &[u8] = b"PK\x03\x04fake-xlsx-content";

/// Conversion config pointing both URLs at `server`, with a short retry delay
pub fn config_for(server: &MockServer) -> ConversionConfig {
    let mut config = ConversionConfig::new(server.uri(), format!("{}{}", server.uri(), FILE_PATH));
    config.retry_delay_ms = 5;
    config
}

/// Path of a per-document resource on the mock service
pub fn document_path(resource: &str) -> String {
    format!("/documents/{DOCUMENT_ID}/{resource}")
}

/// Serve `body` as the spreadsheet download
pub async fn mount_file(server: &MockServer, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(FILE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Answer `verb path` with a 200 JSON body
pub async fn mount_json(server: &MockServer, verb: &str, route: &str, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount every step of a healthy service up to, but not including, export
pub async fn mount_service(server: &MockServer, sheets: Value, fields: Value) {
    mount_json(server, "POST", "/upload", json!({"id": DOCUMENT_ID})).await;
    mount_json(server, "GET", &document_path("sheets"), sheets).await;
    mount_json(server, "GET", &document_path("fields"), fields).await;
    mount_json(
        server,
        "POST",
        &document_path("parameters"),
        json!({"success": true}),
    )
    .await;
}
