//! Conversion service client
//!
//! Wraps the five calls of the remote XLSX conversion workflow:
//!
//! | Stage | Request |
//! |---|---|
//! | upload | `POST {base}/upload` (multipart, field `file`) |
//! | sheets | `GET {base}/documents/{id}/sheets` |
//! | fields | `GET {base}/documents/{id}/fields?headersIndex=&sheetIndex=` |
//! | parameters | `POST {base}/documents/{id}/parameters` |
//! | export | `GET {base}/documents/{id}/export` |
//!
//! Each call classifies its failures as transport, HTTP status or response
//! shape errors. None of them retries on its own; the workflow wraps every
//! call with [`crate::retry::with_retry`].

use crate::config::AuthHeader;
use crate::download::DownloadedFile;
use crate::error::{Error, Result};
use crate::types::{
    DocumentId, ExportPayload, ExportSpec, FieldDescriptor, ParametersRequest, SheetDescriptor,
    Stage,
};
use crate::utils::{trim_endpoint, upload_timeout};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// MIME type of the uploaded spreadsheet part
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Keys tried, in order, for the identifier in the upload response
const DOCUMENT_ID_KEYS: [&str; 2] = ["id", "documentId"];

/// Sheet list: bare array or `{sheets: [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum SheetsResponse {
    Bare(Vec<SheetDescriptor>),
    Wrapped { sheets: Vec<SheetDescriptor> },
}

impl From<SheetsResponse> for Vec<SheetDescriptor> {
    fn from(response: SheetsResponse) -> Self {
        match response {
            SheetsResponse::Bare(sheets) | SheetsResponse::Wrapped { sheets } => sheets,
        }
    }
}

/// Field list: bare array or `{fields: [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldsResponse {
    Bare(Vec<FieldDescriptor>),
    Wrapped { fields: Vec<FieldDescriptor> },
}

impl From<FieldsResponse> for Vec<FieldDescriptor> {
    fn from(response: FieldsResponse) -> Self {
        match response {
            FieldsResponse::Bare(fields) | FieldsResponse::Wrapped { fields } => fields,
        }
    }
}

/// Client for one conversion service endpoint
#[derive(Clone, Debug)]
pub struct ConversionClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    auth_header: Option<(HeaderName, HeaderValue)>,
}

impl ConversionClient {
    /// Create a client for `endpoint`
    ///
    /// Trailing slashes are stripped from the endpoint. The optional auth
    /// header is attached verbatim to every request.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the auth header name or value is not a
    /// legal HTTP header.
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        timeout: Duration,
        auth_header: Option<&AuthHeader>,
    ) -> Result<Self> {
        let auth_header = auth_header
            .map(|auth| {
                let name = HeaderName::from_bytes(auth.name.trim().as_bytes()).map_err(|e| {
                    Error::Config {
                        message: format!("invalid auth header name '{}': {}", auth.name, e),
                        key: Some("authHeader.name".to_string()),
                    }
                })?;
                let mut value = HeaderValue::from_str(&auth.value).map_err(|e| Error::Config {
                    message: format!("invalid auth header value: {}", e),
                    key: Some("authHeader.value".to_string()),
                })?;
                value.set_sensitive(true);
                Ok::<_, Error>((name, value))
            })
            .transpose()?;

        Ok(Self {
            http,
            base_url: trim_endpoint(endpoint).to_string(),
            timeout,
            auth_header,
        })
    }

    /// Base URL without trailing slashes
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, id: &DocumentId, resource: &str) -> String {
        format!(
            "{}/documents/{}/{}",
            self.base_url,
            urlencoding::encode(id.as_str()),
            resource
        )
    }

    fn request(&self, method: Method, url: &str, timeout: Duration) -> RequestBuilder {
        let request = self.http.request(method, url).timeout(timeout);
        match &self.auth_header {
            Some((name, value)) => request.header(name.clone(), value.clone()),
            None => request,
        }
    }

    /// Upload the spreadsheet and return the service-side document id
    ///
    /// The per-attempt timeout grows with the file size, see
    /// [`upload_timeout`].
    pub async fn upload(&self, file: &DownloadedFile) -> Result<DocumentId> {
        let url = format!("{}/upload", self.base_url);
        let timeout = upload_timeout(self.timeout, file.size_bytes);

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(XLSX_MIME_TYPE)
            .map_err(|e| transport_error(Stage::Uploading, &url, &e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(
            url = %url,
            size_bytes = file.size_bytes,
            timeout_secs = timeout.as_secs(),
            "uploading spreadsheet"
        );

        let request = self.request(Method::POST, &url, timeout).multipart(form);
        let body = send_json(Stage::Uploading, &url, request).await?;

        let Value::Object(map) = &body else {
            return Err(Error::shape(
                Stage::Uploading,
                &url,
                "response is not a JSON object",
                Some(body.to_string()),
            ));
        };

        DOCUMENT_ID_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(DocumentId::from_json)
            .ok_or_else(|| {
                Error::shape(
                    Stage::Uploading,
                    &url,
                    "response missing id field",
                    Some(body.to_string()),
                )
            })
    }

    /// List the sheets of an uploaded document
    pub async fn list_sheets(&self, id: &DocumentId) -> Result<Vec<SheetDescriptor>> {
        let url = self.document_url(id, "sheets");
        let request = self.request(Method::GET, &url, self.timeout);
        let body = send_json(Stage::ListingSheets, &url, request).await?;

        decode_list::<SheetsResponse>(Stage::ListingSheets, &url, body, "sheets").map(Into::into)
    }

    /// List the columns of one sheet, named after the given header row
    pub async fn list_fields(
        &self,
        id: &DocumentId,
        sheet_index: usize,
        headers_row_index: u32,
    ) -> Result<Vec<FieldDescriptor>> {
        let url = self.document_url(id, "fields");
        let request = self
            .request(Method::GET, &url, self.timeout)
            .query(&[
                ("headersIndex", headers_row_index.to_string()),
                ("sheetIndex", sheet_index.to_string()),
            ]);
        let body = send_json(Stage::ListingFields, &url, request).await?;

        decode_list::<FieldsResponse>(Stage::ListingFields, &url, body, "fields").map(Into::into)
    }

    /// Send the export parameters
    ///
    /// The service must answer with a truthy `success` field.
    pub async fn set_parameters(&self, id: &DocumentId, spec: &ExportSpec) -> Result<()> {
        let url = self.document_url(id, "parameters");
        let request = self
            .request(Method::POST, &url, self.timeout)
            .json(&ParametersRequest::from(spec));
        let body = send_json(Stage::SettingParameters, &url, request).await?;

        if body.get("success").is_some_and(is_truthy) {
            Ok(())
        } else {
            Err(Error::shape(
                Stage::SettingParameters,
                &url,
                "service did not confirm the parameters",
                Some(body.to_string()),
            ))
        }
    }

    /// Fetch the exported records
    pub async fn fetch_export(&self, id: &DocumentId) -> Result<ExportPayload> {
        let url = self.document_url(id, "export");
        let request = self.request(Method::GET, &url, self.timeout);
        let body = send_json(Stage::FetchingExport, &url, request).await?;

        Ok(ExportPayload::from_value(body))
    }
}

/// Send a request and return the successful response
///
/// Transport failures and non-2xx statuses are classified here.
pub(crate) async fn send(stage: Stage, url: &str, request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(stage, url, &e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Service {
            stage,
            endpoint: url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        });
    }

    Ok(response)
}

/// Send a request and decode the successful response body as JSON
async fn send_json(stage: Stage, url: &str, request: RequestBuilder) -> Result<Value> {
    let response = send(stage, url, request).await?;
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(stage, url, &e))?;

    serde_json::from_str(&text).map_err(|e| {
        Error::shape(
            stage,
            url,
            format!("response is not valid JSON: {}", e),
            Some(text),
        )
    })
}

fn decode_list<T: DeserializeOwned>(stage: Stage, url: &str, body: Value, key: &str) -> Result<T> {
    let raw = body.to_string();
    serde_json::from_value(body).map_err(|_| {
        Error::shape(
            stage,
            url,
            format!("response is not an array or an object with a '{}' array", key),
            Some(raw),
        )
    })
}

pub(crate) fn transport_error(stage: Stage, url: &str, e: &reqwest::Error) -> Error {
    let message = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };

    Error::Transport {
        stage,
        endpoint: url.to_string(),
        message,
        timed_out: e.is_timeout(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
