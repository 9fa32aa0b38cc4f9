//! Conversion handler

use super::ConvertResponse;
use crate::api::AppState;
use crate::config::ConversionConfig;
use crate::workflow::ConversionWorkflow;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /convert - Run a conversion
///
/// Downloads the spreadsheet, drives the conversion service and returns the
/// exported records. A failure at any stage returns no items.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "conversion",
    request_body = ConversionConfig,
    responses(
        (status = 200, description = "Conversion finished", body = ConvertResponse),
        (status = 400, description = "Invalid URL or configuration", body = crate::api::error_response::ErrorResponse),
        (status = 413, description = "Spreadsheet exceeds 50 MB", body = crate::api::error_response::ErrorResponse),
        (status = 422, description = "Sheet index out of range or empty sheet/field list", body = crate::api::error_response::ErrorResponse),
        (status = 502, description = "Conversion service failed", body = crate::api::error_response::ErrorResponse),
        (status = 504, description = "Conversion service timed out", body = crate::api::error_response::ErrorResponse)
    )
)]
pub async fn convert(
    State(state): State<AppState>,
    Json(config): Json<ConversionConfig>,
) -> Response {
    let workflow = ConversionWorkflow::with_client(config, state.http.clone());

    match workflow.run().await {
        Ok(items) => (
            StatusCode::OK,
            Json(ConvertResponse {
                count: items.len(),
                items,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "conversion run failed");
            e.into_response()
        }
    }
}
