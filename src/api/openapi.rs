//! OpenAPI documentation and schema generation
//!
//! Compile-time spec generation via utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the sheet-relay REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "sheet-relay REST API",
        version = "0.1.0",
        description = "Runs spreadsheet conversions against a remote conversion service and returns the exported records",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        crate::api::routes::convert,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::config::ConversionConfig,
        crate::config::AuthHeader,
        crate::config::CustomFieldOverride,
        crate::api::routes::ConvertResponse,
        crate::types::OutputItem,
        crate::types::Stage,
        crate::api::error_response::ErrorResponse,
        crate::error::FailureReport,
    )),
    tags(
        (name = "conversion", description = "Conversion runs - Download, upload, map fields and export"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
