//! # sheet-relay
//!
//! Async client that drives a remote XLSX-to-JSON conversion service.
//!
//! A run downloads a spreadsheet, uploads it to the service, picks a sheet,
//! maps its columns, and fetches the exported records. Every remote call is
//! retried with exponential backoff; the first unrecovered failure aborts
//! the run and nothing is emitted.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheet_relay::{ConversionConfig, run_conversion};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = ConversionConfig::new(
//!         "https://convert.example.com",
//!         "https://files.example.com/models.xlsx",
//!     );
//!     config.export_field_indexes = vec![0, 1];
//!
//!     for item in run_conversion(config).await? {
//!         println!("{}", item.json);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! The same run is reachable over HTTP through [`api::start_api_server`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Conversion service client
pub mod client;
/// Configuration types
pub mod config;
/// Spreadsheet download with size cap
pub mod download;
/// Error types
pub mod error;
/// Column name mapping
pub mod mapping;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;
/// End-to-end conversion workflow
pub mod workflow;

// Re-export commonly used types
pub use client::ConversionClient;
pub use config::{ApiConfig, AuthHeader, Config, ConversionConfig, CustomFieldOverride, RetryConfig};
pub use download::{DownloadedFile, MAX_FILE_SIZE_BYTES};
pub use error::{Error, FailureReport, Result, ToHttpStatus};
pub use mapping::{FieldMappings, create_field_mappings};
pub use retry::{IsRetryable, with_retry};
pub use types::{DocumentId, ExportSpec, FieldDescriptor, OutputItem, SheetDescriptor, Stage};
pub use utils::is_valid_url;
pub use workflow::{ConversionWorkflow, run_conversion};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to Ctrl+C if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub(crate) async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
