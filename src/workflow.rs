//! Conversion workflow
//!
//! Runs the fixed sequence
//! `validate → download → upload → sheets → fields → parameters → export → emit`.
//! Every remote call is retried on its own; the first unrecovered failure
//! aborts the run and nothing is emitted.

use crate::client::ConversionClient;
use crate::config::ConversionConfig;
use crate::download::download_file;
use crate::error::{Error, Result};
use crate::mapping::create_field_mappings;
use crate::retry::with_retry;
use crate::types::{ExportSpec, OutputItem, Stage};
use crate::utils::normalize_url;
use tracing::{debug, info};

/// One conversion run
///
/// Holds no state between runs; construct one per invocation. Several
/// workflows may run concurrently and may share one `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ConversionWorkflow {
    config: ConversionConfig,
    http: reqwest::Client,
}

impl ConversionWorkflow {
    /// Create a workflow with its own HTTP client
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the HTTP client cannot be created
    pub fn new(config: ConversionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sheet-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;
        Ok(Self::with_client(config, http))
    }

    /// Create a workflow that reuses an existing HTTP client
    pub fn with_client(config: ConversionConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Configuration of this run
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Run the whole sequence and return the output items
    ///
    /// # Errors
    /// Returns the first unrecovered failure; see [`Error`] for the
    /// classification.
    pub async fn run(&self) -> Result<Vec<OutputItem>> {
        let config = &self.config;
        let retry = config.retry_config();

        debug!(stage = %Stage::Validating, "starting conversion run");
        config.validate()?;
        let service_endpoint = validated_url("service endpoint", &config.service_endpoint)?;
        let file_url = validated_url("file URL", &config.file_url)?;
        let client = ConversionClient::new(
            self.http.clone(),
            &service_endpoint,
            config.timeout(),
            config.auth_header.as_ref(),
        )?;

        info!(stage = %Stage::Downloading, url = %file_url, "downloading spreadsheet");
        let file = with_retry(&retry, Stage::Downloading.label(), || {
            download_file(&self.http, &file_url, config.timeout())
        })
        .await?;
        file.ensure_within_limit()?;

        info!(
            stage = %Stage::Uploading,
            size_mb = file.size_mb(),
            "uploading spreadsheet"
        );
        let document_id =
            with_retry(&retry, Stage::Uploading.label(), || client.upload(&file)).await?;
        drop(file);
        info!(document_id = %document_id, "spreadsheet uploaded");

        let sheets = with_retry(&retry, Stage::ListingSheets.label(), || {
            client.list_sheets(&document_id)
        })
        .await?;
        if sheets.is_empty() {
            return Err(Error::Validation(format!(
                "no sheets found in document {}",
                document_id
            )));
        }
        let sheet_index = usize::try_from(config.sheet_index)
            .ok()
            .filter(|index| *index < sheets.len())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "sheet index {} is out of range: document has {} sheet(s)",
                    config.sheet_index,
                    sheets.len()
                ))
            })?;
        info!(
            document_id = %document_id,
            sheet = %sheets[sheet_index].display_name(),
            sheet_index = sheet_index,
            sheet_count = sheets.len(),
            "sheet selected"
        );

        let fields = with_retry(&retry, Stage::ListingFields.label(), || {
            client.list_fields(&document_id, sheet_index, config.headers_row_index)
        })
        .await?;
        if fields.is_empty() {
            return Err(Error::Validation(format!(
                "no fields found in sheet {} at header row {}",
                sheet_index, config.headers_row_index
            )));
        }

        let mappings = create_field_mappings(
            &fields,
            &config.export_field_indexes,
            &config.custom_field_overrides,
        );
        let spec = ExportSpec {
            sheet_index,
            headers_row_index: config.headers_row_index,
            mapping: mappings.mapping,
            export_indexes: mappings.export_field_indexes,
        };
        info!(
            document_id = %document_id,
            field_count = fields.len(),
            exported_fields = spec.export_indexes.len(),
            "setting export parameters"
        );
        with_retry(&retry, Stage::SettingParameters.label(), || {
            client.set_parameters(&document_id, &spec)
        })
        .await?;

        let payload = with_retry(&retry, Stage::FetchingExport.label(), || {
            client.fetch_export(&document_id)
        })
        .await?;

        let items = payload.into_items();
        info!(
            stage = %Stage::Emitting,
            document_id = %document_id,
            items = items.len(),
            "conversion finished"
        );
        Ok(items)
    }
}

/// Run a conversion with a fresh HTTP client
///
/// # Example
///
/// ```no_run
/// use sheet_relay::{ConversionConfig, run_conversion};
///
/// # async fn example() -> sheet_relay::Result<()> {
/// let mut config = ConversionConfig::new(
///     "https://convert.example.com",
///     "https://files.example.com/price-list.xlsx",
/// );
/// config.export_field_indexes = vec![0, 1];
///
/// for item in run_conversion(config).await? {
///     println!("{}", item.json);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_conversion(config: ConversionConfig) -> Result<Vec<OutputItem>> {
    ConversionWorkflow::new(config)?.run().await
}

/// Validate a configured URL and add the implied `http://` scheme
fn validated_url(field: &'static str, url: &str) -> Result<String> {
    normalize_url(url).ok_or_else(|| Error::InvalidUrl {
        field,
        url: url.to_string(),
    })
}
