//! Spreadsheet download
//!
//! The whole file is held in memory; it is uploaded as one multipart part.

use crate::client::{send, transport_error};
use crate::error::{Error, Result};
use crate::types::Stage;
use crate::utils::{BYTES_PER_MB, size_in_mb};
use reqwest::header::CONTENT_LENGTH;
use std::time::Duration;

/// Largest spreadsheet accepted for upload (50 MB)
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * BYTES_PER_MB;

/// Name used for the upload part when the URL has no usable file name
const FALLBACK_FILE_NAME: &str = "spreadsheet.xlsx";

/// A downloaded spreadsheet
#[derive(Clone, Debug)]
pub struct DownloadedFile {
    /// Raw file content
    pub bytes: Vec<u8>,
    /// Size from the content-length header, or the downloaded byte count
    pub size_bytes: u64,
    /// File name sent with the upload
    pub file_name: String,
}

impl DownloadedFile {
    /// Size in megabytes
    pub fn size_mb(&self) -> f64 {
        size_in_mb(self.size_bytes)
    }

    /// Reject files larger than [`MAX_FILE_SIZE_BYTES`]
    pub fn ensure_within_limit(&self) -> Result<()> {
        check_size(self.size_bytes)
    }
}

fn check_size(size_bytes: u64) -> Result<()> {
    if size_bytes > MAX_FILE_SIZE_BYTES {
        return Err(Error::SizeLimit {
            size_bytes,
            limit_bytes: MAX_FILE_SIZE_BYTES,
        });
    }
    Ok(())
}

/// Download a file into memory
///
/// A content-length header above [`MAX_FILE_SIZE_BYTES`] aborts before the
/// body is read. Without one, the body is read chunk by chunk and the
/// transfer stops as soon as the cap is passed.
///
/// # Errors
/// - [`Error::Transport`] if the request or body transfer fails
/// - [`Error::Service`] for non-2xx responses
/// - [`Error::SizeLimit`] if content-length or the bytes received so far
///   exceed the cap
pub async fn download_file(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<DownloadedFile> {
    tracing::debug!(url = %url, "downloading spreadsheet");

    let mut response = send(Stage::Downloading, url, http.get(url).timeout(timeout)).await?;

    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    if let Some(length) = content_length {
        check_size(length)?;
    }

    // Chunked responses carry no length; the running total enforces the cap
    let capacity = content_length.unwrap_or(0).min(MAX_FILE_SIZE_BYTES);
    let mut bytes = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| transport_error(Stage::Downloading, url, &e))?
    {
        bytes.extend_from_slice(&chunk);
        check_size(bytes.len() as u64)?;
    }

    let size_bytes = content_length.unwrap_or(bytes.len() as u64);

    tracing::debug!(
        url = %url,
        size_bytes = size_bytes,
        downloaded_bytes = bytes.len(),
        "spreadsheet downloaded"
    );

    Ok(DownloadedFile {
        bytes,
        size_bytes,
        file_name: file_name_from_url(url),
    })
}

/// Last non-empty path segment of the URL, percent-decoded
fn file_name_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(&segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(segment)
        })
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
