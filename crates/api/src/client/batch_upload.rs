//! Chunked upload of parsed guest lists to `upload-batch`.
//!
//! Records are sent in sequential chunks, one multipart request each, with
//! the JSON payload in the `data` field. The first non-2xx response aborts
//! the run; chunks accepted before it stay imported on the server. The whole
//! run shares one deadline.

use std::time::{Duration, Instant};

use domain::models::{
    BatchImportResponse, RawGuestRecord, RawRecordsRequest, CLIENT_IMPORT_TIMEOUT_SECS,
    IMPORT_BATCH_SIZE,
};
use domain::services::{chunk_records, BatchTotals, ProgressTracker};
use reqwest::{multipart::Form, Client};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extractors::ADMIN_KEY_HEADER;
use crate::routes::guest_import::DATA_FIELD;

const UPLOAD_PATH: &str = "/api/admin/upload-batch";

/// Errors that end a chunked upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(
        "Import timed out after {secs} seconds with {completed} of {total} chunks sent. \
         Re-upload the file to import the rest; already imported guests are skipped."
    )]
    TimedOut {
        secs: u64,
        completed: usize,
        total: usize,
    },

    #[error("Server rejected chunk {chunk} of {total} (HTTP {status}): {message}")]
    Rejected {
        chunk: usize,
        total: usize,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not encode chunk: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

/// Totals for a finished upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub totals: BatchTotals,
    pub chunks: usize,
    pub elapsed: Duration,
}

/// Sends guest records to the import endpoint in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct BatchUploader {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    batch_size: usize,
    timeout: Duration,
}

impl BatchUploader {
    /// Uploader for the server at `base_url` with the default chunk size and
    /// deadline.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), UPLOAD_PATH),
            api_key: None,
            batch_size: IMPORT_BATCH_SIZE,
            timeout: Duration::from_secs(CLIENT_IMPORT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Records per request; zero falls back to the default.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 {
            IMPORT_BATCH_SIZE
        } else {
            batch_size
        };
        self
    }

    /// Deadline for the whole upload, not per chunk.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Uploads all records, calling `on_progress` with a percentage after
    /// each chunk and with 100 once every chunk is accepted.
    pub async fn upload<F>(
        &self,
        records: &[RawGuestRecord],
        mut on_progress: F,
    ) -> Result<UploadReport, UploadError>
    where
        F: FnMut(u8),
    {
        let started = Instant::now();
        let chunks = chunk_records(records, self.batch_size);
        let total = chunks.len();
        let mut totals = BatchTotals::default();
        let mut progress = ProgressTracker::new(total);

        info!(
            records = records.len(),
            chunks = total,
            endpoint = %self.endpoint,
            "Starting chunked guest upload"
        );

        let run = async {
            for (idx, chunk) in chunks.iter().enumerate() {
                let response = self.send_chunk(idx + 1, total, chunk).await?;
                debug!(
                    chunk = idx + 1,
                    guests = response.processed.guests,
                    processing_time = %response.processing_time,
                    "Chunk accepted"
                );
                totals.absorb(response);
                on_progress(progress.chunk_done());
            }
            Ok::<(), UploadError>(())
        };

        let finished = tokio::time::timeout(self.timeout, run).await;
        match finished {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(completed = totals.chunks_completed, total, "Guest upload timed out");
                return Err(UploadError::TimedOut {
                    secs: self.timeout.as_secs(),
                    completed: totals.chunks_completed,
                    total,
                });
            }
        }

        on_progress(progress.finish());

        Ok(UploadReport {
            totals,
            chunks: total,
            elapsed: started.elapsed(),
        })
    }

    async fn send_chunk(
        &self,
        chunk: usize,
        total: usize,
        records: &[RawGuestRecord],
    ) -> Result<BatchImportResponse, UploadError> {
        let payload = serde_json::to_string(&RawRecordsRequest {
            records: records.to_vec(),
        })?;
        let form = Form::new().text(DATA_FIELD, payload);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header(ADMIN_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                chunk,
                total,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json::<BatchImportResponse>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }
}

/// The `message` of a JSON error body, or the raw body otherwise.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
