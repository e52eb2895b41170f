//! Chunked upload bookkeeping.
//!
//! The CSV upload path sends records to the server in fixed-size chunks,
//! one request per chunk, and folds the per-chunk responses into running
//! totals. Progress shown to the operator is simulated from the number of
//! finished chunks and carries no information from the server.

use crate::models::guest_import::{
    BatchImportResponse, GuestRecord, ProcessedCounts, ProcessingResult, RawGuestRecord,
    SkippedCounts,
};

/// Highest percentage reported before the final chunk is acknowledged.
const MAX_PENDING_PERCENT: u8 = 95;

/// Number of chunks needed for `total` records.
pub fn chunk_count(total: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    total.div_ceil(batch_size)
}

/// Splits records into sequential chunks of at most `batch_size`.
pub fn chunk_records(records: &[RawGuestRecord], batch_size: usize) -> Vec<&[RawGuestRecord]> {
    if batch_size == 0 {
        return Vec::new();
    }
    records.chunks(batch_size).collect()
}

/// Separates rows the server would drop (no name or household) from the rest.
pub fn split_submittable(records: Vec<RawGuestRecord>) -> (Vec<RawGuestRecord>, u32) {
    let (valid, invalid): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| GuestRecord::from_raw(r).is_some());
    (valid, invalid.len() as u32)
}

/// Running totals across chunk responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTotals {
    pub chunks_completed: usize,
    pub processed: ProcessedCounts,
    pub skipped: SkippedCounts,
    pub results: Vec<ProcessingResult>,
    pub errors: Vec<String>,
    /// `processingTime` of the most recent chunk.
    pub last_processing_time: Option<String>,
}

impl BatchTotals {
    /// Folds one chunk response into the totals.
    pub fn absorb(&mut self, response: BatchImportResponse) {
        self.chunks_completed += 1;
        self.processed.households += response.processed.households;
        self.processed.guests += response.processed.guests;
        self.skipped.duplicates += response.skipped.duplicates;
        self.skipped.invalid_rows += response.skipped.invalid_rows;
        self.results.extend(response.results);
        if let Some(errors) = response.errors {
            self.errors.extend(errors);
        }
        self.last_processing_time = Some(response.processing_time);
    }

    /// Rows reported as failed for reasons other than duplication.
    pub fn failed_rows(&self) -> Vec<&ProcessingResult> {
        self.results
            .iter()
            .filter(|r| {
                !r.success
                    && r.error.as_deref() != Some(crate::models::guest_import::DUPLICATE_GUEST)
            })
            .collect()
    }
}

/// Simulated progress percentage for a chunked upload.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_chunks: usize,
    completed: usize,
    finished: bool,
}

impl ProgressTracker {
    pub fn new(total_chunks: usize) -> Self {
        Self {
            total_chunks,
            completed: 0,
            finished: false,
        }
    }

    /// Marks one chunk as done and returns the new percentage.
    pub fn chunk_done(&mut self) -> u8 {
        self.completed = (self.completed + 1).min(self.total_chunks);
        self.percent()
    }

    /// Marks the whole upload as done.
    pub fn finish(&mut self) -> u8 {
        self.finished = true;
        self.percent()
    }

    /// Current percentage; capped below 100 until [`finish`](Self::finish).
    pub fn percent(&self) -> u8 {
        if self.finished {
            return 100;
        }
        if self.total_chunks == 0 {
            return 0;
        }
        let raw = (self.completed * 100 / self.total_chunks) as u8;
        raw.min(MAX_PENDING_PERCENT)
    }
}
