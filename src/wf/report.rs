//! The result structures returned to the uploader, and the builder that fills them
//!
//! Field names are the JSON contract of the upload service and must not change.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::wf::{
    aggregator::{top_n, Aggregator, FILE_TOP},
    counter::WordCountMap,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub count: u64,
}

impl WordEntry {
    pub fn new(word: String, count: u64) -> Self {
        Self { word, count }
    }
}

/// Statistics of one uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub filename: String,
    /// Content type as declared by the uploader
    pub content_type: String,
    /// Size of the stored upload on disk
    pub size_bytes: u64,
    /// Always the sum of `all_words`
    pub total_words: u64,
    pub processing_time_seconds: f64,
    pub top_10_words: Vec<WordEntry>,
    pub all_words: WordCountMap,
    /// Set when no text could be extracted, the file was counted as empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

impl FileResult {
    pub fn new(
        filename: String,
        content_type: String,
        size_bytes: u64,
        all_words: WordCountMap,
        elapsed: Duration,
    ) -> Self {
        Self {
            filename,
            content_type,
            size_bytes,
            total_words: all_words.values().sum(),
            processing_time_seconds: round_secs(elapsed),
            top_10_words: top_n(&all_words, FILE_TOP),
            all_words,
            extraction_error: None,
        }
    }

    pub fn with_extraction_error(mut self, error: Option<String>) -> Self {
        self.extraction_error = error;
        self
    }
}

/// A file that could not be counted, it contributes nothing to the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub filename: String,
    pub content_type: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every file was counted
    Success,
    /// At least one file failed, see `failed_files`
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub status: BatchStatus,
    pub total_files_received: usize,
    pub overall_processing_time_seconds: f64,
    pub overall_top_30_words: Vec<WordEntry>,
    pub files: Vec<FileResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FileFailure>,
}

/// Collects the outcome of every file of a batch, in upload order
pub struct BatchBuilder {
    started: Instant,
    received: usize,
    aggregator: Aggregator,
    files: Vec<FileResult>,
    failed_files: Vec<FileFailure>,
}

impl BatchBuilder {
    /// Starts the batch clock
    pub fn new(received: usize) -> Self {
        Self {
            started: Instant::now(),
            received,
            aggregator: Aggregator::new(),
            files: Vec::with_capacity(received),
            failed_files: Vec::new(),
        }
    }

    pub fn push_file(&mut self, file: FileResult) {
        self.aggregator.add(&file.all_words);
        self.files.push(file);
    }

    pub fn push_failure(&mut self, failure: FileFailure) {
        self.failed_files.push(failure);
    }

    pub fn finish(self) -> BatchResult {
        let elapsed = self.started.elapsed();
        let (_, overall_top_30_words) = self.aggregator.finish();
        let status = if self.failed_files.is_empty() {
            BatchStatus::Success
        } else {
            BatchStatus::Partial
        };
        BatchResult {
            status,
            total_files_received: self.received,
            overall_processing_time_seconds: round_secs(elapsed),
            overall_top_30_words,
            files: self.files,
            failed_files: self.failed_files,
        }
    }
}

/// Seconds, rounded to 4 decimals
pub fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10_000.0).round() / 10_000.0
}
