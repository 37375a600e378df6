use std::{fs, path::{Path, PathBuf}, sync::Arc, time::Instant};

use anyhow::Context;
use futures::{
    future::{ready, BoxFuture, Ready},
    FutureExt,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tarpc::context;

use crate::wf::{
    config::ServiceConfig,
    counter::{build_counter, WordCounter},
    error::CountError,
    extract::{ExtensionExtractor, TextExtractor},
    report::{BatchBuilder, BatchResult, FileFailure, FileResult},
    store::{BatchNames, UploadStore},
};

/// One file as sent by the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    /// The declared MIME type, reported back untouched
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub status: String,
    pub message: String,
}

impl Pong {
    fn alive() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Server is alive!".to_string(),
        }
    }
}

/// The upload service: stores, extracts and counts every file of a batch
/// Cloned once per request, all the heavy parts are shared
#[derive(Clone)]
pub struct Coordinator {
    /// The counting backend, built once at startup
    counter: Arc<dyn WordCounter>,
    extractor: Arc<dyn TextExtractor>,
    store: UploadStore,
    /// Where the last batch result is written, `None` to keep it in memory only
    result_path: Option<PathBuf>,
}

impl Coordinator {
    /// Create a new coordinator from the configuration
    pub fn new(config: &ServiceConfig) -> Result<Self, CountError> {
        let counter = build_counter(config)?;
        let result_path = config.persist_results.then(|| config.result_path());
        Ok(Self::with_parts(
            counter,
            Arc::new(ExtensionExtractor::new()),
            UploadStore::new(config.upload_dir.clone()),
            result_path,
        ))
    }

    pub fn with_parts(
        counter: Arc<dyn WordCounter>,
        extractor: Arc<dyn TextExtractor>,
        store: UploadStore,
        result_path: Option<PathBuf>,
    ) -> Self {
        Self { counter, extractor, store, result_path }
    }

    /// Replace the text extractor, e.g. to plug in `.doc` support
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Store, extract and count one file
    /// An extraction failure leaves the file with no words and its `extraction_error` set,
    /// storage and counting failures fail the file
    pub fn process_file(&self, names: &mut BatchNames, file: &UploadedFile) -> Result<FileResult, FileFailure> {
        let started = Instant::now();
        let failure = |error: String| FileFailure {
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            error,
        };

        let (path, size_bytes) = self
            .store
            .store(names, &file.filename, &file.bytes)
            .map_err(|e| failure(e.to_string()))?;

        let (text, extraction_error) = match self.extractor.extract_text(&path, &file.content_type) {
            Ok(text) => (text, None),
            Err(e) => {
                warn!("[Upload] Failed to extract text from {}, counting it as empty: {}", file.filename, e);
                (String::new(), Some(e.to_string()))
            }
        };

        let counts = self.counter.count(&text).map_err(|e| failure(e.to_string()))?;

        Ok(FileResult::new(
            file.filename.clone(),
            file.content_type.clone(),
            size_bytes,
            counts,
            started.elapsed(),
        )
        .with_extraction_error(extraction_error))
    }

    /// Process the files one after the other, a failing file doesn't stop the others
    pub fn process_batch(&self, files: Vec<UploadedFile>) -> BatchResult {
        info!("[Upload] Received #{} file(s), counting with `{}`", files.len(), self.counter.name());

        let mut batch = BatchBuilder::new(files.len());
        let mut names = BatchNames::default();
        for file in &files {
            match self.process_file(&mut names, file) {
                Ok(result) => {
                    info!(
                        "[Upload] {} has {} word(s), processed in {}s",
                        result.filename,
                        result.total_words,
                        result.processing_time_seconds
                    );
                    batch.push_file(result);
                }
                Err(failure) => {
                    error!("[Upload] Failed to process {}: {}", failure.filename, failure.error);
                    batch.push_failure(failure);
                }
            }
        }
        let result = batch.finish();

        if let Some(path) = &self.result_path {
            // The result is already computed, losing the snapshot is not worth failing the request
            if let Err(e) = persist_result(path, &result) {
                warn!("[Upload] {:#}", e);
            }
        }
        result
    }
}

/// Write the batch result as pretty JSON
pub fn persist_result(path: &Path, result: &BatchResult) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, &json).with_context(|| format!("failed to write result to {}", path.display()))?;
    debug!("[Upload] Batch result written to {}", path.display());
    Ok(())
}

/// Reported when the blocking batch task itself died, every file counts as failed
fn crashed_batch(files: &[(String, String)], message: &str) -> BatchResult {
    let mut batch = BatchBuilder::new(files.len());
    for (filename, content_type) in files {
        batch.push_failure(FileFailure {
            filename: filename.clone(),
            content_type: content_type.clone(),
            error: message.to_string(),
        });
    }
    batch.finish()
}

/// RPC related for Coordinator
#[tarpc::service]
pub trait UploadService {
    /// Health check
    async fn ping() -> Pong;
    /// Count the words of every uploaded file, and of the whole batch
    async fn upload_files(files: Vec<UploadedFile>) -> BatchResult;
}

/// Register the RPC functions on Coordinator, which is also the RPC server
#[tarpc::server]
impl UploadService for Coordinator {
    type PingFut = Ready<Pong>;
    type UploadFilesFut = BoxFuture<'static, BatchResult>;

    fn ping(self, _: context::Context) -> Self::PingFut {
        ready(Pong::alive())
    }

    /// Counting is CPU bound, so the batch runs on a blocking thread instead of the RPC runtime
    fn upload_files(self, _: context::Context, files: Vec<UploadedFile>) -> Self::UploadFilesFut {
        async move {
            let meta = files
                .iter()
                .map(|f| (f.filename.clone(), f.content_type.clone()))
                .collect::<Vec<_>>();
            match tokio::task::spawn_blocking(move || self.process_batch(files)).await {
                Ok(result) => result,
                Err(e) => {
                    error!("[Upload] Batch processing crashed: {}", e);
                    crashed_batch(&meta, &format!("batch processing crashed: {}", e))
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crashed_batch_lists_every_file() {
        let files = vec![
            ("a.txt".to_string(), "text/plain".to_string()),
            ("b.txt".to_string(), "text/plain".to_string()),
        ];
        let result = crashed_batch(&files, "boom");
        assert_eq!(result.total_files_received, 2);
        assert!(result.files.is_empty());
        assert_eq!(result.failed_files.len(), 2);
        assert_eq!(result.failed_files[1].filename, "b.txt");
    }
}
