use std::path::PathBuf;

use thiserror::Error;

/// Failures of a counting backend, scoped to the file being counted
#[derive(Debug, Error)]
pub enum CountError {
    /// The worker pool could not be built, nothing was counted
    #[error("worker pool unavailable: {0}")]
    PoolUnavailable(String),
    /// A map worker died while counting its chunk
    #[error("map worker for chunk #{chunk} failed: {message}")]
    WorkerFailed { chunk: usize, message: String },
}

/// Failures of a histogram device; the histogram counter recovers from these
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("histogram device unavailable: {0}")]
    Unavailable(String),
    #[error("histogram kernel failed: {0}")]
    Kernel(String),
    #[error("device returned {got} bins, expected {expected}")]
    BinMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no extractor for `{extension}` documents")]
    Unsupported { extension: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8 text")]
    Encoding { path: PathBuf },
    #[error("failed to parse document {path}: {message}")]
    Document { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refusing to store upload with unusable filename `{0}`")]
    InvalidFilename(String),
    #[error("failed to write upload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
