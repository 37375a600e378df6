//! Service configuration, passed explicitly at construction time

use std::{fs, net::SocketAddr, path::{Path, PathBuf}};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Which counting strategy the service uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Chunked counting on a worker pool, then a merge
    #[default]
    MapReduce,
    /// Dense indices + histogram on a data-parallel device
    Histogram,
}

/// Where the histogram backend runs its bincount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// CUDA when compiled in and present, the data-parallel CPU device otherwise
    #[default]
    Auto,
    DataParallel,
    Sequential,
    Cuda,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// The address the RPC server listens on
    pub address: SocketAddr,
    /// Uploaded files are written here, and so is the last batch result
    pub upload_dir: PathBuf,
    /// File name of the persisted batch result, inside `upload_dir`
    pub result_file: String,
    /// Whether to write the batch result to disk after every request
    pub persist_results: bool,
    pub backend: BackendKind,
    /// Number of workers, defaults to the number of usable CPUs
    pub workers: Option<usize>,
    pub device: DeviceKind,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`
    pub log_level: String,
    /// Upper bound of one transport frame, uploads travel in a single frame
    pub max_frame_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            upload_dir: PathBuf::from("uploads"),
            result_file: "result.json".to_string(),
            persist_results: true,
            backend: BackendKind::default(),
            workers: None,
            device: DeviceKind::default(),
            log_level: "info".to_string(),
            max_frame_bytes: 256 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML document, missing keys fall back to the defaults
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// The configured worker count, or the platform's available parallelism
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn result_path(&self) -> PathBuf {
        self.upload_dir.join(&self.result_file)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
