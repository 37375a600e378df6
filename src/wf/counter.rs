//! The counting contract shared by both backends, and the factory that picks one

use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::wf::{
    config::{BackendKind, ServiceConfig},
    error::CountError,
    histogram::HistogramCounter,
    worker::{MapReduceCounter, WorkerPool},
};

/// Token -> number of occurrences
pub type WordCountMap = HashMap<String, u64>;

/// A word counting strategy
///
/// Both implementations tokenize with [`crate::wf::tokenizer::tokenize`], so for the
/// same text they must return the same map.
pub trait WordCounter: Send + Sync {
    /// Short name, used in logs
    fn name(&self) -> &'static str;

    /// Count every word of `text`
    fn count(&self, text: &str) -> Result<WordCountMap, CountError>;
}

/// Build the backend selected in the configuration, once per service
pub fn build_counter(config: &ServiceConfig) -> Result<Arc<dyn WordCounter>, CountError> {
    let workers = config.worker_count();
    let counter: Arc<dyn WordCounter> = match config.backend {
        BackendKind::MapReduce => {
            let pool = WorkerPool::new(workers)?;
            Arc::new(MapReduceCounter::new(Arc::new(pool)))
        }
        BackendKind::Histogram => Arc::new(HistogramCounter::with_device(config.device, workers)),
    };
    info!(
        "[Preparation] Counting backend `{}` ready with #{} worker(s)",
        counter.name(),
        workers
    );
    Ok(counter)
}
