use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::debug;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::wf::{
    counter::{WordCountMap, WordCounter},
    error::CountError,
    function::{wc, ChunkCounter, MapFunc},
    tokenizer::tokenize,
};

/// A bounded pool of map workers, built once and shared by every request
///
/// Workers share nothing mutable: each one gets its own chunk and hands back its
/// own `ChunkCounter` by value.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, CountError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("wf-worker-{}", i))
            .build()
            .map_err(|e| CountError::PoolUnavailable(e.to_string()))?;
        Ok(Self { pool })
    }

    /// The number of worker threads
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run the map function over every chunk in parallel
    /// Returns only once every worker is done, with the partial counters in chunk order
    pub fn map_all(&self, map_func: MapFunc, chunks: &[String]) -> Result<Vec<ChunkCounter>, CountError> {
        self.pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(id, chunk)| call_map_func(map_func, id, chunk))
                .collect()
        })
    }
}

/// Calls the map function for one chunk, a panic inside it becomes a `WorkerFailed`
fn call_map_func(map_func: MapFunc, id: usize, chunk: &str) -> Result<ChunkCounter, CountError> {
    panic::catch_unwind(AssertUnwindSafe(|| map_func(chunk))).map_err(|payload| {
        CountError::WorkerFailed {
            chunk: id,
            message: panic_message(payload.as_ref()),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// How many chunks to cut `total_words` tokens into for `workers` workers
/// Twice the workers, but never more chunks than tokens, and at least one
pub fn plan_chunks(total_words: usize, workers: usize) -> usize {
    (workers * 2).min(total_words).max(1)
}

/// Cut the tokens into contiguous chunks of `ceil(len / num_chunks)` tokens
/// The last chunk may be shorter. Each chunk is re-joined with single spaces,
/// tokens hold no whitespace so tokenizing a chunk again gives back the same slice
pub fn split_text(words: &[String], num_chunks: usize) -> Vec<String> {
    if words.is_empty() {
        return Vec::new();
    }
    let chunk_size = words.len().div_ceil(num_chunks.max(1));
    words.chunks(chunk_size).map(|chunk| chunk.join(" ")).collect()
}

/// The CPU map-reduce counter
/// 1. Tokenize once to size the job
/// 2. Split into balanced chunks
/// 3. Map every chunk on the worker pool
/// 4. Reduce the partial counters once all workers finished
pub struct MapReduceCounter {
    pool: Arc<WorkerPool>,
    map_func: MapFunc,
}

impl MapReduceCounter {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool, map_func: wc::map }
    }

    /// Swap the map function run by the workers
    pub fn with_map_func(mut self, map_func: MapFunc) -> Self {
        self.map_func = map_func;
        self
    }
}

impl WordCounter for MapReduceCounter {
    fn name(&self) -> &'static str {
        "map_reduce"
    }

    fn count(&self, text: &str) -> Result<WordCountMap, CountError> {
        let words = tokenize(text);
        if words.is_empty() {
            return Ok(WordCountMap::new());
        }

        let num_chunks = plan_chunks(words.len(), self.pool.workers());
        let chunks = split_text(&words, num_chunks);
        debug!(
            "[Map] Dispatching #{} chunk(s) of {} word(s) to #{} worker(s)",
            chunks.len(),
            words.len(),
            self.pool.workers()
        );

        // The barrier: every worker must be done before we touch the partial results
        let counters = self.pool.map_all(self.map_func, &chunks)?;

        let total = wc::reduce(counters);
        debug!("[Reduce] Merged #{} chunk(s) into {} distinct word(s)", chunks.len(), total.len());
        Ok(total)
    }
}
