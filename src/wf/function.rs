//! The map and reduce functions run by the map-reduce counter

use crate::wf::counter::WordCountMap;

/// Partial counts produced by a single map worker for its chunk
pub type ChunkCounter = WordCountMap;

/// Signature of a map function, one call per chunk
pub type MapFunc = fn(&str) -> ChunkCounter;

/// Word Count application
pub mod wc {
    use super::ChunkCounter;
    use crate::wf::{counter::WordCountMap, tokenizer::tokenize};

    /// Tokenize the chunk on our own and count it locally
    pub fn map(chunk: &str) -> ChunkCounter {
        let mut counter = ChunkCounter::new();
        for word in tokenize(chunk) {
            *counter.entry(word).or_insert(0) += 1;
        }
        counter
    }

    /// Sum the partial counters, in whatever order they come
    pub fn reduce<I>(counters: I) -> WordCountMap
    where
        I: IntoIterator<Item = ChunkCounter>,
    {
        let mut total = WordCountMap::new();
        for counter in counters {
            for (word, count) in counter {
                *total.entry(word).or_insert(0) += count;
            }
        }
        total
    }
}
