//! Combines word counts and picks the most frequent words
//!
//! Ranking order: count descending, then word ascending (byte-wise). The second
//! key makes the ranking a pure function of the counts, so it does not depend on
//! hashing or on the order the files were processed in.

use std::cmp::Ordering;

use crate::wf::{counter::WordCountMap, report::WordEntry};

/// Number of words in the batch-wide ranking
pub const OVERALL_TOP: usize = 30;
/// Number of words in each file's ranking
pub const FILE_TOP: usize = 10;

/// Running sum of word counts across the files of a batch
#[derive(Debug, Default, Clone)]
pub struct Aggregator {
    overall: WordCountMap,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file's counts, token by token
    pub fn add(&mut self, counts: &WordCountMap) {
        for (word, &count) in counts {
            *self.overall.entry(word.clone()).or_insert(0) += count;
        }
    }

    pub fn top(&self, n: usize) -> Vec<WordEntry> {
        top_n(&self.overall, n)
    }

    /// The combined counts and the overall top 30
    pub fn finish(self) -> (WordCountMap, Vec<WordEntry>) {
        let top = self.top(OVERALL_TOP);
        (self.overall, top)
    }
}

/// Sum every file's counts and rank the combined counts
pub fn aggregate<'a, I>(per_file: I) -> (WordCountMap, Vec<WordEntry>)
where
    I: IntoIterator<Item = &'a WordCountMap>,
{
    let mut aggregator = Aggregator::new();
    per_file.into_iter().for_each(|counts| aggregator.add(counts));
    aggregator.finish()
}

fn rank(lhs: &(&String, &u64), rhs: &(&String, &u64)) -> Ordering {
    rhs.1.cmp(lhs.1).then_with(|| lhs.0.cmp(rhs.0))
}

/// The `n` most frequent words, fewer if there are fewer distinct words
///
/// Equal counts rank alphabetically, not in the order the words first appeared.
/// "the cat sat on the mat the cat ran" ranks as `the, cat, mat, on, ran, sat`,
/// where first appearance would give `sat, on, mat, ran` after `cat`. The rank
/// of a word depends only on the counts, so merging files in any order gives
/// the same top 30.
pub fn top_n(counts: &WordCountMap, n: usize) -> Vec<WordEntry> {
    let mut ranked: Vec<(&String, &u64)> = counts.iter().collect();
    if ranked.len() > n {
        // Only the first n need to be in order
        ranked.select_nth_unstable_by(n, rank);
        ranked.truncate(n);
    }
    ranked.sort_unstable_by(rank);
    ranked
        .into_iter()
        .map(|(word, &count)| WordEntry::new(word.clone(), count))
        .collect()
}
