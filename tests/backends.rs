use std::sync::Arc;

use lazy_static::lazy_static;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use word_freq_rs::{
    tokenize,
    wf::{
        config::DeviceKind,
        function::wc,
        histogram::{DataParallelDevice, HistogramCounter},
        worker::{split_text, MapReduceCounter, WorkerPool},
    },
    WordCountMap, WordCounter,
};

lazy_static! {
    static ref MAP_REDUCE: MapReduceCounter = MapReduceCounter::new(Arc::new(WorkerPool::new(3).unwrap()));
    static ref HISTOGRAM: HistogramCounter =
        HistogramCounter::new(Some(Box::new(DataParallelDevice::new(3).unwrap())));
    static ref SEQUENTIAL: HistogramCounter = HistogramCounter::with_device(DeviceKind::Sequential, 1);
}

fn single_pass(text: &str) -> WordCountMap {
    let mut counts = WordCountMap::new();
    for word in tokenize(text) {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

fn counts(pairs: &[(&str, u64)]) -> WordCountMap {
    pairs.iter().map(|&(w, c)| (w.to_string(), c)).collect()
}

#[test]
fn both_backends_count_the_example_sentence() {
    let text = "the cat sat on the mat the cat ran";
    let expected = counts(&[("the", 3), ("cat", 2), ("sat", 1), ("on", 1), ("mat", 1), ("ran", 1)]);

    let backends: [&dyn WordCounter; 3] = [&*MAP_REDUCE, &*HISTOGRAM, &*SEQUENTIAL];
    for backend in backends {
        let result = backend.count(text).unwrap();
        assert_eq!(result, expected, "backend {}", backend.name());
        assert_eq!(result.values().sum::<u64>(), 9);
    }
}

#[test]
fn empty_and_punctuation_text_count_nothing() {
    for text in ["", "!!!", "  \n\t ,.;"] {
        assert!(MAP_REDUCE.count(text).unwrap().is_empty());
        assert!(HISTOGRAM.count(text).unwrap().is_empty());
    }
}

#[test]
fn seventeen_tokens_chunk_and_merge_back() {
    let text = "one two three four five six seven eight nine ten eleven twelve \
                thirteen fourteen fifteen one two";
    let words = tokenize(text);
    assert_eq!(words.len(), 17);

    for num_chunks in [1, 2, 3, 4, 5, 8, 16, 17] {
        let chunks = split_text(&words, num_chunks);
        let concatenated: Vec<String> = chunks.iter().flat_map(|c| tokenize(c)).collect();
        assert_eq!(concatenated, words);

        let merged = wc::reduce(chunks.iter().map(|c| wc::map(c)));
        assert_eq!(merged, single_pass(text));
    }
    assert_eq!(MAP_REDUCE.count(text).unwrap(), single_pass(text));
}

#[test]
fn counting_twice_gives_the_same_answer() {
    let text = "Repeat after me: repeat, REPEAT, and then stop. Stop!";
    assert_eq!(MAP_REDUCE.count(text).unwrap(), MAP_REDUCE.count(text).unwrap());
    assert_eq!(HISTOGRAM.count(text).unwrap(), HISTOGRAM.count(text).unwrap());
}

#[test]
fn large_text_uses_many_chunks() {
    let text = (0..10_000).map(|i| format!("w{} ", i % 37)).collect::<String>();
    let result = MAP_REDUCE.count(&text).unwrap();
    assert_eq!(result.len(), 37);
    assert_eq!(result.values().sum::<u64>(), 10_000);
    assert_eq!(result, HISTOGRAM.count(&text).unwrap());
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![" ", ", ", ".\n", " -- ", "\t", "!?"])
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-zA-Z0-9_]{1,4}", separator()), 0..150).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(word, sep)| format!("{}{}", word, sep))
            .collect::<String>()
    })
}

proptest! {
    #[test]
    fn backends_are_interchangeable(text in text_strategy()) {
        let map_reduce = MAP_REDUCE.count(&text).unwrap();
        let histogram = HISTOGRAM.count(&text).unwrap();
        let sequential = SEQUENTIAL.count(&text).unwrap();
        prop_assert_eq!(&map_reduce, &histogram);
        prop_assert_eq!(&histogram, &sequential);
    }

    #[test]
    fn counts_sum_to_the_number_of_tokens(text in text_strategy()) {
        let expected = tokenize(&text).len() as u64;
        prop_assert_eq!(MAP_REDUCE.count(&text).unwrap().values().sum::<u64>(), expected);
        prop_assert_eq!(HISTOGRAM.count(&text).unwrap().values().sum::<u64>(), expected);
    }

    #[test]
    fn histogram_matches_single_pass(words in prop::collection::vec("[a-c]{1,2}", 0..300)) {
        let text = words.join(" ");
        prop_assert_eq!(HISTOGRAM.count_tokens(&tokenize(&text)), single_pass(&text));
    }
}
