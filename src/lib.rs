//! Word-frequency statistics for uploaded documents.
//!
//! The counting core lives in [`wf`]: a tokenizer, two interchangeable counting
//! backends (a data-parallel histogram and a map-reduce over a worker pool), the
//! aggregator and the result structures. The upload service on top of it is
//! exposed over `tarpc`, see [`wf::coordinator`].

pub mod wf;

pub use wf::aggregator::{aggregate, top_n, Aggregator};
pub use wf::config::{BackendKind, DeviceKind, ServiceConfig};
pub use wf::counter::{build_counter, WordCountMap, WordCounter};
pub use wf::report::{BatchResult, BatchStatus, FileFailure, FileResult, WordEntry};
pub use wf::tokenizer::tokenize;
