pub mod aggregator;
pub mod config;
pub mod coordinator;
pub mod counter;
pub mod error;
pub mod extract;
pub mod function;
pub mod histogram;
pub mod logging;
pub mod report;
pub mod store;
pub mod tokenizer;
pub mod worker;
