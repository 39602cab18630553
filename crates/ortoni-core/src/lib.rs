//! Ortoni Core Library
//!
//! Result normalization, aggregation, run history and shard merging for
//! Ortoni test reports.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod reporter;
pub mod shard;
pub mod store;
pub mod time;
