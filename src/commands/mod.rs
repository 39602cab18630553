//! CLI commands for ortoni

pub mod dispatch;
pub mod history;
pub mod merge;
pub mod report;
