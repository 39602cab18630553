//! Run statistics and hierarchical grouping

pub mod group;
pub mod summary;

pub use group::{group, FileGroup, GroupedEntry, GroupedResults, ProjectGroup, SuiteEntries, SuiteGroup};
pub use summary::{all_tags, project_stats, summarize, success_rate, ProjectStats, RunSummary};
