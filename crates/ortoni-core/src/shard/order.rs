//! Shard file naming and deterministic ordering

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ShardDescriptor;

pub const SHARD_PREFIX: &str = "ortoni-shard-";
pub const SHARD_SUFFIX: &str = ".json";

static SHARD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ortoni-shard-(\d+)-of-(\d+)\.json$").expect("shard name pattern is valid")
});

/// `ortoni-shard-<current>-of-<total>.json`
pub fn shard_file_name(shard: &ShardDescriptor) -> String {
    format!("{}{}-of-{}{}", SHARD_PREFIX, shard.current, shard.total, SHARD_SUFFIX)
}

/// Whether a directory entry is a candidate shard file
pub fn is_shard_file_name(name: &str) -> bool {
    name.starts_with(SHARD_PREFIX) && name.ends_with(SHARD_SUFFIX)
}

/// The embedded shard index, if the name carries one
pub fn shard_index(name: &str) -> Option<u64> {
    SHARD_NAME
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Indexed names ascending by index, then unindexed names in lexical order
pub fn compare_shard_names(a: &str, b: &str) -> Ordering {
    match (shard_index(a), shard_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn sort_shard_names<T, F>(items: &mut [T], name: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| compare_shard_names(name(a), name(b)));
}
