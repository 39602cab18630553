//! `@tag` extraction from test and suite titles

use std::sync::LazyLock;

use regex::Regex;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("tag pattern is valid"));

/// Split a title into its readable text and the `@tag` tokens it contains.
///
/// Tags are returned in order of appearance without duplicates. Whitespace
/// left behind by removed tags is collapsed, so applying this to an already
/// stripped title returns it unchanged with no tags.
pub fn extract_tags(text: &str) -> (String, Vec<String>) {
    let mut tags: Vec<String> = Vec::new();
    for m in TAG_PATTERN.find_iter(text) {
        push_unique(&mut tags, m.as_str());
    }

    let stripped = TAG_PATTERN.replace_all(text, " ");
    let title = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    (title, tags)
}

/// Add tags declared by the host that were not already in the title
pub fn merge_tags(tags: &mut Vec<String>, declared: &[String]) {
    for tag in declared {
        push_unique(tags, tag);
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}
