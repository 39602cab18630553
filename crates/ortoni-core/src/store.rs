//! In-memory, append-only result collection for the current run

use serde::{Deserialize, Serialize};

use crate::model::{TestResult, TestStatus};

/// Distinct project names in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSet(Vec<String>);

impl ProjectSet {
    /// Add a project name; returns false if it was already present
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProjectSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ProjectSet::default();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for ProjectSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}

/// Whether a record counts toward pass/fail totals: not skipped and not a
/// retry attempt
pub fn is_counted(record: &TestResult) -> bool {
    record.status != TestStatus::Skipped && !record.is_retry()
}

/// Results of one run in arrival order
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: Vec<TestResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TestResult) {
        self.records.push(record);
    }

    pub fn all(&self) -> &[TestResult] {
        &self.records
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<&TestResult>
    where
        P: Fn(&TestResult) -> bool,
    {
        self.records.iter().filter(|&r| predicate(r)).collect()
    }

    /// The canonical filtered view used for totals and success rate
    pub fn counted(&self) -> Vec<&TestResult> {
        self.filter(is_counted)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{record, retry};
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut store = ResultStore::new();
        store.append(record("b.spec.ts", "p", "two", TestStatus::Passed));
        store.append(record("a.spec.ts", "p", "one", TestStatus::Failed));

        let titles: Vec<&str> = store.all().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["two", "one"]);
    }

    #[test]
    fn test_counted_excludes_skipped_and_retries() {
        let mut store = ResultStore::new();
        store.append(record("a.spec.ts", "p", "one", TestStatus::Failed));
        store.append(retry(record("a.spec.ts", "p", "one", TestStatus::Passed), 1));
        store.append(record("a.spec.ts", "p", "two", TestStatus::Skipped));
        store.append(record("a.spec.ts", "p", "three", TestStatus::Passed));

        let counted = store.counted();
        assert_eq!(counted.len(), 2);
        assert_eq!(counted[0].title, "one");
        assert_eq!(counted[1].title, "three");
    }

    #[test]
    fn test_project_set_dedupes_in_order() {
        let mut set: ProjectSet = ["chromium", "firefox"].into_iter().collect();
        assert!(!set.insert("chromium"));
        assert!(set.insert("webkit"));
        set.extend(["firefox", "mobile"]);
        assert_eq!(set.names(), &["chromium", "firefox", "webkit", "mobile"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["chromium","firefox","webkit","mobile"]"#);
    }
}
