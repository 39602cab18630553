//! Hierarchical grouping: file path, then suite, then optionally project.
//!
//! Groups are kept as ordered vectors so serialization preserves first-seen
//! order, matching the report's drill-down navigation.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::model::TestResult;

/// A record with its position in the run's insertion order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedEntry {
    #[serde(flatten)]
    pub result: TestResult,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectGroup {
    pub project_name: String,
    pub entries: Vec<GroupedEntry>,
}

/// Leaves of a suite: a flat list, or one list per project when projects are shown
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteEntries {
    Flat(Vec<GroupedEntry>),
    ByProject(Vec<ProjectGroup>),
}

impl SuiteEntries {
    fn push(&mut self, entry: GroupedEntry) {
        match self {
            SuiteEntries::Flat(entries) => entries.push(entry),
            SuiteEntries::ByProject(projects) => {
                let name = &entry.result.project_name;
                match projects.iter_mut().find(|p| &p.project_name == name) {
                    Some(group) => group.entries.push(entry),
                    None => projects.push(ProjectGroup {
                        project_name: name.clone(),
                        entries: vec![entry],
                    }),
                }
            }
        }
    }

    pub fn entries(&self) -> Box<dyn Iterator<Item = &GroupedEntry> + '_> {
        match self {
            SuiteEntries::Flat(entries) => Box::new(entries.iter()),
            SuiteEntries::ByProject(projects) => {
                Box::new(projects.iter().flat_map(|p| p.entries.iter()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuiteGroup {
    pub suite: String,
    pub entries: SuiteEntries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileGroup {
    pub file_path: String,
    pub suites: Vec<SuiteGroup>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedResults {
    pub files: Vec<FileGroup>,
    pub show_project: bool,
}

impl GroupedResults {
    /// All entries ordered by their original insertion index
    pub fn flatten(&self) -> Vec<&GroupedEntry> {
        let mut entries: Vec<&GroupedEntry> = self
            .files
            .iter()
            .flat_map(|f| f.suites.iter())
            .flat_map(|s| s.entries.entries())
            .collect();
        entries.sort_by_key(|e| e.index);
        entries
    }

    pub fn len(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.suites.iter())
            .map(|s| s.entries.entries().count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Group `all` by file path and suite, adding a project level when
/// `show_project` is set
pub fn group(all: &[TestResult], show_project: bool) -> GroupedResults {
    let mut files: Vec<FileGroup> = Vec::new();
    let mut file_slots: HashMap<&str, usize> = HashMap::new();
    let mut suite_slots: HashMap<(usize, &str), usize> = HashMap::new();

    for (index, result) in all.iter().enumerate() {
        let file_slot = *file_slots
            .entry(result.file_path.as_str())
            .or_insert_with(|| {
                files.push(FileGroup {
                    file_path: result.file_path.clone(),
                    suites: Vec::new(),
                });
                files.len() - 1
            });

        let suites = &mut files[file_slot].suites;
        let suite_slot = *suite_slots
            .entry((file_slot, result.suite.as_str()))
            .or_insert_with(|| {
                let entries = if show_project {
                    SuiteEntries::ByProject(Vec::new())
                } else {
                    SuiteEntries::Flat(Vec::new())
                };
                suites.push(SuiteGroup {
                    suite: result.suite.clone(),
                    entries,
                });
                suites.len() - 1
            });

        suites[suite_slot].entries.push(GroupedEntry {
            result: result.clone(),
            index,
        });
    }

    GroupedResults {
        files,
        show_project,
    }
}

impl Serialize for GroupedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for file in &self.files {
            map.serialize_entry(&file.file_path, &SuitesMap(&file.suites))?;
        }
        map.end()
    }
}

struct SuitesMap<'a>(&'a [SuiteGroup]);

impl Serialize for SuitesMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for suite in self.0 {
            map.serialize_entry(&suite.suite, &suite.entries)?;
        }
        map.end()
    }
}

impl Serialize for SuiteEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SuiteEntries::Flat(entries) => entries.serialize(serializer),
            SuiteEntries::ByProject(projects) => {
                let mut map = serializer.serialize_map(Some(projects.len()))?;
                for project in projects {
                    map.serialize_entry(&project.project_name, &project.entries)?;
                }
                map.end()
            }
        }
    }
}
