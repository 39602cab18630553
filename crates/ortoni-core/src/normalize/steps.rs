//! Conversion of raw step trees into rendered `Step` trees
//!
//! Traversal uses an explicit work stack, so deeply nested steps cannot
//! overflow the call stack. Steps below `MAX_STEP_DEPTH` are dropped.

use std::path::Path;

use crate::model::{RawStep, Step, StepStatus};

use super::ansi::render_text;
use super::paths::format_location;

/// Deepest step level kept; top-level steps are depth 1
pub const MAX_STEP_DEPTH: usize = 64;

/// Result of converting a step forest
#[derive(Debug, Default)]
pub struct ConvertedSteps {
    pub steps: Vec<Step>,
    /// Raw steps dropped for exceeding the depth limit (whole subtrees counted)
    pub truncated: usize,
}

pub fn convert_steps(raw: &[RawStep], project_root: &Path) -> ConvertedSteps {
    convert_steps_with_limit(raw, project_root, MAX_STEP_DEPTH)
}

pub(crate) fn convert_steps_with_limit(
    raw: &[RawStep],
    project_root: &Path,
    max_depth: usize,
) -> ConvertedSteps {
    // Pre-order pass: every node gets an index; parents precede children.
    let mut nodes: Vec<(Option<usize>, Step)> = Vec::new();
    let mut stack: Vec<(&RawStep, Option<usize>, usize)> =
        raw.iter().rev().map(|s| (s, None, 1)).collect();
    let mut truncated = 0;

    while let Some((step, parent, depth)) = stack.pop() {
        let index = nodes.len();
        nodes.push((parent, convert_one(step, project_root)));

        if depth < max_depth {
            stack.extend(step.steps.iter().rev().map(|s| (s, Some(index), depth + 1)));
        } else {
            truncated += count_raw(&step.steps);
        }
    }

    // Reverse pass: all descendants of a node have larger indices, so its
    // children are complete (in reverse order) by the time it is reached.
    let mut children: Vec<Vec<Step>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    while let Some((parent, mut step)) = nodes.pop() {
        let index = nodes.len();
        let mut own = std::mem::take(&mut children[index]);
        own.reverse();
        step.steps = own;
        match parent {
            Some(p) => children[p].push(step),
            None => roots.push(step),
        }
    }
    roots.reverse();

    ConvertedSteps {
        steps: roots,
        truncated,
    }
}

fn convert_one(step: &RawStep, project_root: &Path) -> Step {
    let (status, snippet, location) = match &step.error {
        Some(error) => (
            StepStatus::Failed,
            render_text(error.snippet.as_deref().unwrap_or_default()),
            step.location
                .as_ref()
                .map(|loc| format_location(project_root, loc))
                .unwrap_or_default(),
        ),
        None => (StepStatus::Passed, String::new(), String::new()),
    };

    Step {
        title: step.title.clone(),
        category: step.category.clone(),
        snippet,
        location,
        duration: step.duration,
        status,
        steps: Vec::new(),
    }
}

fn count_raw(steps: &[RawStep]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&RawStep> = steps.iter().collect();
    while let Some(step) = stack.pop() {
        count += 1;
        stack.extend(step.steps.iter());
    }
    count
}
