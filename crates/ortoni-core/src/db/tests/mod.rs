mod open;

use crate::model::{TestResult, TestStatus};
use crate::store::fixtures::record;

fn with_duration(mut r: TestResult, duration: u64) -> TestResult {
    r.duration = duration;
    r
}

fn sample(title: &str, status: TestStatus, duration: u64) -> TestResult {
    with_duration(record("login.spec.ts", "chromium", title, status), duration)
}
