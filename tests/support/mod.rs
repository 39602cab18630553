//! Shared helpers for ortoni integration tests

#![allow(dead_code)]

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Get a Command for ortoni
pub fn ortoni() -> Command {
    cargo_bin_cmd!("ortoni")
}

/// One `testEnd` event for `tests/cart.spec.ts`
pub fn test_end(project: &str, title: &str, outcome: &str, status: &str, retry: u32) -> Value {
    json!({
        "event": "testEnd",
        "test": {
            "id": format!("{}-{}", project, title),
            "title": title,
            "titlePath": ["", project, "tests/cart.spec.ts", "Cart", title],
            "location": {"file": "/repo/tests/cart.spec.ts", "line": 3, "column": 7},
            "outcome": outcome
        },
        "result": {
            "retry": retry,
            "status": status,
            "duration": 100,
            "errors": if status == "failed" {
                json!([{"message": "expected 1 to be 2"}])
            } else {
                json!([])
            }
        }
    })
}

/// Three passes, one failure and one flaky test (failed, then passed on retry)
pub fn five_test_run(project: &str) -> Vec<Value> {
    vec![
        json!({"event": "begin", "rootDir": "/repo"}),
        test_end(project, "a", "expected", "passed", 0),
        test_end(project, "b", "expected", "passed", 0),
        test_end(project, "c", "expected", "passed", 0),
        test_end(project, "d", "unexpected", "failed", 0),
        test_end(project, "e", "flaky", "failed", 0),
        test_end(project, "e", "flaky", "passed", 1),
        json!({"event": "end", "status": "failed", "duration": 4000}),
    ]
}

/// Write events as JSON Lines and return the file path
pub fn write_events(dir: &Path, name: &str, events: &[Value]) -> PathBuf {
    let path = dir.join(name);
    let lines: Vec<String> = events.iter().map(Value::to_string).collect();
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

pub fn write_config(dir: &Path, name: &str, config: Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, config.to_string()).unwrap();
    path
}

/// Run one shard of a sharded run through `ortoni report`
pub fn run_shard(work: &Path, report_dir: &Path, project: &str, current: u32, total: u32) {
    let events = write_events(
        work,
        &format!("{}.jsonl", project),
        &five_test_run(project),
    );
    let config = write_config(
        work,
        &format!("shard-{}.json", current),
        json!({
            "title": "Sharded run",
            "saveHistory": true,
            "meta": {"branch": "main"},
            "shard": {"current": current, "total": total}
        }),
    );
    ortoni()
        .arg("report")
        .arg("--events")
        .arg(&events)
        .arg("--config")
        .arg(&config)
        .arg("--folder")
        .arg(report_dir)
        .assert()
        .success();
}

/// Extract the embedded report payload from a generated HTML report
pub fn read_report_payload(path: &Path) -> Value {
    let html = fs::read_to_string(path).unwrap();
    let marker = "id=\"ortoni-report-data\"";
    let start = html.find(marker).expect("payload element missing");
    let open = start + html[start..].find('>').unwrap() + 1;
    let close = open + html[open..].find("</script>").unwrap();
    serde_json::from_str(&html[open..close]).unwrap()
}
