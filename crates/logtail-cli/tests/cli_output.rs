//! Runs the `logtail` binary and checks what lands on stdout and stderr

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use logtail::LogEvent;
use tempfile::TempDir;

fn logtail(file: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logtail"))
        .arg("--file")
        .arg(file)
        .args(["--codec", "json"])
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8(output.stdout.clone())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_json_stdout_carries_only_events() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("job.tail");
    assert!(logtail(&file, &["append", "info", "started"]).status.success());
    assert!(logtail(&file, &["append", "warn", "slow"]).status.success());

    let output = logtail(&file, &["--json", "filter"]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    for line in &lines {
        serde_json::from_str::<LogEvent>(line).unwrap();
    }
}

#[test]
fn test_corrupt_record_diagnostics_stay_off_stdout() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("job.tail");
    assert!(logtail(&file, &["append", "info", "started"]).status.success());
    assert!(logtail(&file, &["append", "error", "failed"]).status.success());

    // Well-framed record whose payload is not a JSON event
    let mut raw = OpenOptions::new().append(true).open(&file).unwrap();
    raw.write_all(&4u32.to_be_bytes()).unwrap();
    raw.write_all(b"!!!!").unwrap();
    drop(raw);

    let output = logtail(&file, &["--json", "filter"]);
    assert!(output.status.success());
    for line in stdout_lines(&output) {
        serde_json::from_str::<LogEvent>(&line).unwrap();
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Query failed"));
}
