use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "recstream-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn root_arg(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_recstream<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_recstream");
    Command::new(bin)
        .args(args)
        .output()
        .expect("recstream command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn run_json(args: &[&str]) -> Value {
    let output = run_recstream(args);
    assert_success(&output);
    parse_json_stdout(&output)
}

fn put(root: &str, id: &str, tag: &str) -> i64 {
    let payload = run_json(&[
        "put",
        "--id",
        id,
        "--type",
        "Job@1",
        "--payload",
        r#"{"steps":3}"#,
        "--tag",
        tag,
        "--root",
        root,
        "--json",
    ]);
    assert_eq!(payload["action"], "record.put");
    payload["result"]["internal_record_id"]
        .as_i64()
        .expect("internal record id should be present")
}

#[test]
fn put_and_records_json_smoke() {
    let tmp = TempDirGuard::new("put-records");
    let root = tmp.root_arg();
    assert_eq!(put(root.as_str(), "job-1", "team=red"), 1);
    assert_eq!(put(root.as_str(), "job-2", "team=blue"), 2);

    let payload = run_json(&["records", "--tag", "team=blue", "--root", root.as_str(), "--json"]);
    assert_eq!(payload["count"], 1);
    assert_eq!(
        payload["records"][0]["record"]["metadata"]["id"]["serialized_id"],
        "job-2"
    );

    let latest = run_json(&["records", "--latest", "--root", root.as_str(), "--json"]);
    assert_eq!(latest["count"], 1);
    assert_eq!(latest["records"][0]["record"]["internal_record_id"], 2);
    assert!(tmp.path().join("default.jsonl").exists());
}

#[test]
fn put_rejects_invalid_payload_and_strategy_combinations() {
    let tmp = TempDirGuard::new("put-invalid");
    let root = tmp.root_arg();
    let output = run_recstream([
        "put", "--id", "job-1", "--type", "Job", "--payload", "{not json", "--root", root.as_str(),
    ]);
    assert_failure(&output);

    let output = run_recstream([
        "put",
        "--id",
        "job-1",
        "--type",
        "Job",
        "--payload",
        "{}",
        "--existing",
        "prune-if-found-by-id",
        "--root",
        root.as_str(),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("retentionCount"));
}

#[test]
fn handling_lifecycle_json_smoke() {
    let tmp = TempDirGuard::new("lifecycle");
    let root = tmp.root_arg();
    let id = put(root.as_str(), "job-1", "team=red");
    let id_arg = id.to_string();

    let claimed = run_json(&["handle", "claim", "--concern", "build", "--root", root.as_str(), "--json"]);
    assert_eq!(claimed["action"], "handle.TryHandleRecord");
    assert_eq!(claimed["outcome"]["outcome"], "claimed");
    assert_eq!(claimed["outcome"]["record_to_handle"]["internal_record_id"], id);

    let fail = run_json(&[
        "handle", "fail", id_arg.as_str(), "--concern", "build", "--details", "flaky", "--root", root.as_str(),
        "--json",
    ]);
    assert_eq!(fail["outcome"]["outcome"], "applied");

    let status = run_json(&[
        "handle", "status", id_arg.as_str(), "--concern", "build", "--root", root.as_str(), "--json",
    ]);
    assert_eq!(status["outcome"]["status"], "failed");

    run_json(&[
        "handle", "retry", id_arg.as_str(), "--concern", "build", "--details", "again", "--root", root.as_str(),
        "--json",
    ]);
    run_json(&["handle", "claim", "--concern", "build", "--root", root.as_str(), "--json"]);
    run_json(&[
        "handle", "complete", id_arg.as_str(), "--concern", "build", "--root", root.as_str(), "--json",
    ]);

    let composite = run_json(&[
        "handle", "composite", "--concern", "build", "--tag", "team=red", "--root", root.as_str(),
        "--json",
    ]);
    assert_eq!(composite["outcome"]["status"], "completed");

    let history = run_json(&[
        "handle", "history", id_arg.as_str(), "--concern", "build", "--root", root.as_str(), "--json",
    ]);
    let statuses: Vec<&str> = history["outcome"]["entries"]
        .as_array()
        .expect("entries should be an array")
        .iter()
        .map(|entry| {
            entry["metadata"]["status"]
                .as_str()
                .expect("status should be a string")
        })
        .collect();
    assert_eq!(
        statuses,
        vec!["requested", "running", "failed", "retry_failed", "running", "completed"]
    );
}

#[test]
fn illegal_transition_fails_with_observed_status() {
    let tmp = TempDirGuard::new("illegal");
    let root = tmp.root_arg();
    let id = put(root.as_str(), "job-1", "team=red").to_string();
    let output = run_recstream([
        "handle",
        "complete",
        id.as_str(),
        "--concern",
        "build",
        "--root",
        root.as_str(),
    ]);
    assert_failure(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CompleteRunningHandleRecordExecution"), "{stderr}");
    assert!(stderr.contains("status is none"), "{stderr}");
}

#[test]
fn disabled_stream_blocks_claims_until_enabled() {
    let tmp = TempDirGuard::new("stream-block");
    let root = tmp.root_arg();
    put(root.as_str(), "job-1", "team=red");

    run_json(&[
        "handle", "disable-stream", "--details", "maintenance", "--root", root.as_str(), "--json",
    ]);
    let claimed = run_json(&["handle", "claim", "--concern", "build", "--root", root.as_str(), "--json"]);
    assert_eq!(claimed["outcome"]["is_blocked"], true);
    assert!(claimed["outcome"]["record_to_handle"].is_null());

    run_json(&[
        "handle", "enable-stream", "--details", "done", "--root", root.as_str(), "--json",
    ]);
    let claimed = run_json(&["handle", "claim", "--concern", "build", "--root", root.as_str(), "--json"]);
    assert_eq!(claimed["outcome"]["record_to_handle"]["internal_record_id"], 1);

    let output = run_recstream([
        "handle",
        "enable-stream",
        "--details",
        "again",
        "--root",
        root.as_str(),
    ]);
    assert_failure(&output);
}

#[test]
fn reserved_concerns_are_rejected() {
    let tmp = TempDirGuard::new("reserved");
    let root = tmp.root_arg();
    let output = run_recstream([
        "handle",
        "claim",
        "--concern",
        "RecordHandlingDisabledForStream",
        "--root",
        root.as_str(),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("reserved"));
}

#[test]
fn config_file_selects_locators() {
    let tmp = TempDirGuard::new("config");
    let config = tmp.path().join("stream.toml");
    fs::write(
        &config,
        format!(
            "name = \"jobs\"\nlocators = [\"east\", \"west\"]\nroot = {:?}\n",
            tmp.path().join("data").display().to_string()
        ),
    )
    .expect("config should be written");
    let config_arg = config.display().to_string();

    let payload = run_json(&[
        "put", "--id", "job-1", "--type", "Job", "--payload", "{}", "--config", config_arg.as_str(),
        "--json",
    ]);
    let locator = payload["result"]["resource_locator"]
        .as_str()
        .expect("locator should be reported")
        .to_string();
    assert!(locator == "east" || locator == "west", "{locator}");

    let output = run_recstream([
        "handle",
        "status",
        "1",
        "--concern",
        "build",
        "--config",
        config_arg.as_str(),
    ]);
    assert_failure(&output);

    let status = run_json(&[
        "handle", "status", "1", "--concern", "build", "--config", config_arg.as_str(), "--locator",
        locator.as_str(), "--json",
    ]);
    assert_eq!(status["outcome"]["status"], "none");
}

#[cfg(unix)]
#[test]
fn mutex_runs_command_and_releases() {
    let tmp = TempDirGuard::new("mutex");
    let root = tmp.root_arg();
    for _ in 0..2 {
        let payload = run_json(&[
            "mutex", "--id", "deploy", "--details", "smoke", "--root", root.as_str(), "--json", "--",
            "true",
        ]);
        assert_eq!(payload["success"], true);
    }

    let output = run_recstream([
        "mutex", "--id", "deploy", "--details", "smoke", "--root", root.as_str(), "--", "false",
    ]);
    assert_failure(&output);

    let history = run_json(&[
        "handle",
        "history",
        "1",
        "--concern",
        "StreamMutex",
        "--root",
        root.as_str(),
        "--json",
    ]);
    let entries = history["outcome"]["entries"]
        .as_array()
        .expect("entries should be an array");
    assert_eq!(entries.len(), 7);
    assert_eq!(
        entries
            .last()
            .and_then(|entry| entry["metadata"]["status"].as_str()),
        Some("self_canceled_running")
    );
}
