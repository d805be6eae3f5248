//! CLI tests for `cadfetch run`, `report` and `init`.
//!
//! Spawns the cadfetch binary in a temp directory and verifies exit codes and
//! the files each command leaves behind.

use std::fs;
use std::path::Path;
#[cfg(unix)]
use std::process::{Child, Stdio};
use std::process::{Command, Output};
#[cfg(unix)]
use std::thread;
#[cfg(unix)]
use std::time::Duration;

use cadfetch::exit_codes;
use cadfetch::io::config::{DEFAULT_CONFIG_FILE, FetchConfig, load_config, write_config};

fn write_test_config(root: &Path, argv: &[&str]) -> FetchConfig {
    let mut config = FetchConfig::default();
    config.downloader.delay_seconds = 0.0;
    config.downloader.retry_cycles = 1;
    config.command.argv = argv.iter().map(|arg| arg.to_string()).collect();
    config.command.timeout_secs = 10;
    write_config(&root.join(DEFAULT_CONFIG_FILE), &config).expect("write config");
    config
}

fn cadfetch(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cadfetch"))
        .current_dir(root)
        .args(args)
        .output()
        .expect("spawn cadfetch")
}

#[test]
fn run_without_input_file_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = cadfetch(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("input file not found"), "stderr: {stderr}");
    assert!(!temp.path().join("pending.txt").exists());
    assert!(!temp.path().join("output").exists());
}

#[test]
fn run_with_missing_tool_leaves_everything_pending() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_test_config(
        temp.path(),
        &["cadfetch-test-no-such-tool", "{id}", "{dest}"],
    );
    fs::write(temp.path().join("cad_nums.txt"), "A\nB\n").expect("input");

    let output = cadfetch(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(temp.path().join("pending.txt")).expect("pending"),
        "A\nB\n"
    );
    assert!(temp.path().join("telemetry.json").is_file());
    assert!(temp.path().join("cadfetch.log").is_file());
    assert!(!temp.path().join("output_temp").exists());
}

#[test]
fn preexisting_stop_flag_interrupts_before_first_item() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_test_config(
        temp.path(),
        &["cadfetch-test-no-such-tool", "{id}", "{dest}"],
    );
    fs::write(temp.path().join("cad_nums.txt"), "X\nY\n").expect("input");
    fs::write(temp.path().join("stop.flag"), "stop\n").expect("flag");

    let output = cadfetch(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::INTERRUPTED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PARTIAL REPORT"), "stdout: {stdout}");
    assert_eq!(
        fs::read_to_string(temp.path().join("pending.txt")).expect("pending"),
        "X\nY\n"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("telemetry.json")).expect("telemetry"),
        "[]\n"
    );
    assert!(!temp.path().join("stop.flag").exists());
}

#[cfg(unix)]
#[test]
fn run_collects_artifacts_written_by_the_tool() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_test_config(
        temp.path(),
        &[
            "sh",
            "-c",
            "if [ \"$1\" = missing ]; then echo 'Object not found' >&2; exit 1; fi; printf '{}' > \"$2\"",
            "sh",
            "{id}",
            "{dest}",
        ],
    );
    fs::write(temp.path().join("cad_nums.txt"), "good\nmissing\n").expect("input");

    let output = cadfetch(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(temp.path().join("output/good.geojson")).expect("artifact"),
        "{}"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("pending.txt")).expect("pending"),
        ""
    );
}

#[cfg(unix)]
fn spawn_cadfetch(root: &Path, args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_cadfetch"))
        .current_dir(root)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn cadfetch")
}

#[cfg(unix)]
fn send_sigint(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill -INT");
    assert!(status.success());
}

#[cfg(unix)]
#[test]
fn sigint_during_run_writes_partial_report() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_test_config(
        temp.path(),
        &[
            "sh",
            "-c",
            "sleep 2; echo 'server busy' >&2; exit 1",
            "sh",
            "{id}",
            "{dest}",
        ],
    );
    fs::write(temp.path().join("cad_nums.txt"), "X\nY\nZ\n").expect("input");

    let child = spawn_cadfetch(temp.path(), &["run"]);
    thread::sleep(Duration::from_millis(700));
    send_sigint(&child);
    let output = child.wait_with_output().expect("wait cadfetch");

    assert_eq!(output.status.code(), Some(exit_codes::INTERRUPTED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PARTIAL REPORT (interrupted)"), "stdout: {stdout}");
    assert_eq!(
        fs::read_to_string(temp.path().join("pending.txt")).expect("pending"),
        "X\nY\nZ\n"
    );
    assert!(temp.path().join("telemetry.json").is_file());
}

#[cfg(unix)]
#[test]
fn second_sigint_exits_without_waiting_for_the_tool() {
    use wait_timeout::ChildExt;

    let temp = tempfile::tempdir().expect("tempdir");
    write_test_config(
        temp.path(),
        &["sh", "-c", "sleep 30", "sh", "{id}", "{dest}"],
    );
    fs::write(temp.path().join("cad_nums.txt"), "X\n").expect("input");

    let mut child = spawn_cadfetch(temp.path(), &["run"]);
    thread::sleep(Duration::from_millis(700));
    send_sigint(&child);
    thread::sleep(Duration::from_millis(200));
    send_sigint(&child);

    let status = child
        .wait_timeout(Duration::from_secs(10))
        .expect("wait cadfetch");
    let Some(status) = status else {
        child.kill().expect("kill stuck cadfetch");
        panic!("cadfetch ignored the second interrupt");
    };
    assert_eq!(status.code(), Some(exit_codes::INTERRUPTED));
    assert!(!temp.path().join("pending.txt").exists());
}

#[test]
fn report_rebuilds_pending_from_telemetry() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("cad_nums.txt"), "A\nB\nC\n").expect("input");
    fs::write(
        temp.path().join("telemetry.json"),
        r#"[
  {"ts": "2024-05-01T12:00:00.000000", "cad": "A", "event": "success", "file": "A.geojson", "size": 10},
  {"ts": "2024-05-01T12:00:01.000000", "cad": "B", "event": "error", "error": "not_found"}
]
"#,
    )
    .expect("telemetry");

    let output = cadfetch(temp.path(), &["report"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(temp.path().join("pending.txt")).expect("pending"),
        "C\n"
    );
}

#[test]
fn init_writes_loadable_default_config() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = cadfetch(temp.path(), &["init"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let config = load_config(&temp.path().join(DEFAULT_CONFIG_FILE)).expect("load");
    assert_eq!(config, FetchConfig::default());
}

#[test]
fn init_keeps_existing_config_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");
    let custom = write_test_config(temp.path(), &["tool", "{id}", "{dest}"]);

    let output = cadfetch(temp.path(), &["init"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let kept = load_config(&temp.path().join(DEFAULT_CONFIG_FILE)).expect("load");
    assert_eq!(kept, custom);

    let output = cadfetch(temp.path(), &["init", "--force"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let replaced = load_config(&temp.path().join(DEFAULT_CONFIG_FILE)).expect("load");
    assert_eq!(replaced, FetchConfig::default());
}
