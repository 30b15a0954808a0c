// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::time::{Duration, Instant};

fn sh(script: &str) -> SpawnConfig {
    SpawnConfig::new("sh").args(["-c", script])
}

struct Collected {
    stdout: String,
    stderr: String,
    exit: ExitInfo,
    events_after_exit: usize,
}

async fn collect(mut rx: mpsc::Receiver<ProcessEvent>) -> Collected {
    let mut out = Collected {
        stdout: String::new(),
        stderr: String::new(),
        exit: ExitInfo::default(),
        events_after_exit: 0,
    };
    let mut seen_exit = false;
    let deadline = Duration::from_secs(10);
    while let Ok(Some(event)) = tokio::time::timeout(deadline, rx.recv()).await {
        if seen_exit {
            out.events_after_exit += 1;
        }
        match event {
            ProcessEvent::Output {
                stream: StreamTag::Stdout,
                text,
            } => out.stdout.push_str(&text),
            ProcessEvent::Output { text, .. } => out.stderr.push_str(&text),
            ProcessEvent::Failed(msg) => panic!("wait failed: {}", msg),
            ProcessEvent::Exited(exit) => {
                out.exit = exit;
                seen_exit = true;
            }
        }
    }
    out
}

#[tokio::test]
async fn captures_both_streams_and_exit_code() {
    let (handle, rx) = ProcessHandle::spawn(sh("echo out; echo err >&2; exit 3")).unwrap();
    assert!(handle.pid() > 0);

    let got = collect(rx).await;
    assert_eq!(got.stdout, "out\n");
    assert_eq!(got.stderr, "err\n");
    assert_eq!(got.exit, ExitInfo::code(3));
    assert_eq!(got.events_after_exit, 0);
    assert!(!handle.is_running());
    assert_eq!(handle.wait().await, ExitInfo::code(3));
}

#[tokio::test]
async fn exited_follows_all_output() {
    let (_handle, rx) = ProcessHandle::spawn(sh("i=0; while [ $i -lt 200 ]; do echo line$i; i=$((i+1)); done")).unwrap();
    let got = collect(rx).await;
    assert_eq!(got.stdout.lines().count(), 200);
    assert!(got.stdout.ends_with("line199\n"));
    assert_eq!(got.events_after_exit, 0);
    assert!(got.exit.success());
}

#[tokio::test]
async fn stdin_reaches_child() {
    let (handle, rx) = ProcessHandle::spawn(sh("read line; echo \"got $line\"")).unwrap();
    handle.write("ping\n").unwrap();
    let got = collect(rx).await;
    assert_eq!(got.stdout, "got ping\n");
}

#[tokio::test]
async fn close_stdin_delivers_eof() {
    let (handle, rx) = ProcessHandle::spawn(sh("cat; echo done")).unwrap();
    handle.write("a\n").unwrap();
    handle.close_stdin();
    let got = collect(rx).await;
    assert_eq!(got.stdout, "a\ndone\n");
    assert!(matches!(handle.write("late"), Err(ProcessError::NotRunning)));
}

#[tokio::test]
async fn terminate_reports_signal() {
    let (handle, rx) = ProcessHandle::spawn(sh("sleep 30")).unwrap();
    handle.signal(Signal::Terminate).unwrap();
    let got = collect(rx).await;
    assert_eq!(got.exit, ExitInfo::signaled("SIGTERM"));
    assert_eq!(handle.wait().await, ExitInfo::signaled("SIGTERM"));
}

#[tokio::test]
async fn signal_reaches_grandchildren() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("survived");
    let script = format!(
        "(sleep 2; touch {}) & wait",
        marker.display()
    );
    let (handle, rx) = ProcessHandle::spawn(sh(&script)).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.signal(Signal::Kill).unwrap();
    let got = collect(rx).await;
    assert_eq!(got.exit.signal.as_deref(), Some("SIGKILL"));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!marker.exists(), "background child outlived the group kill");
}

#[tokio::test]
async fn operations_after_exit_report_not_running() {
    let (handle, rx) = ProcessHandle::spawn(sh("exit 0")).unwrap();
    let _ = collect(rx).await;
    assert!(matches!(handle.signal(Signal::Terminate), Err(ProcessError::NotRunning)));
    assert!(matches!(handle.write("x"), Err(ProcessError::NotRunning)));
}

#[tokio::test]
async fn wait_without_consuming_events_after_drop() {
    let (handle, rx) = ProcessHandle::spawn(sh("echo ignored; exit 7")).unwrap();
    drop(rx);
    let exit = tokio::time::timeout(Duration::from_secs(10), handle.wait())
        .await
        .unwrap();
    assert_eq!(exit, ExitInfo::code(7));
}

#[tokio::test]
async fn cwd_and_env_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config = sh("pwd; echo $TETHER_TEST_VAR")
        .cwd(dir.path())
        .env("TETHER_TEST_VAR", "overlay");
    let (_handle, rx) = ProcessHandle::spawn(config).unwrap();
    let got = collect(rx).await;
    let mut lines = got.stdout.lines();
    let pwd = std::path::PathBuf::from(lines.next().unwrap());
    assert_eq!(
        pwd.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
    assert_eq!(lines.next(), Some("overlay"));
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let err = ProcessHandle::spawn(SpawnConfig::new("/nonexistent/tether-agent")).unwrap_err();
    match err {
        ProcessError::Spawn { program, .. } => assert_eq!(program, "/nonexistent/tether-agent"),
        other => panic!("expected spawn error, got {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn background_holder_does_not_block_exit_past_drain_timeout() {
    std::env::set_var("TETHER_DRAIN_TIMEOUT_MS", "200");
    let (handle, _rx) = ProcessHandle::spawn(sh("sleep 5 & echo started")).unwrap();
    let started = Instant::now();
    let exit = tokio::time::timeout(Duration::from_secs(4), handle.wait())
        .await
        .unwrap();
    std::env::remove_var("TETHER_DRAIN_TIMEOUT_MS");
    assert!(exit.success());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
#[serial]
async fn reaped_resolves_before_output_drains() {
    std::env::set_var("TETHER_DRAIN_TIMEOUT_MS", "1500");
    let (handle, _rx) = ProcessHandle::spawn(sh("sleep 3 & echo started")).unwrap();

    let started = Instant::now();
    let reaped = tokio::time::timeout(Duration::from_secs(1), handle.wait_reaped())
        .await
        .unwrap();
    assert!(reaped.success());
    assert!(!handle.is_running());

    let drained = handle.wait().await;
    std::env::remove_var("TETHER_DRAIN_TIMEOUT_MS");
    assert_eq!(drained, reaped);
    assert!(started.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test]
#[serial]
async fn abandoned_reader_emits_nothing_after_exited() {
    std::env::set_var("TETHER_DRAIN_TIMEOUT_MS", "200");
    let script = "(i=0; while [ $i -lt 200 ]; do echo tick; sleep 0.01; i=$((i+1)); done) & echo started";
    let (_handle, rx) = ProcessHandle::spawn(sh(script)).unwrap();
    let got = collect(rx).await;
    std::env::remove_var("TETHER_DRAIN_TIMEOUT_MS");
    assert!(got.exit.success());
    assert!(got.stdout.contains("started\n"));
    assert_eq!(got.events_after_exit, 0);
}

#[yare::parameterized(
    term = { 15, "SIGTERM" },
    kill = { 9,  "SIGKILL" },
    int  = { 2,  "SIGINT" },
)]
fn signal_names(signo: i32, name: &str) {
    assert_eq!(signal_name(signo), name);
}
