// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::LaunchSpec;
use crate::event_hub::Subscription;
use std::time::Duration;
use tether_core::{EventKind, FakeClock};
use tokio::sync::mpsc::UnboundedReceiver;

/// Behaves like the real agent: interactive with no arguments, one-shot otherwise.
const AGENT: &str = r#"if [ $# -eq 0 ]; then while read line; do echo "echo:$line"; done; else eval "$1"; fi"#;

fn launch(agent_body: &str) -> LaunchSpec {
    let script = format!(
        r#"if [ $# -eq 0 ]; then {agent_body}; else eval "$1"; fi"#
    );
    LaunchSpec::new("sh").base_args(["-c".to_string(), script, "agent".to_string()])
}

fn supervisor() -> Supervisor {
    Supervisor::new(SupervisorConfig::new(
        LaunchSpec::new("sh").base_args(["-c", AGENT, "agent"]),
    ))
}

fn supervisor_with(agent_body: &str, stop_timeout: Duration) -> Supervisor {
    Supervisor::new(SupervisorConfig::new(launch(agent_body)).stop_timeout(stop_timeout))
}

fn watch_events<C: Clock>(sup: &Supervisor<C>) -> (Subscription, UnboundedReceiver<BridgeEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = sup.events().subscribe(move |event| {
        let _ = tx.send(event.clone());
    });
    (sub, rx)
}

async fn wait_for(
    rx: &mut UnboundedReceiver<BridgeEvent>,
    mut pred: impl FnMut(&BridgeEvent) -> bool,
) -> BridgeEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if pred(&event) {
            return event;
        }
    }
}

async fn wait_for_output(rx: &mut UnboundedReceiver<BridgeEvent>, needle: &str) {
    let mut seen = String::new();
    while !seen.contains(needle) {
        if let BridgeEvent::Log { data, .. } = wait_for(rx, |e| e.kind() == EventKind::Log).await {
            seen.push_str(&data);
        }
    }
}

#[tokio::test]
async fn status_is_idle_before_start() {
    let sup = supervisor();
    let status = sup.get_status();
    assert!(!status.running);
    assert_eq!(status.state, SupervisorState::Idle);
    assert_eq!(status.pid, None);
    assert_eq!(status.uptime_ms, None);
}

#[tokio::test]
async fn second_start_is_rejected() {
    let sup = supervisor();
    let pid = sup.start_agent().unwrap();

    let status = sup.get_status();
    assert!(status.running);
    assert_eq!(status.state, SupervisorState::Running);
    assert_eq!(status.pid, Some(pid));

    assert!(matches!(sup.start_agent(), Err(SupervisorError::AlreadyRunning)));
    sup.stop_agent().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_admit_exactly_one() {
    let sup = supervisor();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let sup = sup.clone();
            tokio::spawn(async move { sup.start_agent() })
        })
        .collect();

    let mut started = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => started += 1,
            Err(SupervisorError::AlreadyRunning) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(rejected, 7);
    sup.stop_agent().await.unwrap();
}

#[tokio::test]
async fn ping_pong_then_stop() {
    let sup = supervisor();
    let (_sub, mut rx) = watch_events(&sup);
    sup.start_agent().unwrap();

    assert!(sup.send_input("ping"));
    assert!(sup.send_input("pong"));
    wait_for_output(&mut rx, "echo:ping\necho:pong\n").await;

    let exit = sup.stop_agent().await.unwrap();
    assert_eq!(exit.signal.as_deref(), Some("SIGTERM"));

    let stopped = wait_for(&mut rx, |e| e.kind() == EventKind::AgentStopped).await;
    assert_eq!(stopped, BridgeEvent::stopped(&exit));
    let status = sup.get_status();
    assert!(!status.running);
    assert_eq!(status.state, SupervisorState::Stopped);
}

#[tokio::test]
async fn stubborn_agent_is_killed_after_grace() {
    let sup = supervisor_with(
        "trap '' TERM; while true; do sleep 0.1; done",
        Duration::from_millis(300),
    );
    sup.start_agent().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let exit = sup.stop_agent().await.unwrap();
    assert_eq!(exit.signal.as_deref(), Some("SIGKILL"));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(!sup.get_status().running);
}

#[tokio::test]
async fn stop_without_agent_is_not_running() {
    let sup = supervisor();
    assert!(matches!(sup.stop_agent().await, Err(SupervisorError::NotRunning)));
}

#[tokio::test]
async fn concurrent_stops_share_one_exit() {
    let sup = supervisor_with(
        "trap '' TERM; while true; do sleep 0.1; done",
        Duration::from_millis(200),
    );
    let (_sub, mut rx) = watch_events(&sup);
    sup.start_agent().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (a, b) = tokio::join!(sup.stop_agent(), sup.stop_agent());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);

    let mut stopping = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(
            event,
            BridgeEvent::AgentState {
                state: SupervisorState::Stopping,
                ..
            }
        ) {
            stopping += 1;
        }
    }
    assert_eq!(stopping, 1);
}

#[tokio::test]
async fn crash_is_reported_with_exit_code() {
    let sup = supervisor_with("echo bye; exit 3", Duration::from_secs(5));
    let (_sub, mut rx) = watch_events(&sup);
    sup.start_agent().unwrap();

    let stopped = wait_for(&mut rx, |e| e.kind() == EventKind::AgentStopped).await;
    assert_eq!(
        stopped,
        BridgeEvent::AgentStopped {
            exit_code: Some(3),
            signal: None
        }
    );
    assert!(!sup.get_status().running);
    assert!(matches!(sup.stop_agent().await, Err(SupervisorError::NotRunning)));

    let logs = sup.get_logs();
    let streams: Vec<StreamTag> = logs.iter().map(|l| l.stream).collect();
    assert_eq!(
        streams,
        vec![StreamTag::Info, StreamTag::Stdout, StreamTag::Info]
    );
    assert_eq!(logs[1].text, "bye\n");
    assert_eq!(logs[2].text, "agent exited: code 3");
}

#[tokio::test]
async fn no_log_event_follows_agent_stopped() {
    let sup = supervisor_with(
        "i=0; while [ $i -lt 100 ]; do echo line$i; i=$((i+1)); done",
        Duration::from_secs(5),
    );
    let (_sub, mut rx) = watch_events(&sup);
    sup.start_agent().unwrap();

    wait_for(&mut rx, |e| e.kind() == EventKind::AgentStopped).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(event) = rx.try_recv() {
        assert_ne!(event.kind(), EventKind::Log, "log after stop: {:?}", event);
    }
}

#[tokio::test]
async fn agent_can_be_restarted_after_exit() {
    let sup = supervisor();
    let first = sup.start_agent().unwrap();
    sup.stop_agent().await.unwrap();
    let second = sup.start_agent().unwrap();
    assert_ne!(first, second);
    assert_eq!(sup.get_status().pid, Some(second));
    sup.stop_agent().await.unwrap();
}

#[tokio::test]
async fn send_input_without_agent_is_false() {
    let sup = supervisor();
    assert!(!sup.send_input("hello"));
}

#[tokio::test]
async fn send_input_after_stdin_closed_is_false() {
    let sup = supervisor_with("exec 0<&-; sleep 30", Duration::from_secs(5));
    sup.start_agent().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    // The first write may be accepted before the broken pipe is noticed
    let _ = sup.send_input("one");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!sup.send_input("two"));
    sup.stop_agent().await.unwrap();
}

#[tokio::test]
async fn start_failure_emits_agent_error() {
    let sup = Supervisor::new(SupervisorConfig::new(LaunchSpec::new(
        "/nonexistent/python3",
    )));
    let (_sub, mut rx) = watch_events(&sup);

    let err = sup.start_agent().unwrap_err();
    assert!(matches!(err, SupervisorError::Spawn(_)));
    assert_eq!(sup.get_status().state, SupervisorState::Idle);

    let event = wait_for(&mut rx, |e| e.kind() == EventKind::AgentError).await;
    let BridgeEvent::AgentError { message } = event else {
        panic!("expected agent error");
    };
    assert!(message.contains("/nonexistent/python3"), "got: {}", message);
    assert_eq!(sup.get_logs()[0].stream, StreamTag::Error);
}

#[tokio::test]
async fn uptime_follows_the_clock() {
    let clock = FakeClock::new();
    let sup = Supervisor::with_clock(
        SupervisorConfig::new(LaunchSpec::new("sh").base_args(["-c", AGENT, "agent"])),
        clock.clone(),
    );
    sup.start_agent().unwrap();
    clock.advance(Duration::from_secs(5));
    assert_eq!(sup.get_status().uptime_ms, Some(5000));
    sup.stop_agent().await.unwrap();
}

#[tokio::test]
async fn logs_are_bounded_and_clearable() {
    let sup = Supervisor::new(
        SupervisorConfig::new(launch("i=0; while [ $i -lt 50 ]; do echo $i; sleep 0.01; i=$((i+1)); done"))
            .log_capacity(10),
    );
    let (_sub, mut rx) = watch_events(&sup);
    sup.start_agent().unwrap();
    wait_for(&mut rx, |e| e.kind() == EventKind::AgentStopped).await;

    let logs = sup.get_logs();
    assert_eq!(logs.len(), 10);
    assert_eq!(logs.last().unwrap().text, "agent exited: code 0");

    sup.clear_logs();
    assert!(sup.get_logs().is_empty());
}

#[tokio::test]
async fn run_command_collects_stdout() {
    let sup = supervisor();
    let (_sub, mut rx) = watch_events(&sup);
    let result = sup
        .run_command(CommandRequest::new(["echo version 1.2"]))
        .await;

    assert!(result.success);
    assert_eq!(result.output, "version 1.2\n");
    assert_eq!(result.error, None);
    assert_eq!(result.exit_code, Some(0));
    let event = wait_for(&mut rx, |e| e.kind() == EventKind::CommandOutput).await;
    assert_eq!(
        event,
        BridgeEvent::CommandOutput {
            text: "version 1.2\n".into()
        }
    );
}

#[tokio::test]
async fn run_command_failure_carries_stderr() {
    let sup = supervisor();
    let result = sup
        .run_command(CommandRequest::new(["echo partial; echo broken >&2; exit 2"]))
        .await;
    assert!(!result.success);
    assert_eq!(result.output, "partial\n");
    assert_eq!(result.error.as_deref(), Some("broken\n"));
    assert_eq!(result.exit_code, Some(2));
}

#[tokio::test]
async fn run_command_failure_without_stderr_describes_exit() {
    let sup = supervisor();
    let result = sup.run_command(CommandRequest::new(["exit 5"])).await;
    assert_eq!(result.error.as_deref(), Some("process exited with code 5"));
}

#[tokio::test]
async fn run_command_does_not_touch_the_agent() {
    let sup = supervisor();
    let pid = sup.start_agent().unwrap();
    let result = sup.run_command(CommandRequest::new(["echo side"])).await;
    assert!(result.success);
    assert_eq!(sup.get_status().pid, Some(pid));
    assert!(sup.get_logs().iter().all(|l| !l.text.contains("side")));
    sup.stop_agent().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_do_not_interleave() {
    let sup = supervisor();
    let a = sup.run_command(CommandRequest::new([
        "for i in 1 2 3 4 5; do echo a$i; sleep 0.02; done",
    ]));
    let b = sup.run_command(CommandRequest::new([
        "for i in 1 2 3 4 5; do echo b$i; sleep 0.02; done",
    ]));
    let (a, b) = tokio::join!(a, b);
    assert_eq!(a.output, "a1\na2\na3\na4\na5\n");
    assert_eq!(b.output, "b1\nb2\nb3\nb4\nb5\n");
}

#[tokio::test]
async fn run_command_with_missing_interpreter() {
    let sup = Supervisor::new(SupervisorConfig::new(LaunchSpec::python_module(
        "/nonexistent/python3",
        "itak.cli.cli",
        "/",
    )));
    let result = sup.run_command(CommandRequest::new(["--version"])).await;
    assert!(!result.success);
    assert_eq!(result.exit_code, None);
    let error = result.error.unwrap();
    assert!(error.contains("/nonexistent/python3"), "got: {}", error);
}

#[tokio::test]
async fn run_command_timeout_escalates() {
    let sup = Supervisor::new(
        SupervisorConfig::new(LaunchSpec::new("sh").base_args(["-c", AGENT, "agent"]))
            .command_timeout(Duration::from_millis(200))
            .stop_timeout(Duration::from_millis(200)),
    );
    let started = Instant::now();
    let result = sup
        .run_command(CommandRequest::new([
            "trap '' TERM; echo begun; while true; do sleep 0.1; done",
        ]))
        .await;
    assert!(!result.success);
    assert_eq!(result.output, "begun\n");
    assert_eq!(result.exit_code, None);
    assert_eq!(result.error.as_deref(), Some("command timed out after 200ms"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn shutdown_stops_running_agent() {
    let sup = supervisor();
    sup.start_agent().unwrap();
    sup.shutdown().await;
    assert!(!sup.get_status().running);
    // Idempotent when nothing is running
    sup.shutdown().await;
}

#[tokio::test]
async fn run_command_output_is_capped() {
    let sup = Supervisor::new(
        SupervisorConfig::new(LaunchSpec::new("sh").base_args(["-c", AGENT, "agent"]))
            .command_output_limit(10),
    );
    let result = sup
        .run_command(CommandRequest::new(["printf '%0100d' 0"]))
        .await;
    assert!(result.success);
    assert_eq!(result.output, "0000000000\n[output truncated at 10 bytes]\n");
}

#[yare::parameterized(
    fits      = { &["abc", "de"], 5, "abcde" },
    cut       = { &["abcdef"],    4, "abcd\n[output truncated at 4 bytes]\n" },
    char_edge = { &["h\u{e9}llo"], 2, "h\n[output truncated at 2 bytes]\n" },
    after_cut = { &["abcd", "ef"], 4, "abcd\n[output truncated at 4 bytes]\n" },
)]
fn capped_text(chunks: &[&str], limit: usize, expected: &str) {
    let mut text = CappedText::default();
    for chunk in chunks {
        text.push(chunk, limit);
    }
    assert_eq!(text.finish(limit), expected);
}
