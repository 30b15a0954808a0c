// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn enabled_guard_suppresses_and_reports() {
    let hub = EventHub::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = hub.subscribe(move |e| sink.lock().push(e.clone()));

    let guard = ExitGuard::new(hub, true);
    assert_eq!(guard.intercept(130), ExitDecision::Suppressed);
    assert_eq!(*seen.lock(), vec![BridgeEvent::ExitAttempt { code: 130 }]);
}

#[test]
fn disabled_guard_lets_exit_proceed_silently() {
    let hub = EventHub::new();
    let seen = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&seen);
    let _sub = hub.subscribe(move |_| *sink.lock() += 1);

    let guard = ExitGuard::new(hub, false);
    assert_eq!(guard.intercept(0), ExitDecision::Proceed);
    assert_eq!(*seen.lock(), 0);
}
