// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_builder_collects_overrides() {
    let req = CommandRequest::new(["status", "--json"])
        .with_cwd("/tmp")
        .with_env("A", "1");
    assert_eq!(req.args, vec!["status", "--json"]);
    assert_eq!(req.cwd, Some(PathBuf::from("/tmp")));
    assert_eq!(req.env, vec![("A".to_string(), "1".to_string())]);
}

#[test]
fn spawn_failure_has_no_exit_code() {
    let result = CommandResult::spawn_failed("No such file or directory");
    assert!(!result.success);
    assert_eq!(result.exit_code, None);
    assert_eq!(result.error.as_deref(), Some("No such file or directory"));
}

#[test]
fn command_result_uses_camel_case_on_the_wire() {
    let result = CommandResult {
        success: false,
        output: "partial".to_string(),
        error: Some("boom".to_string()),
        exit_code: Some(2),
    };
    let json = serde_json::to_string(&result).unwrap();
    assert_eq!(
        json,
        r#"{"success":false,"output":"partial","error":"boom","exitCode":2}"#
    );
}

#[test]
fn bridge_result_ok_omits_error() {
    let json = serde_json::to_string(&BridgeResult::ok("Agent started")).unwrap();
    assert_eq!(json, r#"{"success":true,"output":"Agent started"}"#);
}

#[test]
fn bridge_result_err_carries_message() {
    let result = BridgeResult::err("Agent already running");
    assert!(!result.success);
    assert!(result.output.is_empty());
    assert_eq!(result.error.as_deref(), Some("Agent already running"));
}
