// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: child processes and interpreter probing

mod env;
pub mod process;
pub mod subprocess;

pub use process::{ProcessError, ProcessEvent, ProcessHandle, Signal, SpawnConfig};
pub use subprocess::{detect_interpreter, Interpreter, INTERPRETER_CANDIDATES};
