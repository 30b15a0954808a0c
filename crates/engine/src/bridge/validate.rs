// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounds on what the unprivileged side may pass in

use thiserror::Error;

pub const MAX_ARGS: usize = 256;
pub const MAX_ARG_BYTES: usize = 8 * 1024;
pub const MAX_INPUT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("too many arguments: {count} (max {max})")]
    TooManyArgs { count: usize, max: usize },
    #[error("argument {index} is {len} bytes (max {max})")]
    ArgTooLong { index: usize, len: usize, max: usize },
    #[error("argument {index} contains a NUL byte")]
    ArgContainsNul { index: usize },
    #[error("input is {len} bytes (max {max})")]
    InputTooLong { len: usize, max: usize },
    #[error("input contains a NUL byte")]
    InputContainsNul,
}

pub(crate) fn command_args(args: &[String]) -> Result<(), BridgeError> {
    if args.len() > MAX_ARGS {
        return Err(BridgeError::TooManyArgs {
            count: args.len(),
            max: MAX_ARGS,
        });
    }
    for (index, arg) in args.iter().enumerate() {
        if arg.len() > MAX_ARG_BYTES {
            return Err(BridgeError::ArgTooLong {
                index,
                len: arg.len(),
                max: MAX_ARG_BYTES,
            });
        }
        if arg.contains('\0') {
            return Err(BridgeError::ArgContainsNul { index });
        }
    }
    Ok(())
}

pub(crate) fn input(text: &str) -> Result<(), BridgeError> {
    if text.len() > MAX_INPUT_BYTES {
        return Err(BridgeError::InputTooLong {
            len: text.len(),
            max: MAX_INPUT_BYTES,
        });
    }
    if text.contains('\0') {
        return Err(BridgeError::InputContainsNul);
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
