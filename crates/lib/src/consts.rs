//! Crate-wide constants.

use std::time::Duration;

/// Name of the build descriptor file every module carries.
pub const DESCRIPTOR_FILE: &str = "BROC";

/// Default number of loader worker threads.
pub const DEFAULT_WORKERS: usize = 5;

/// How long a worker blocks on an empty queue before re-checking the stop flag.
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

/// Name of the global table exposed to descriptor scripts.
pub const LUA_GLOBAL: &str = "broc";
