//! Logger setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
//! Logs go to stderr so reports on stdout stay clean for piping.

use env_logger::{Builder, Env};

pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // Already initialized (e.g. by a test harness) is fine.
    let _ = Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
