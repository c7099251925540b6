// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI subsystem shared by the detgeom binaries

pub mod loader;
pub mod reporter;

pub use loader::{load_inputs, InputKind};
pub use reporter::Reporter;

/// Set up `env_logger`. `RUST_LOG` wins; otherwise each `-v` raises the
/// level from warn to info, debug and trace.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    if let Err(e) = env_logger::Builder::from_env(env).format_timestamp(None).try_init() {
        eprintln!("Logger already initialised: {}", e);
    }
}
