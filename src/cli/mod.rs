// Copyright 2024-2026 model-hotreload Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for one-shot commands.
//!
//! ## Usage
//!
//! ```bash
//! model-hotreload status          # Load the artifact once and print status
//! model-hotreload status --json   # Same, as JSON
//! model-hotreload config show     # Effective configuration
//! ```

pub mod config_cmd;
pub mod status_cmd;

pub use status_cmd::run_status;

/// Success / healthy.
pub const EXIT_OK: i32 = 0;
/// Command ran and reported a failure.
pub const EXIT_FAILURE: i32 = 1;
/// Configuration or bootstrap error.
pub const EXIT_CONFIG: i32 = 2;
