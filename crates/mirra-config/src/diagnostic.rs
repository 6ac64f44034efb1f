// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics rendered via miette.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic metadata for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A semantic validation failure for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(mirra::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// A deserialization failure reported by Figment.
    #[error("configuration error: {message}")]
    #[diagnostic(
        code(mirra::config::parse),
        help("check mirra.toml against the documented keys; unknown keys are rejected")
    )]
    Parse {
        /// Figment's description of the failure, including the key path.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(mirra::config::other))]
    Other(String),
}

/// Convert a Figment extraction error into diagnostic errors, one per
/// underlying failure.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render collected configuration errors to stderr as miette reports.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(error.to_string());
        eprintln!("{report:?}");
    }
}
