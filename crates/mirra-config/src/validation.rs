// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, collecting all failures rather than stopping at the first.

use crate::diagnostic::ConfigError;
use crate::model::MirraConfig;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with every collected validation error (does not fail fast).
pub fn validate_config(config: &MirraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{}` is not one of {:?}",
                config.agent.log_level, VALID_LOG_LEVELS
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.replication.rules_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "replication.rules_path must not be empty".to_string(),
        });
    }

    if config.replication.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "replication.batch_size must be at least 1".to_string(),
        });
    }

    if config.replication.scan_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "replication.scan_cap must be at least 1".to_string(),
        });
    }

    if config.replication.scan_cap < config.replication.batch_size as u64 {
        errors.push(ConfigError::Validation {
            message: format!(
                "replication.scan_cap ({}) must not be smaller than replication.batch_size ({})",
                config.replication.scan_cap, config.replication.batch_size
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
