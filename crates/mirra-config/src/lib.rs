// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Mirra.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment
//! variable overrides, miette diagnostic rendering, and the runtime rule
//! store (mapping rules + global enabled flag).
//!
//! # Usage
//!
//! ```no_run
//! use mirra_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod rules;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{MirraConfig, ReplicationConfig};
pub use rules::{RuleDocument, RuleStore};

/// Load configuration from the XDG hierarchy and validate it.
///
/// The high-level entry point: loads config from TOML files + env vars via
/// Figment, then runs post-deserialization validation. Returns either a
/// valid [`MirraConfig`] or a list of diagnostic errors.
pub fn load_and_validate() -> Result<MirraConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<MirraConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        let config = load_and_validate_str("").unwrap();
        assert_eq!(config.agent.name, "mirra");
    }

    #[test]
    fn semantic_errors_are_reported() {
        let errors = load_and_validate_str("[replication]\nbatch_size = 0\n").unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("batch_size")));
    }

    #[test]
    fn parse_errors_are_reported() {
        let errors = load_and_validate_str("[agent]\nname = 3\n").unwrap_err();
        assert!(!errors.is_empty());
    }
}
