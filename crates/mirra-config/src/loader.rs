// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./mirra.toml` > `~/.config/mirra/mirra.toml`
//! > `/etc/mirra/mirra.toml`, with environment variable overrides via the
//! `MIRRA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MirraConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mirra/mirra.toml` (system-wide)
/// 3. `~/.config/mirra/mirra.toml` (user XDG config)
/// 4. `./mirra.toml` (local directory)
/// 5. `MIRRA_*` environment variables
pub fn load_config() -> Result<MirraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MirraConfig::default()))
        .merge(Toml::file("/etc/mirra/mirra.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mirra/mirra.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mirra.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MirraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MirraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MirraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MirraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `MIRRA_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("MIRRA_").map(|key| {
        // Env keys arrive in their original (upper)case; the section
        // patterns only match the lowercased form.
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("replication_", "replication.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_loader_applies_overrides_on_defaults() {
        let config = load_config_from_str(
            "[replication]\npacing_delay_ms = 250\n\n[agent]\nlog_level = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(config.replication.pacing_delay_ms, 250);
        assert_eq!(config.agent.log_level, "debug");
        // Untouched sections keep their defaults.
        assert_eq!(config.replication.batch_size, 100);
    }

    #[test]
    fn env_vars_override_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("mirra.toml", "[replication]\nbatch_size = 10\n")?;
            jail.set_env("MIRRA_REPLICATION_BATCH_SIZE", "25");
            let config = load_config().expect("config should load");
            assert_eq!(config.replication.batch_size, 25);
            Ok(())
        });
    }

    #[test]
    fn uppercase_env_keys_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MIRRA_REPLICATION_SCAN_CAP", "500");
            let config = load_config().expect("config should load");
            assert_eq!(config.replication.scan_cap, 500);
            Ok(())
        });
    }

    #[test]
    fn underscored_keys_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MIRRA_STORAGE_DATABASE_PATH", "/tmp/custom.db");
            let config = load_config().expect("config should load");
            assert_eq!(config.storage.database_path, "/tmp/custom.db");
            Ok(())
        });
    }
}
