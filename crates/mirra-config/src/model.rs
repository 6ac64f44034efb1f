// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Mirra.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Every field has a compiled default, so an empty
//! config file is valid.

use serde::{Deserialize, Serialize};

/// Top-level Mirra configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides via the `MIRRA_` prefix.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirraConfig {
    /// Process identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Replication engine tuning.
    #[serde(default)]
    pub replication: ReplicationConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "mirra".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mirra").join("mirra.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "mirra.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Replication engine tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicationConfig {
    /// Path to the runtime rule document (mapping rules + enabled flag).
    #[serde(default = "default_rules_path")]
    pub rules_path: String,

    /// Fixed pacing delay between backfill items, in milliseconds.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// History page size used while scanning a channel.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Sleep between continuous-backfill cycles, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Wait before retrying a continuous cycle that errored, in seconds.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Maximum rate-limit retries for a single message.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Safety margin added on top of the platform-signaled wait, in seconds.
    #[serde(default = "default_flood_margin_secs")]
    pub flood_margin_secs: u64,

    /// Hard upper bound on messages scanned in one backfill invocation.
    #[serde(default = "default_scan_cap")]
    pub scan_cap: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            pacing_delay_ms: default_pacing_delay_ms(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            max_retries: default_max_retries(),
            flood_margin_secs: default_flood_margin_secs(),
            scan_cap: default_scan_cap(),
        }
    }
}

fn default_rules_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mirra").join("rules.json"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "rules.json".to_string())
}

fn default_pacing_delay_ms() -> u64 {
    1500
}

fn default_batch_size() -> usize {
    100
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_flood_margin_secs() -> u64 {
    1
}

fn default_scan_cap() -> u64 {
    100_000
}
