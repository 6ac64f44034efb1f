// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime rule store: the mapping rules and the global enabled flag.
//!
//! Rules are edited at runtime by the operator surface, so they live in a
//! small JSON document beside the database rather than in the static TOML
//! config. The format is not load-bearing for correctness: a missing or
//! corrupt document degrades to the empty default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use mirra_core::{ChannelRef, MappingRule, MirraError};

/// The persisted rule document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Global kill switch: when false, no rule matches anything.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
}

/// File-backed store for [`RuleDocument`].
///
/// Reads go to disk on every call so concurrent editors (CLI and a running
/// listener) always observe the latest document, mirroring how the engine
/// treats configuration as an external collaborator.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the rule document, degrading to the default on any failure.
    pub fn load(&self) -> RuleDocument {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "corrupt rule document, using defaults");
                    RuleDocument::default()
                }
            },
            Err(_) => RuleDocument::default(),
        }
    }

    /// Persist the rule document, creating parent directories as needed.
    pub fn save(&self, doc: &RuleDocument) -> Result<(), MirraError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| MirraError::Config(format!("cannot create rules dir: {e}")))?;
        }
        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| MirraError::Config(format!("cannot serialize rules: {e}")))?;
        std::fs::write(&self.path, content)
            .map_err(|e| MirraError::Config(format!("cannot write rules: {e}")))?;
        Ok(())
    }

    /// All configured rules, enabled or not.
    pub fn rules(&self) -> Vec<MappingRule> {
        self.load().rules
    }

    /// Add a rule. Adding a duplicate (source, target) pair is a no-op;
    /// returns whether a rule was added.
    pub fn add_rule(&self, source: ChannelRef, target: ChannelRef) -> Result<bool, MirraError> {
        let mut doc = self.load();
        if doc
            .rules
            .iter()
            .any(|r| r.source == source && r.target == target)
        {
            return Ok(false);
        }
        doc.rules.push(MappingRule {
            source,
            target,
            enabled: true,
        });
        self.save(&doc)?;
        Ok(true)
    }

    /// Remove a rule; returns whether one was removed.
    pub fn remove_rule(&self, source: &ChannelRef, target: &ChannelRef) -> Result<bool, MirraError> {
        let mut doc = self.load();
        let before = doc.rules.len();
        doc.rules
            .retain(|r| !(r.source == *source && r.target == *target));
        if doc.rules.len() == before {
            return Ok(false);
        }
        self.save(&doc)?;
        Ok(true)
    }

    /// Enable or disable a single rule; returns whether it was found.
    pub fn set_rule_enabled(
        &self,
        source: &ChannelRef,
        target: &ChannelRef,
        enabled: bool,
    ) -> Result<bool, MirraError> {
        let mut doc = self.load();
        let mut found = false;
        for rule in &mut doc.rules {
            if rule.source == *source && rule.target == *target {
                rule.enabled = enabled;
                found = true;
            }
        }
        if found {
            self.save(&doc)?;
        }
        Ok(found)
    }

    /// Whether replication is globally enabled.
    pub fn is_enabled(&self) -> bool {
        self.load().enabled
    }

    /// Flip the global kill switch.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), MirraError> {
        let mut doc = self.load();
        doc.enabled = enabled;
        self.save(&doc)
    }

    /// Targets of all enabled rules whose source matches.
    ///
    /// Empty when replication is globally disabled.
    pub fn targets_for(&self, source: &ChannelRef) -> Vec<ChannelRef> {
        let doc = self.load();
        if !doc.enabled {
            return Vec::new();
        }
        doc.rules
            .iter()
            .filter(|r| r.enabled && r.source == *source)
            .map(|r| r.target.clone())
            .collect()
    }
}
