//! Aggregated outcome of one stop run.
//!
//! The report is the union of every independently attempted operation: a
//! failed item in one namespace never hides the items attempted in
//! another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tracelet_common::types::{NamespaceId, Outcome};

/// Outcome record for a single process, config file, or artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    /// Human-readable identity of the item (pid and command, or a path).
    pub subject: String,
    /// What happened to it.
    pub outcome: Outcome,
}

/// Per-namespace section of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceReport {
    /// Namespace this section covers.
    pub namespace: NamespaceId,
    /// One record per detach attempt.
    pub detaches: Vec<ItemReport>,
    /// One record per service config rewrite.
    pub configs: Vec<ItemReport>,
    /// One record per artifact removal.
    pub artifacts: Vec<ItemReport>,
    /// Structural failure confined to this namespace, if any. Other
    /// namespaces proceed regardless.
    pub error: Option<String>,
}

impl NamespaceReport {
    /// Creates an empty section for a namespace.
    #[must_use]
    pub const fn new(namespace: NamespaceId) -> Self {
        Self {
            namespace,
            detaches: Vec::new(),
            configs: Vec::new(),
            artifacts: Vec::new(),
            error: None,
        }
    }

    fn items(&self) -> impl Iterator<Item = &ItemReport> {
        self.detaches
            .iter()
            .chain(self.configs.iter())
            .chain(self.artifacts.iter())
    }
}

/// Full report of one stop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// One section per visited namespace, host first.
    pub namespaces: Vec<NamespaceReport>,
}

impl StopReport {
    /// Creates an empty report stamped with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            namespaces: Vec::new(),
        }
    }

    /// Items that could not be cleaned, qualified by their namespace, plus
    /// any per-namespace structural errors.
    #[must_use]
    pub fn unresolved(&self) -> Vec<String> {
        let mut unresolved = Vec::new();
        for section in &self.namespaces {
            if let Some(error) = &section.error {
                unresolved.push(format!("[{}] {error}", section.namespace));
            }
            for item in section.items() {
                if item.outcome.is_failure() {
                    unresolved.push(format!(
                        "[{}] {}: {}",
                        section.namespace, item.subject, item.outcome
                    ));
                }
            }
        }
        unresolved
    }

    /// Whether every attempted item was already in the clean state — the
    /// signature of a repeated run on a clean system.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.namespaces.iter().all(|section| {
            section.error.is_none()
                && section.items().all(|item| item.outcome == Outcome::AlreadyClean)
        })
    }
}

impl Default for StopReport {
    fn default() -> Self {
        Self::new()
    }
}
