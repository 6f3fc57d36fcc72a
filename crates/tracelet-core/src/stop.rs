//! Stop orchestrator: sequences scan → detach → unconfigure → clean across
//! the host and every discovered container.
//!
//! Governing policy is best effort, maximum cleanup. Per-item failures are
//! recorded and the run moves on; the only hard errors are the inability to
//! enumerate namespaces or, per namespace, processes. Running twice is
//! safe: the second run finds clean state everywhere and reports
//! `AlreadyClean` throughout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracelet_common::config::StopConfig;
use tracelet_common::error::{Result, TraceletError};
use tracelet_common::types::{DetachOutcome, InstrumentedProcess, Outcome};

use crate::namespace::{self, Namespace};
use crate::report::{ItemReport, NamespaceReport, StopReport};
use crate::services::UnconfigureOutcome;
use crate::{artifacts, detach, scan, services};

/// Cooperative cancellation flag, typically set from a SIGINT handler.
///
/// Cancellation stops the orchestrator from issuing new per-process and
/// per-file work; an in-flight file rewrite always completes so no config
/// file is left half-written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs the full de-instrumentation sequence against the live system.
///
/// # Errors
///
/// Returns an error only on structural failure: `/proc` unreadable, or no
/// namespace reachable at all.
pub fn run_stop(config: &StopConfig, cancel: &CancelToken) -> Result<StopReport> {
    let namespaces = namespace::discover(config)?;
    if namespaces.is_empty() {
        return Err(TraceletError::NoNamespaces);
    }
    Ok(run_stop_in(&namespaces, config, cancel))
}

/// Runs the sequence against an explicit namespace set.
///
/// Exposed separately so callers (and tests) can supply their own
/// [`Namespace`] implementations; namespace enumeration is the only
/// structural step, and it has already happened by the time this is called.
pub fn run_stop_in(
    namespaces: &[Box<dyn Namespace>],
    config: &StopConfig,
    cancel: &CancelToken,
) -> StopReport {
    let mut report = StopReport::new();
    tracing::info!(run_id = %report.run_id, namespaces = namespaces.len(), "stop run started");

    for ns in namespaces {
        // Namespace isolation: a structural failure here is confined to
        // this section and the loop continues.
        report.namespaces.push(clean_namespace(ns.as_ref(), config, cancel));
    }

    let unresolved = report.unresolved();
    if unresolved.is_empty() {
        tracing::info!(run_id = %report.run_id, "stop run complete; nothing unresolved");
    } else {
        tracing::warn!(
            run_id = %report.run_id,
            unresolved = unresolved.len(),
            "stop run complete with unresolved items"
        );
    }
    report
}

/// Drives one namespace through detaching, unconfiguring, and cleaning.
fn clean_namespace(
    ns: &dyn Namespace,
    config: &StopConfig,
    cancel: &CancelToken,
) -> NamespaceReport {
    let mut section = NamespaceReport::new(ns.id().clone());
    tracing::info!(namespace = %ns.id(), "cleaning namespace");

    // 1. Scan and detach. Detach failures are soft: the config rewrite
    //    below still prevents re-instrumentation on the next restart.
    match scan::scan_instrumented(ns, config) {
        Ok(processes) => {
            for process in processes {
                if cancel.is_cancelled() {
                    section.detaches.push(skipped_process(&process));
                    continue;
                }
                let outcome = detach::detach(&process, ns, config);
                section.detaches.push(detach_item(&process, outcome, config));
            }
        }
        Err(e) => {
            // Scan is the one structural step per namespace; record it and
            // still try the filesystem-side cleanup, which does not depend
            // on the process table.
            tracing::warn!(namespace = %ns.id(), error = %e, "process scan failed");
            section.error = Some(e.to_string());
        }
    }

    // 2. Rewrite service configs.
    for entry in services::list_configs(ns, config) {
        let subject = entry.path.display().to_string();
        if cancel.is_cancelled() {
            section.configs.push(ItemReport {
                subject,
                outcome: Outcome::Skipped("cancelled".to_owned()),
            });
            continue;
        }
        let outcome = match services::unconfigure(&entry, config) {
            UnconfigureOutcome::Rewritten | UnconfigureOutcome::Deleted => Outcome::Done,
            UnconfigureOutcome::AlreadyClean => Outcome::AlreadyClean,
            UnconfigureOutcome::WriteDenied => Outcome::Failed("write denied".to_owned()),
            UnconfigureOutcome::Failed(reason) => Outcome::Failed(reason),
        };
        section.configs.push(ItemReport { subject, outcome });
    }

    // 3. Remove artifacts.
    for artifact in artifacts::list_artifacts(ns, config) {
        let subject = artifact.path.display().to_string();
        if cancel.is_cancelled() {
            section.artifacts.push(ItemReport {
                subject,
                outcome: Outcome::Skipped("cancelled".to_owned()),
            });
            continue;
        }
        section.artifacts.push(ItemReport {
            subject,
            outcome: artifacts::remove(&artifact),
        });
    }

    section
}

fn detach_item(
    process: &InstrumentedProcess,
    outcome: DetachOutcome,
    config: &StopConfig,
) -> ItemReport {
    let subject = format!("pid {} ({})", process.host_pid, process.comm);
    let outcome = match outcome {
        DetachOutcome::Detached => Outcome::Done,
        // Nothing left to detach: the process is gone.
        DetachOutcome::VanishedBeforeDetach => Outcome::AlreadyClean,
        DetachOutcome::NoResponse => Outcome::Failed(format!(
            "no detach acknowledgement within {}ms; process left running",
            config.detach_timeout_ms
        )),
        DetachOutcome::ChannelUnavailable(reason) => Outcome::Failed(format!(
            "detach command file could not be written ({reason}); check the command directory"
        )),
    };
    ItemReport { subject, outcome }
}

fn skipped_process(process: &InstrumentedProcess) -> ItemReport {
    ItemReport {
        subject: format!("pid {} ({})", process.host_pid, process.comm),
        outcome: Outcome::Skipped("cancelled".to_owned()),
    }
}
