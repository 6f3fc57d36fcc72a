//! Formatted output helpers for CLI commands.

use tracelet_common::config::StopConfig;
use tracelet_common::constants::FILTER_FILE_NAME;
use tracelet_core::report::{NamespaceReport, StopReport};

/// Builds the pre-flight warning shown when `stop` runs without `--force`.
#[must_use]
pub fn stop_warning(config: &StopConfig) -> String {
    format!(
        "The following actions will be performed on the host and in all relevant containers:\n\
         \t- Removal of the filter files /{install}/{filter} and /{tmp}/{filter}\n\
         \t- Detach from all processes running with {library}\n\
         \t- Removal of the /{hook} script\n\
         \t- Update of service configurations to no longer LD_PRELOAD {library}",
        install = config.install_base.display(),
        tmp = config.tmp_base.display(),
        filter = FILTER_FILE_NAME,
        library = config.library_name,
        hook = config.profile_hook.display(),
    )
}

/// Renders a stop report as human-readable text: one block per namespace,
/// then the unresolved items, if any.
#[must_use]
pub fn render_report(report: &StopReport) -> String {
    let mut out = String::new();
    for section in &report.namespaces {
        out.push_str(&render_section(section));
    }

    let unresolved = report.unresolved();
    if unresolved.is_empty() {
        out.push_str("All clean; no unresolved items.\n");
    } else {
        out.push_str(&format!("Unresolved items ({}):\n", unresolved.len()));
        for item in unresolved {
            out.push_str(&format!("  - {item}\n"));
        }
    }
    out
}

fn render_section(section: &NamespaceReport) -> String {
    let mut out = format!("Namespace {}:\n", section.namespace);
    if let Some(error) = &section.error {
        out.push_str(&format!("  error: {error}\n"));
    }
    out.push_str(&format!(
        "  processes detached: {}\n",
        count_summary(&section.detaches)
    ));
    out.push_str(&format!(
        "  service configs updated: {}\n",
        count_summary(&section.configs)
    ));
    out.push_str(&format!(
        "  artifacts removed: {}\n",
        count_summary(&section.artifacts)
    ));
    out
}

/// Summarizes a set of item outcomes as `done/clean/failed` counts.
fn count_summary(items: &[tracelet_core::report::ItemReport]) -> String {
    use tracelet_common::types::Outcome;

    let done = items.iter().filter(|i| i.outcome == Outcome::Done).count();
    let clean = items
        .iter()
        .filter(|i| i.outcome == Outcome::AlreadyClean)
        .count();
    let failed = items.iter().filter(|i| i.outcome.is_failure()).count();
    format!("{done} done, {clean} already clean, {failed} unresolved")
}
