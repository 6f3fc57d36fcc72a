//! Service config registry: finds and rewrites every persisted
//! LD_PRELOAD-style injection point so instrumentation does not come back
//! on the next service restart.
//!
//! Rewrites remove exactly the directive lines, leave all other bytes
//! untouched, and go through an atomic temp-file-and-rename so an
//! interrupted run cannot corrupt a config file. Each file is rewritten at
//! most once per run, and rewrites within a namespace run on the single
//! control thread, so there are never concurrent writers.

pub mod shell;
pub mod systemd;

use std::io;
use std::path::Path;

use tracelet_common::config::StopConfig;
use tracelet_common::types::{NamespaceId, ServiceConfigEntry, ServiceKind};

use crate::fsutil;
use crate::namespace::Namespace;

/// Result of one unconfigure attempt. Soft by construction: none of these
/// abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnconfigureOutcome {
    /// Directive lines removed, rest of the file preserved byte-for-byte.
    Rewritten,
    /// The file was wholly ours (or became a no-op) and was deleted.
    Deleted,
    /// No directive present; nothing to do.
    AlreadyClean,
    /// The file is not writable from here.
    WriteDenied,
    /// Any other failure, carried as a reason string.
    Failed(String),
}

/// Scans all known configuration surfaces of a namespace.
pub fn list_configs(namespace: &dyn Namespace, config: &StopConfig) -> Vec<ServiceConfigEntry> {
    let mut entries = systemd::scan(namespace, config);
    entries.extend(shell::scan(namespace, config));
    tracing::debug!(
        namespace = %namespace.id(),
        entries = entries.len(),
        "service config scan complete"
    );
    entries
}

/// Rewrites one config file with the injection directive removed.
pub fn unconfigure(entry: &ServiceConfigEntry, config: &StopConfig) -> UnconfigureOutcome {
    // The profile hook installed by the start path is wholly ours; remove
    // the file rather than editing it down to a shebang.
    if entry.kind == ServiceKind::ProfileHook && is_our_hook(&entry.path, config) {
        return match std::fs::remove_file(&entry.path) {
            Ok(()) => UnconfigureOutcome::Deleted,
            Err(e) if e.kind() == io::ErrorKind::NotFound => UnconfigureOutcome::AlreadyClean,
            Err(e) => classify_write_error(&e),
        };
    }

    let content = match fsutil::read_utf8(&entry.path) {
        Ok(Some(content)) => content,
        Ok(None) => {
            if entry.path.exists() {
                return UnconfigureOutcome::Failed("file is not valid UTF-8".to_owned());
            }
            return UnconfigureOutcome::AlreadyClean;
        }
        Err(e) => return classify_write_error(&e),
    };

    // Re-match against current content: the file may have changed since the
    // scan, and the rewrite must only ever drop directive lines.
    let mut removed = 0usize;
    let kept: String = content
        .split_inclusive('\n')
        .filter(|line| {
            if is_preload_directive(line, &config.library_name) {
                removed += 1;
                false
            } else {
                true
            }
        })
        .collect();

    if removed == 0 {
        return UnconfigureOutcome::AlreadyClean;
    }

    if is_noop_remainder(&kept, entry) {
        return match std::fs::remove_file(&entry.path) {
            Ok(()) => UnconfigureOutcome::Deleted,
            Err(e) if e.kind() == io::ErrorKind::NotFound => UnconfigureOutcome::AlreadyClean,
            Err(e) => classify_write_error(&e),
        };
    }

    match fsutil::atomic_write(&entry.path, kept.as_bytes()) {
        Ok(()) => {
            tracing::info!(
                path = %entry.path.display(),
                kind = %entry.kind,
                removed,
                "injection directive removed"
            );
            UnconfigureOutcome::Rewritten
        }
        Err(e) => classify_write_error(&e),
    }
}

/// A line injects our library iff it both names LD_PRELOAD and our
/// library file.
pub(crate) fn is_preload_directive(line: &str, library_name: &str) -> bool {
    line.contains("LD_PRELOAD") && line.contains(library_name)
}

/// Builds an entry for a file when it carries at least one directive line.
pub(crate) fn entry_for_file(
    path: &Path,
    kind: ServiceKind,
    namespace: &NamespaceId,
    library_name: &str,
) -> Option<ServiceConfigEntry> {
    let content = fsutil::read_utf8(path).ok().flatten()?;
    let directives: Vec<String> = content
        .lines()
        .filter(|line| is_preload_directive(line, library_name))
        .map(str::to_owned)
        .collect();
    if directives.is_empty() {
        return None;
    }
    Some(ServiceConfigEntry {
        path: path.to_path_buf(),
        kind,
        directives,
        namespace: namespace.clone(),
    })
}

/// Whether the post-removal content is a no-op that justifies deleting the
/// file: an emptied hook, or a drop-in reduced to bare section headers.
/// Regular unit files, `conf.d`, and `sysconfig` files are never deleted.
fn is_noop_remainder(kept: &str, entry: &ServiceConfigEntry) -> bool {
    match entry.kind {
        ServiceKind::ProfileHook => kept.trim().is_empty(),
        ServiceKind::Systemd => {
            is_dropin(&entry.path)
                && kept.lines().all(|line| {
                    let line = line.trim();
                    line.is_empty() || (line.starts_with('[') && line.ends_with(']'))
                })
        }
        ServiceKind::OpenRc | ServiceKind::Sysconfig => false,
    }
}

/// A systemd drop-in lives under a `*.d` directory; the start path creates
/// those files in their entirety.
fn is_dropin(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d"))
}

fn is_our_hook(path: &Path, config: &StopConfig) -> bool {
    path.file_name() == config.profile_hook.file_name()
}

fn classify_write_error(e: &io::Error) -> UnconfigureOutcome {
    match e.kind() {
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
            UnconfigureOutcome::WriteDenied
        }
        _ => UnconfigureOutcome::Failed(e.to_string()),
    }
}
