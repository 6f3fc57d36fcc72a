//! Process scanner: finds live processes with the interposition library
//! attached.
//!
//! The scan is a single lazy pass over a namespace's process list. A
//! process that exits between enumeration and inspection simply drops out
//! of the sequence; only the inability to enumerate processes at all is an
//! error.

use std::path::{Path, PathBuf};

use tracelet_common::config::StopConfig;
use tracelet_common::error::Result;
use tracelet_common::types::{Confidence, InstrumentedProcess, NamespaceId};

use crate::namespace::Namespace;

/// Lazy, finite, one-pass iterator over instrumented processes.
pub struct ScanIter {
    pids: std::vec::IntoIter<i32>,
    proc_root: PathBuf,
    namespace: NamespaceId,
    library_name: String,
}

impl ScanIter {
    pub(crate) fn over_pids(
        proc_root: PathBuf,
        pids: Vec<i32>,
        namespace: NamespaceId,
        library_name: String,
    ) -> Self {
        Self {
            pids: pids.into_iter(),
            proc_root,
            namespace,
            library_name,
        }
    }

    /// Inspects one pid; `None` means not instrumented or already gone.
    fn inspect(&self, pid: i32) -> Option<InstrumentedProcess> {
        let proc_dir = self.proc_root.join(pid.to_string());
        let confidence = self.detect(&proc_dir)?;

        let comm = std::fs::read_to_string(proc_dir.join("comm"))
            .map_or_else(|_| "?".to_owned(), |s| s.trim().to_owned());
        let ns_pid = crate::namespace::ns_local_pid(&self.proc_root, pid);

        tracing::debug!(pid, %comm, signal = %confidence, "instrumented process found");
        Some(InstrumentedProcess {
            host_pid: pid,
            ns_pid,
            namespace: self.namespace.clone(),
            comm,
            confidence,
        })
    }

    /// Looks for the library in the mapped-file list, falling back to the
    /// LD_PRELOAD environment when the maps are unreadable.
    fn detect(&self, proc_dir: &Path) -> Option<Confidence> {
        match std::fs::read_to_string(proc_dir.join("maps")) {
            Ok(maps) => maps
                .contains(&self.library_name)
                .then_some(Confidence::MappedLibrary),
            Err(_) => {
                let environ = std::fs::read(proc_dir.join("environ")).ok()?;
                environ
                    .split(|&b| b == 0)
                    .filter_map(|entry| std::str::from_utf8(entry).ok())
                    .any(|entry| {
                        entry.starts_with("LD_PRELOAD=") && entry.contains(&self.library_name)
                    })
                    .then_some(Confidence::PreloadEnv)
            }
        }
    }
}

impl Iterator for ScanIter {
    type Item = InstrumentedProcess;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let pid = self.pids.next()?;
            if let Some(process) = Self::inspect(self, pid) {
                return Some(process);
            }
        }
    }
}

/// Starts a scan of the given namespace.
///
/// # Errors
///
/// Returns an error if the namespace's process list cannot be enumerated.
pub fn scan_instrumented(namespace: &dyn Namespace, config: &StopConfig) -> Result<ScanIter> {
    let pids = namespace.pids()?;
    tracing::debug!(namespace = %namespace.id(), candidates = pids.len(), "scanning processes");
    Ok(ScanIter::over_pids(
        namespace.proc_root().to_path_buf(),
        pids,
        namespace.id().clone(),
        config.library_name.clone(),
    ))
}
