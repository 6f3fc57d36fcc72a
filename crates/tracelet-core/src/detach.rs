//! Detach engine: asks the interposition library to stop instrumenting a
//! live process, without ever touching the workload itself.
//!
//! # Control-channel contract
//!
//! The library polls `<command_dir>/tracelet.<ns-pid>` inside its own
//! mount namespace roughly once per second. The stop path writes
//! `TRACELET_CMD_ATTACH=false` to that file atomically; the library applies
//! the directive and unlinks the file as acknowledgement. This contract is
//! shared with the library and must not change unilaterally.
//!
//! The engine never sends a signal to the target. The only process probe
//! used is `kill(pid, 0)`, which delivers nothing.

use std::path::PathBuf;
use std::time::Instant;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

use tracelet_common::config::StopConfig;
use tracelet_common::constants::{COMMAND_FILE_PREFIX, DETACH_DIRECTIVE};
use tracelet_common::types::{DetachOutcome, InstrumentedProcess};

use crate::fsutil;
use crate::namespace::Namespace;

/// Sends a detach request to one instrumented process and waits (bounded)
/// for acknowledgement.
///
/// Never terminates the target: the worst outcomes are
/// [`DetachOutcome::NoResponse`] and [`DetachOutcome::ChannelUnavailable`],
/// both with the process left running.
pub fn detach(
    process: &InstrumentedProcess,
    namespace: &dyn Namespace,
    config: &StopConfig,
) -> DetachOutcome {
    if !is_alive(process.host_pid) {
        return DetachOutcome::VanishedBeforeDetach;
    }

    let command_file = command_file_path(process, namespace, config);
    let directive = format!("{DETACH_DIRECTIVE}\n");
    if let Err(e) = fsutil::atomic_write(&command_file, directive.as_bytes()) {
        if !is_alive(process.host_pid) {
            return DetachOutcome::VanishedBeforeDetach;
        }
        tracing::warn!(
            pid = process.host_pid,
            path = %command_file.display(),
            error = %e,
            "could not write detach command file"
        );
        return DetachOutcome::ChannelUnavailable(format!("{}: {e}", command_file.display()));
    }

    let deadline = Instant::now() + config.detach_timeout();
    loop {
        if !command_file.exists() {
            // The library consumed the request.
            return if is_alive(process.host_pid) {
                tracing::info!(pid = process.host_pid, comm = %process.comm, "detach acknowledged");
                DetachOutcome::Detached
            } else {
                DetachOutcome::VanishedBeforeDetach
            };
        }
        if !is_alive(process.host_pid) {
            let _ = std::fs::remove_file(&command_file);
            return DetachOutcome::VanishedBeforeDetach;
        }
        if Instant::now() >= deadline {
            // Leave the process alone, but take the stale request back so a
            // later run starts from a clean slate.
            let _ = std::fs::remove_file(&command_file);
            tracing::warn!(
                pid = process.host_pid,
                comm = %process.comm,
                timeout_ms = config.detach_timeout_ms,
                "no detach acknowledgement"
            );
            return DetachOutcome::NoResponse;
        }
        std::thread::sleep(config.detach_poll());
    }
}

/// Builds the host-visible path of the per-process command file.
fn command_file_path(
    process: &InstrumentedProcess,
    namespace: &dyn Namespace,
    config: &StopConfig,
) -> PathBuf {
    namespace
        .resolve(&config.command_dir)
        .join(format!("{COMMAND_FILE_PREFIX}{}", process.ns_pid))
}

/// Existence probe via the null signal. EPERM still means "alive".
fn is_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => true,
    }
}
