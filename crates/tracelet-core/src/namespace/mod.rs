//! Namespace abstraction: the host and each reachable container expose the
//! same capability surface (a root path and a process list), so the rest of
//! the engine never branches on container specifics.
//!
//! Containers are discovered by grouping `/proc/<pid>/ns/mnt` inodes that
//! differ from the host's own; each distinct inode becomes one
//! [`ContainerNamespace`] rooted at `/proc/<init>/root`.

pub mod container;
pub mod host;

use std::path::{Path, PathBuf};

use tracelet_common::config::StopConfig;
use tracelet_common::error::{Result, TraceletError};
use tracelet_common::types::NamespaceId;

pub use container::ContainerNamespace;
pub use host::HostNamespace;

/// Uniform view over the host or one container.
///
/// Enumerated fresh on every stop run; implementations hold no state that
/// outlives the run.
pub trait Namespace: Send + Sync {
    /// Identifier of this namespace.
    fn id(&self) -> &NamespaceId;

    /// Root filesystem path as seen from the host (`/` for the host itself,
    /// `/proc/<init>/root` for a container).
    fn root(&self) -> &Path;

    /// Translates a namespace-relative path into a host-visible one.
    fn resolve(&self, relative: &Path) -> PathBuf {
        self.root().join(relative)
    }

    /// Procfs root through which this namespace's processes are inspected.
    fn proc_root(&self) -> &Path {
        Path::new("/proc")
    }

    /// Host-visible pids of all processes in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error only when the process table cannot be read at all.
    fn pids(&self) -> Result<Vec<i32>>;
}

/// Enumerates the host namespace followed by every discovered container.
///
/// # Errors
///
/// Returns [`TraceletError::ProcEnumeration`] if `/proc` cannot be read.
pub fn discover(config: &StopConfig) -> Result<Vec<Box<dyn Namespace>>> {
    discover_under(Path::new("/proc"), config)
}

/// Discovery against an explicit proc root. Split out so tests can point it
/// at a synthetic tree.
pub fn discover_under(proc_root: &Path, config: &StopConfig) -> Result<Vec<Box<dyn Namespace>>> {
    let host_inode = self_mnt_inode(proc_root);
    let pids = list_proc_pids(proc_root)?;

    let mut namespaces: Vec<Box<dyn Namespace>> = vec![Box::new(HostNamespace::new(
        proc_root.to_path_buf(),
        host_inode,
    ))];

    if !config.scan_containers {
        return Ok(namespaces);
    }

    // Without our own inode, foreign inodes cannot be told apart from the
    // host's own, and every distinct inode would surface as a spurious
    // container scanned twice. The host view above already claims every
    // pid in that case, so container discovery is skipped.
    let Some(host_inode) = host_inode else {
        tracing::warn!("own mount-namespace inode unreadable; skipping container discovery");
        return Ok(namespaces);
    };

    // One container per distinct foreign mnt inode; init = lowest pid.
    let mut seen: Vec<u64> = Vec::new();
    for pid in pids {
        let Some(inode) = mnt_ns_inode(proc_root, pid) else {
            continue;
        };
        if inode == host_inode || seen.contains(&inode) {
            continue;
        }
        seen.push(inode);
        let container = ContainerNamespace::new(proc_root.to_path_buf(), pid, inode);
        tracing::info!(
            id = %container.id(),
            init_pid = container.init_pid(),
            "container namespace discovered"
        );
        namespaces.push(Box::new(container));
    }

    Ok(namespaces)
}

/// Lists all numeric entries of a proc root, sorted ascending.
pub(crate) fn list_proc_pids(proc_root: &Path) -> Result<Vec<i32>> {
    let entries = std::fs::read_dir(proc_root).map_err(|e| TraceletError::ProcEnumeration {
        path: proc_root.to_path_buf(),
        source: e,
    })?;

    let mut pids: Vec<i32> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| entry.file_name().to_str().and_then(|s| s.parse().ok()))
        .collect();
    pids.sort_unstable();
    Ok(pids)
}

/// Reads the mount-namespace inode of a process, `None` when the process
/// vanished or its namespace link is unreadable.
pub(crate) fn mnt_ns_inode(proc_root: &Path, pid: i32) -> Option<u64> {
    let link = std::fs::read_link(proc_root.join(pid.to_string()).join("ns/mnt")).ok()?;
    parse_ns_link(&link.to_string_lossy())
}

/// Mount-namespace inode of the current process.
fn self_mnt_inode(proc_root: &Path) -> Option<u64> {
    let link = std::fs::read_link(proc_root.join("self/ns/mnt")).ok()?;
    parse_ns_link(&link.to_string_lossy())
}

/// Parses a namespace symlink target of the form `mnt:[4026531840]`.
fn parse_ns_link(target: &str) -> Option<u64> {
    target
        .strip_prefix("mnt:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Resolves the namespace-local pid of a host pid from the `NSpid` line of
/// `/proc/<pid>/status`. Falls back to the host pid when the line is absent
/// (kernel too old, or process on the host itself).
pub(crate) fn ns_local_pid(proc_root: &Path, host_pid: i32) -> i32 {
    let status = proc_root.join(host_pid.to_string()).join("status");
    let Ok(content) = std::fs::read_to_string(status) else {
        return host_pid;
    };
    content
        .lines()
        .find_map(|line| line.strip_prefix("NSpid:"))
        .and_then(|rest| rest.split_whitespace().last())
        .and_then(|last| last.parse().ok())
        .unwrap_or(host_pid)
}
