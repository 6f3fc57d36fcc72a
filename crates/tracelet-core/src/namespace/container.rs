//! A container namespace reached through `/proc/<init>/root`.

use std::path::{Path, PathBuf};

use tracelet_common::error::Result;
use tracelet_common::types::NamespaceId;

use super::Namespace;

/// One discovered container, keyed by its mount-namespace inode.
///
/// The container's filesystem is reached through the procfs root link of
/// its init process, so no container-engine API is needed.
pub struct ContainerNamespace {
    id: NamespaceId,
    init_pid: i32,
    mnt_inode: u64,
    root: PathBuf,
    proc_root: PathBuf,
}

impl ContainerNamespace {
    /// Creates a container namespace view for the given init pid and
    /// mount-namespace inode.
    #[must_use]
    pub fn new(proc_root: PathBuf, init_pid: i32, mnt_inode: u64) -> Self {
        let root = proc_root.join(init_pid.to_string()).join("root");
        Self {
            id: NamespaceId::Container { mnt_inode },
            init_pid,
            mnt_inode,
            root,
            proc_root,
        }
    }

    /// Host pid of the process whose root link anchors this namespace.
    #[must_use]
    pub const fn init_pid(&self) -> i32 {
        self.init_pid
    }
}

impl Namespace for ContainerNamespace {
    fn id(&self) -> &NamespaceId {
        &self.id
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    fn pids(&self) -> Result<Vec<i32>> {
        let pids = super::list_proc_pids(&self.proc_root)?;
        Ok(pids
            .into_iter()
            .filter(|&pid| super::mnt_ns_inode(&self.proc_root, pid) == Some(self.mnt_inode))
            .collect())
    }
}
