//! The host's own namespace.

use std::path::{Path, PathBuf};

use tracelet_common::error::Result;
use tracelet_common::types::NamespaceId;

use super::Namespace;

/// The host namespace, rooted at `/`.
pub struct HostNamespace {
    id: NamespaceId,
    root: PathBuf,
    proc_root: PathBuf,
    mnt_inode: Option<u64>,
}

impl HostNamespace {
    /// Creates the host namespace view over the given proc root.
    #[must_use]
    pub fn new(proc_root: PathBuf, mnt_inode: Option<u64>) -> Self {
        Self {
            id: NamespaceId::Host,
            root: PathBuf::from("/"),
            proc_root,
            mnt_inode,
        }
    }
}

impl Namespace for HostNamespace {
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
        // A pid with an unreadable ns link is attributed to the host so it
        // is never silently dropped from the run.
        Ok(pids
            .into_iter()
            .filter(|&pid| match super::mnt_ns_inode(&self.proc_root, pid) {
                Some(inode) => Some(inode) == self.mnt_inode || self.mnt_inode.is_none(),
                None => true,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_resolves_against_slash_root() {
        let ns = HostNamespace::new(PathBuf::from("/proc"), None);
        assert_eq!(
            ns.resolve(Path::new("etc/profile.d/tracelet.sh")),
            PathBuf::from("/etc/profile.d/tracelet.sh")
        );
    }

    #[test]
    fn host_claims_pids_without_ns_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("41")).expect("mkdir");
        std::fs::create_dir(dir.path().join("42")).expect("mkdir");

        let ns = HostNamespace::new(dir.path().to_path_buf(), Some(1));
        assert_eq!(ns.pids().expect("pids"), vec![41, 42]);
    }
}
