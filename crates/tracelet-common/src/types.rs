//! Domain primitive types used across the Tracelet workspace.
//!
//! Everything here is transient: constructed during one stop run and
//! discarded with the report. No type in this module is persisted.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifies the host or one discovered container mount namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamespaceId {
    /// The host's own mount namespace.
    Host,
    /// A container, keyed by its mount-namespace inode.
    Container {
        /// Inode of the container's `mnt` namespace.
        mnt_inode: u64,
    },
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Container { mnt_inode } => write!(f, "mnt-{mnt_inode}"),
        }
    }
}

/// How the scanner concluded that the library is loaded into a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// The library appears in the process's mapped-file list.
    MappedLibrary,
    /// The maps were unreadable but the environment carries our LD_PRELOAD.
    PreloadEnv,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MappedLibrary => write!(f, "mapped"),
            Self::PreloadEnv => write!(f, "preload-env"),
        }
    }
}

/// A live process with the interposition library attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentedProcess {
    /// Process id as seen from the host.
    pub host_pid: i32,
    /// Process id as seen inside its own pid namespace.
    pub ns_pid: i32,
    /// Namespace the process belongs to.
    pub namespace: NamespaceId,
    /// Command name from `/proc/<pid>/comm`.
    pub comm: String,
    /// Signal that led to inclusion.
    pub confidence: Confidence,
}

/// Kind of service-manager or shell configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    /// systemd unit file or drop-in.
    Systemd,
    /// OpenRC `conf.d` script.
    OpenRc,
    /// sysvinit `sysconfig` environment file.
    Sysconfig,
    /// Shell profile hook under `profile.d`.
    ProfileHook,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Systemd => write!(f, "systemd"),
            Self::OpenRc => write!(f, "openrc"),
            Self::Sysconfig => write!(f, "sysconfig"),
            Self::ProfileHook => write!(f, "profile"),
        }
    }
}

/// A configuration file carrying an LD_PRELOAD directive for our library.
///
/// Mutated (rewritten or line-removed) at most once per stop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigEntry {
    /// Host-visible path of the owning file.
    pub path: PathBuf,
    /// Configuration surface the file belongs to.
    pub kind: ServiceKind,
    /// The exact directive lines that inject the library.
    pub directives: Vec<String>,
    /// Namespace the file belongs to.
    pub namespace: NamespaceId,
}

/// Kind of on-disk artifact left behind by the start path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A filter file under the install or tmp base.
    FilterFile,
    /// The shell profile hook script.
    ProfileScript,
    /// A base directory holding extracted library versions.
    LibraryDir,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilterFile => write!(f, "filter"),
            Self::ProfileScript => write!(f, "profile-script"),
            Self::LibraryDir => write!(f, "library-dir"),
        }
    }
}

/// An on-disk artifact scheduled for removal. Absence is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Host-visible path of the artifact.
    pub path: PathBuf,
    /// What the artifact is.
    pub kind: ArtifactKind,
    /// Namespace the artifact belongs to.
    pub namespace: NamespaceId,
}

/// Result of a runtime detach attempt against one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetachOutcome {
    /// The library acknowledged the detach request.
    Detached,
    /// The library is present but did not acknowledge within the timeout.
    /// The process is left running.
    NoResponse,
    /// The command file could not be written, so the library never saw the
    /// request. Carries the write-failure reason.
    ChannelUnavailable(String),
    /// The process exited before the request could be delivered.
    VanishedBeforeDetach,
}

impl fmt::Display for DetachOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => write!(f, "detached"),
            Self::NoResponse => write!(f, "no response"),
            Self::ChannelUnavailable(reason) => write!(f, "channel unavailable: {reason}"),
            Self::VanishedBeforeDetach => write!(f, "vanished"),
        }
    }
}

/// Outcome of one independently attempted cleanup operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The operation made a change.
    Done,
    /// The target was already in the clean state.
    AlreadyClean,
    /// The operation was not attempted (e.g. run cancelled).
    Skipped(String),
    /// The operation failed; the run continued.
    Failed(String),
}

impl Outcome {
    /// Returns whether this outcome counts as unresolved.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Skipped(_) | Self::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::AlreadyClean => write!(f, "already clean"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
