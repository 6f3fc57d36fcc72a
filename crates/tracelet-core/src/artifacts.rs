//! Artifact locator: the fixed set of on-disk files the start path leaves
//! behind, and their idempotent removal.

use std::io;
use std::path::Path;

use tracelet_common::config::StopConfig;
use tracelet_common::constants::FILTER_FILE_NAME;
use tracelet_common::types::{Artifact, ArtifactKind, Outcome};

use crate::namespace::Namespace;

/// Enumerates the known artifacts of a namespace, removal-ordered: filter
/// files and the profile script first, then the base directories holding
/// extracted library versions.
pub fn list_artifacts(namespace: &dyn Namespace, config: &StopConfig) -> Vec<Artifact> {
    let ns_id = namespace.id().clone();
    vec![
        Artifact {
            path: namespace.resolve(&config.install_base.join(FILTER_FILE_NAME)),
            kind: ArtifactKind::FilterFile,
            namespace: ns_id.clone(),
        },
        Artifact {
            path: namespace.resolve(&config.tmp_base.join(FILTER_FILE_NAME)),
            kind: ArtifactKind::FilterFile,
            namespace: ns_id.clone(),
        },
        Artifact {
            path: namespace.resolve(&config.profile_hook),
            kind: ArtifactKind::ProfileScript,
            namespace: ns_id.clone(),
        },
        Artifact {
            path: namespace.resolve(&config.install_base),
            kind: ArtifactKind::LibraryDir,
            namespace: ns_id.clone(),
        },
        Artifact {
            path: namespace.resolve(&config.tmp_base),
            kind: ArtifactKind::LibraryDir,
            namespace: ns_id,
        },
    ]
}

/// Removes one artifact. Absence is success, so removal can be re-run
/// any number of times.
pub fn remove(artifact: &Artifact) -> Outcome {
    let result = match artifact.kind {
        ArtifactKind::FilterFile | ArtifactKind::ProfileScript => {
            std::fs::remove_file(&artifact.path)
        }
        ArtifactKind::LibraryDir => remove_dir_checked(&artifact.path),
    };

    match result {
        Ok(()) => {
            tracing::info!(path = %artifact.path.display(), kind = %artifact.kind, "artifact removed");
            Outcome::Done
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::AlreadyClean,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Removes a base directory. Everything under it is ours (versioned
/// library extractions per the install layout), so the removal is
/// recursive, but a plain file at the path is refused.
fn remove_dir_checked(path: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} exists but is not a directory", path.display()),
        ));
    }
    std::fs::remove_dir_all(path)
}
