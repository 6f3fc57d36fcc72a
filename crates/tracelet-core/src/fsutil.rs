//! Small filesystem helpers shared by the engine modules.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `contents` to `path` atomically: a temp file is created next to
/// the target and renamed over it, so an interrupted run never leaves a
/// half-written file behind.
///
/// If the target exists, its permissions are carried over to the
/// replacement.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = sibling_temp_path(path);
    let mut file = fs::File::create(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(&tmp, meta.permissions())?;
    }

    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Builds a temp-file path in the same directory as `path`, keyed by our
/// own pid so concurrent runs do not collide.
fn sibling_temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map_or_else(
        || ".tracelet-tmp".to_owned(),
        |n| format!(".{}.tracelet-tmp", n.to_string_lossy()),
    );
    let name = format!("{}.{}", name, std::process::id());
    path.with_file_name(name)
}

/// Reads a file as UTF-8, returning `None` when it does not exist or is
/// not valid UTF-8.
pub(crate) fn read_utf8(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8(bytes).ok()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
