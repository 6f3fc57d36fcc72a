//! Configuration model for a stop run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, TraceletError};

/// Tunable parameters for one de-instrumentation run.
///
/// All paths are relative to a namespace root, so the same configuration
/// applies to the host (`/`) and to every container (`/proc/<pid>/root`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConfig {
    /// File name of the interposition library to look for.
    pub library_name: String,
    /// Install base directory (filter file and extracted library versions).
    pub install_base: PathBuf,
    /// Temporary base directory (fallback extraction target).
    pub tmp_base: PathBuf,
    /// Shell profile hook path.
    pub profile_hook: PathBuf,
    /// Directory the library polls for command files.
    pub command_dir: PathBuf,
    /// How long to wait for a detach acknowledgement, in milliseconds.
    ///
    /// The acknowledgement protocol is a contract with the library, so the
    /// wait is configurable rather than a guessed constant.
    pub detach_timeout_ms: u64,
    /// Interval between acknowledgement polls, in milliseconds.
    pub detach_poll_ms: u64,
    /// Whether to descend into container namespaces.
    pub scan_containers: bool,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            library_name: constants::LIBRARY_NAME.to_owned(),
            install_base: PathBuf::from(constants::INSTALL_BASE),
            tmp_base: PathBuf::from(constants::TMP_BASE),
            profile_hook: PathBuf::from(constants::PROFILE_HOOK),
            command_dir: PathBuf::from(constants::COMMAND_DIR),
            detach_timeout_ms: constants::DEFAULT_DETACH_TIMEOUT_MS,
            detach_poll_ms: constants::DEFAULT_DETACH_POLL_MS,
            scan_containers: true,
        }
    }
}

impl StopConfig {
    /// Loads a configuration from a JSON file, filling omitted fields with
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TraceletError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates internal consistency.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is empty or a path is absolute.
    pub fn validate(&self) -> Result<()> {
        if self.library_name.is_empty() {
            return Err(TraceletError::Config {
                message: "library_name must not be empty".to_owned(),
            });
        }
        for (name, path) in [
            ("install_base", &self.install_base),
            ("tmp_base", &self.tmp_base),
            ("profile_hook", &self.profile_hook),
            ("command_dir", &self.command_dir),
        ] {
            if path.is_absolute() {
                return Err(TraceletError::Config {
                    message: format!("{name} must be relative to the namespace root: {}", path.display()),
                });
            }
        }
        if self.detach_poll_ms == 0 {
            return Err(TraceletError::Config {
                message: "detach_poll_ms must be non-zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Detach acknowledgement timeout as a [`Duration`].
    #[must_use]
    pub const fn detach_timeout(&self) -> Duration {
        Duration::from_millis(self.detach_timeout_ms)
    }

    /// Detach poll interval as a [`Duration`].
    #[must_use]
    pub const fn detach_poll(&self) -> Duration {
        Duration::from_millis(self.detach_poll_ms)
    }
}
