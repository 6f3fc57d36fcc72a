//! System-wide constants and default paths.
//!
//! All filesystem locations are stored *relative to a namespace root* so the
//! same set of paths can be resolved against `/` on the host or against
//! `/proc/<pid>/root` for a container.

/// File name of the LD_PRELOAD interposition library.
pub const LIBRARY_NAME: &str = "libtracelet.so";

/// Install base directory for extracted library versions and the filter file.
pub const INSTALL_BASE: &str = "usr/lib/tracelet";

/// Fallback base directory used when the install base is not writable.
pub const TMP_BASE: &str = "tmp/tracelet";

/// File name of the filter file dropped by the start path.
pub const FILTER_FILE_NAME: &str = "tracelet_filter";

/// Shell profile hook installed by the start path. The whole file is ours.
pub const PROFILE_HOOK: &str = "etc/profile.d/tracelet.sh";

/// Directory scanned for additional shell profile hooks.
pub const PROFILE_DIR: &str = "etc/profile.d";

/// Directory the library polls for per-process command files.
pub const COMMAND_DIR: &str = "tmp";

/// Prefix of per-process command files (`tracelet.<pid>`).
pub const COMMAND_FILE_PREFIX: &str = "tracelet.";

/// Directive written to a command file to request a runtime detach.
///
/// This is a stable contract with the interposition library: the library
/// polls its command file roughly once per second, applies any directives,
/// and unlinks the file as acknowledgement.
pub const DETACH_DIRECTIVE: &str = "TRACELET_CMD_ATTACH=false";

/// systemd unit directories scanned for LD_PRELOAD directives.
pub const SYSTEMD_UNIT_DIRS: &[&str] = &[
    "etc/systemd/system",
    "lib/systemd/system",
    "usr/lib/systemd/system",
];

/// OpenRC per-service configuration directory.
pub const OPENRC_CONF_DIR: &str = "etc/conf.d";

/// sysvinit per-service environment directory.
pub const SYSCONFIG_DIR: &str = "etc/sysconfig";

/// Default detach acknowledgement timeout in milliseconds.
pub const DEFAULT_DETACH_TIMEOUT_MS: u64 = 5_000;

/// Default interval between acknowledgement polls in milliseconds.
pub const DEFAULT_DETACH_POLL_MS: u64 = 200;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tlt";
