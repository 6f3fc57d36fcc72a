//! OpenRC `conf.d`, sysvinit `sysconfig`, and `profile.d` scanning.

use std::path::Path;

use tracelet_common::config::StopConfig;
use tracelet_common::constants::{OPENRC_CONF_DIR, PROFILE_DIR, SYSCONFIG_DIR};
use tracelet_common::types::{ServiceConfigEntry, ServiceKind};

use crate::namespace::Namespace;

/// Finds shell-sourced configuration files carrying our LD_PRELOAD
/// directive: OpenRC service configs, sysconfig environment files, and
/// profile hooks.
pub fn scan(namespace: &dyn Namespace, config: &StopConfig) -> Vec<ServiceConfigEntry> {
    let mut entries = Vec::new();
    scan_flat_dir(
        &namespace.resolve(Path::new(OPENRC_CONF_DIR)),
        ServiceKind::OpenRc,
        namespace,
        config,
        &mut entries,
    );
    scan_flat_dir(
        &namespace.resolve(Path::new(SYSCONFIG_DIR)),
        ServiceKind::Sysconfig,
        namespace,
        config,
        &mut entries,
    );
    scan_flat_dir(
        &namespace.resolve(Path::new(PROFILE_DIR)),
        ServiceKind::ProfileHook,
        namespace,
        config,
        &mut entries,
    );
    entries
}

fn scan_flat_dir(
    dir: &Path,
    kind: ServiceKind,
    namespace: &dyn Namespace,
    config: &StopConfig,
    entries: &mut Vec<ServiceConfigEntry>,
) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    for dir_entry in read_dir.filter_map(std::result::Result::ok) {
        let path = dir_entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(entry) =
            super::entry_for_file(&path, kind, namespace.id(), &config.library_name)
        {
            entries.push(entry);
        }
    }
}
