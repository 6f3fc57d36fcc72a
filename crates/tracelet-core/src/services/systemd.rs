//! systemd unit and drop-in scanning.

use std::path::Path;

use tracelet_common::config::StopConfig;
use tracelet_common::constants::SYSTEMD_UNIT_DIRS;
use tracelet_common::types::{ServiceConfigEntry, ServiceKind};

use crate::namespace::Namespace;

/// Finds unit files and drop-ins carrying our LD_PRELOAD directive in all
/// well-known systemd locations of the namespace.
pub fn scan(namespace: &dyn Namespace, config: &StopConfig) -> Vec<ServiceConfigEntry> {
    let mut entries = Vec::new();
    for dir in SYSTEMD_UNIT_DIRS {
        scan_unit_dir(&namespace.resolve(Path::new(dir)), namespace, config, &mut entries);
    }
    entries
}

fn scan_unit_dir(
    dir: &Path,
    namespace: &dyn Namespace,
    config: &StopConfig,
    entries: &mut Vec<ServiceConfigEntry>,
) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };

    for dir_entry in read_dir.filter_map(std::result::Result::ok) {
        let path = dir_entry.path();
        if path.is_dir() {
            // Drop-in directories: <unit>.d/*.conf
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".d"))
            {
                scan_dropin_dir(&path, namespace, config, entries);
            }
            continue;
        }
        if let Some(entry) = super::entry_for_file(
            &path,
            ServiceKind::Systemd,
            namespace.id(),
            &config.library_name,
        ) {
            entries.push(entry);
        }
    }
}

fn scan_dropin_dir(
    dir: &Path,
    namespace: &dyn Namespace,
    config: &StopConfig,
    entries: &mut Vec<ServiceConfigEntry>,
) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    for dir_entry in read_dir.filter_map(std::result::Result::ok) {
        let path = dir_entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("conf") {
            continue;
        }
        if let Some(entry) = super::entry_for_file(
            &path,
            ServiceKind::Systemd,
            namespace.id(),
            &config.library_name,
        ) {
            entries.push(entry);
        }
    }
}
