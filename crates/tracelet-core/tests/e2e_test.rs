//! End-to-end tests for the stop orchestrator over synthetic namespace
//! roots.
//!
//! Covered scenarios:
//! - full cleanup of an instrumented layout (filters, profile hook, unit
//!   directive) across two namespaces
//! - detach of a live instrumented process found through a synthetic proc
//!   tree, and the report outcomes when the library stays silent or the
//!   process is already gone
//! - idempotence: a second run is a pure no-op
//! - partial-failure isolation: one namespace failing structurally does not
//!   stop cleanup of the others
//! - cancellation: no new work is issued once the token is set

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use tracelet_common::config::StopConfig;
use tracelet_common::error::{Result, TraceletError};
use tracelet_common::types::{NamespaceId, Outcome};
use tracelet_core::namespace::Namespace;
use tracelet_core::stop::{run_stop_in, CancelToken};

struct TempNamespace {
    id: NamespaceId,
    root: PathBuf,
    proc_root: Option<PathBuf>,
    pids: Vec<i32>,
}

impl TempNamespace {
    fn new(id: NamespaceId, root: &Path) -> Self {
        Self {
            id,
            root: root.to_path_buf(),
            proc_root: None,
            pids: Vec::new(),
        }
    }

    /// A namespace whose process table is backed by a synthetic proc tree.
    fn with_processes(id: NamespaceId, root: &Path, proc_root: &Path, pids: Vec<i32>) -> Self {
        Self {
            id,
            root: root.to_path_buf(),
            proc_root: Some(proc_root.to_path_buf()),
            pids,
        }
    }
}

impl Namespace for TempNamespace {
    fn id(&self) -> &NamespaceId {
        &self.id
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn proc_root(&self) -> &Path {
        self.proc_root.as_deref().unwrap_or(Path::new("/proc"))
    }

    fn pids(&self) -> Result<Vec<i32>> {
        Ok(self.pids.clone())
    }
}

/// A namespace whose process table cannot be enumerated.
struct UnreachableNamespace {
    id: NamespaceId,
    root: PathBuf,
}

impl Namespace for UnreachableNamespace {
    fn id(&self) -> &NamespaceId {
        &self.id
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn pids(&self) -> Result<Vec<i32>> {
        Err(TraceletError::ProcEnumeration {
            path: PathBuf::from("/proc"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })
    }
}

const UNIT_DIRECTIVE: &str = "Environment=LD_PRELOAD=/usr/lib/tracelet/1.0.0/libtracelet.so\n";

/// Lays out a freshly instrumented root: both filter files, an extracted
/// library version, the profile hook, and one systemd unit directive.
fn seed_instrumented_root(root: &Path) {
    std::fs::create_dir_all(root.join("usr/lib/tracelet/1.0.0")).expect("mkdir install base");
    std::fs::write(root.join("usr/lib/tracelet/tracelet_filter"), "allow *\n")
        .expect("seed install filter");
    std::fs::write(
        root.join("usr/lib/tracelet/1.0.0/libtracelet.so"),
        "\x7fELF",
    )
    .expect("seed library");

    std::fs::create_dir_all(root.join("tmp/tracelet")).expect("mkdir tmp base");
    std::fs::write(root.join("tmp/tracelet/tracelet_filter"), "allow *\n")
        .expect("seed tmp filter");

    std::fs::create_dir_all(root.join("etc/profile.d")).expect("mkdir profile.d");
    std::fs::write(
        root.join("etc/profile.d/tracelet.sh"),
        "#!/bin/sh\nexport LD_PRELOAD=/usr/lib/tracelet/1.0.0/libtracelet.so\n",
    )
    .expect("seed profile hook");

    std::fs::create_dir_all(root.join("etc/systemd/system")).expect("mkdir systemd");
    std::fs::write(
        root.join("etc/systemd/system/nginx.service"),
        format!("[Unit]\nDescription=nginx\n\n[Service]\n{UNIT_DIRECTIVE}ExecStart=/usr/sbin/nginx\n"),
    )
    .expect("seed unit");
}

/// Adds one instrumented process entry to a synthetic proc tree: the
/// library shows up in the mapped-file list and `NSpid` carries a
/// namespace-local pid equal to the host pid.
fn seed_proc_entry(proc_root: &Path, pid: i32, comm: &str) {
    let dir = proc_root.join(pid.to_string());
    std::fs::create_dir_all(&dir).expect("mkdir proc entry");
    std::fs::write(dir.join("comm"), format!("{comm}\n")).expect("write comm");
    std::fs::write(dir.join("status"), format!("NSpid:\t{pid}\n")).expect("write status");
    std::fs::write(
        dir.join("maps"),
        "7f1a000-7f1b000 r-xp 0 08:01 99 /usr/lib/tracelet/1.0.0/libtracelet.so\n",
    )
    .expect("write maps");
}

#[allow(clippy::cast_possible_wrap)]
fn self_pid() -> i32 {
    std::process::id() as i32
}

fn assert_root_clean(root: &Path) {
    assert!(!root.join("usr/lib/tracelet").exists(), "install base should be gone");
    assert!(!root.join("tmp/tracelet").exists(), "tmp base should be gone");
    assert!(
        !root.join("etc/profile.d/tracelet.sh").exists(),
        "profile hook should be gone"
    );
    let unit = std::fs::read_to_string(root.join("etc/systemd/system/nginx.service"))
        .expect("unit survives");
    assert_eq!(
        unit,
        "[Unit]\nDescription=nginx\n\n[Service]\nExecStart=/usr/sbin/nginx\n"
    );
}

#[test]
fn stop_cleans_host_and_container_namespaces() {
    let host_dir = tempfile::tempdir().expect("host tempdir");
    let container_dir = tempfile::tempdir().expect("container tempdir");
    seed_instrumented_root(host_dir.path());
    seed_instrumented_root(container_dir.path());

    let namespaces: Vec<Box<dyn Namespace>> = vec![
        Box::new(TempNamespace::new(NamespaceId::Host, host_dir.path())),
        Box::new(TempNamespace::new(
            NamespaceId::Container { mnt_inode: 4_026_532_999 },
            container_dir.path(),
        )),
    ];

    let report = run_stop_in(&namespaces, &StopConfig::default(), &CancelToken::new());

    assert_eq!(report.namespaces.len(), 2);
    assert!(report.unresolved().is_empty(), "{:?}", report.unresolved());
    assert_root_clean(host_dir.path());
    assert_root_clean(container_dir.path());

    // Every namespace rewrote one unit and one profile hook.
    for section in &report.namespaces {
        assert_eq!(
            section.configs.iter().filter(|i| i.outcome == Outcome::Done).count(),
            2
        );
    }
}

#[test]
fn stop_detaches_a_live_instrumented_process() {
    let root_dir = tempfile::tempdir().expect("root tempdir");
    seed_instrumented_root(root_dir.path());
    let proc_dir = tempfile::tempdir().expect("proc tempdir");
    let pid = self_pid();
    seed_proc_entry(proc_dir.path(), pid, "nginx");

    let namespaces: Vec<Box<dyn Namespace>> = vec![Box::new(TempNamespace::with_processes(
        NamespaceId::Host,
        root_dir.path(),
        proc_dir.path(),
        vec![pid],
    ))];
    let config = StopConfig {
        detach_timeout_ms: 2_000,
        detach_poll_ms: 10,
        ..StopConfig::default()
    };

    // Plays the library's part: consume the command file and unlink it.
    let command_file = root_dir.path().join(format!("tmp/tracelet.{pid}"));
    let responder = std::thread::spawn(move || {
        while !command_file.exists() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let content = std::fs::read_to_string(&command_file).expect("read command");
        assert!(content.contains("TRACELET_CMD_ATTACH=false"));
        std::fs::remove_file(&command_file).expect("unlink command");
    });

    let report = run_stop_in(&namespaces, &config, &CancelToken::new());
    responder.join().expect("responder thread");

    let section = &report.namespaces[0];
    assert_eq!(section.detaches.len(), 1);
    assert!(section.detaches[0].subject.contains(&format!("pid {pid}")));
    assert_eq!(section.detaches[0].outcome, Outcome::Done);
    assert!(report.unresolved().is_empty(), "{:?}", report.unresolved());
    assert_root_clean(root_dir.path());
}

#[test]
fn silent_library_leaves_an_unresolved_detach() {
    let root_dir = tempfile::tempdir().expect("root tempdir");
    std::fs::create_dir(root_dir.path().join("tmp")).expect("mkdir tmp");
    let proc_dir = tempfile::tempdir().expect("proc tempdir");
    let pid = self_pid();
    seed_proc_entry(proc_dir.path(), pid, "nginx");

    let namespaces: Vec<Box<dyn Namespace>> = vec![Box::new(TempNamespace::with_processes(
        NamespaceId::Host,
        root_dir.path(),
        proc_dir.path(),
        vec![pid],
    ))];
    let config = StopConfig {
        detach_timeout_ms: 60,
        detach_poll_ms: 10,
        ..StopConfig::default()
    };

    let report = run_stop_in(&namespaces, &config, &CancelToken::new());

    let section = &report.namespaces[0];
    assert_eq!(section.detaches.len(), 1);
    assert!(
        matches!(&section.detaches[0].outcome, Outcome::Failed(reason) if reason.contains("60ms")),
        "{:?}",
        section.detaches[0].outcome
    );
    // The stale request was taken back, and the failure is visible.
    assert!(!root_dir.path().join(format!("tmp/tracelet.{pid}")).exists());
    let unresolved = report.unresolved();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].contains(&format!("pid {pid}")));
}

#[test]
fn vanished_process_counts_as_already_clean() {
    let root_dir = tempfile::tempdir().expect("root tempdir");
    std::fs::create_dir(root_dir.path().join("tmp")).expect("mkdir tmp");
    let proc_dir = tempfile::tempdir().expect("proc tempdir");

    // A pid that looked instrumented at enumeration time but exited before
    // the detach request could be delivered.
    let mut child = std::process::Command::new("true").spawn().expect("spawn");
    #[allow(clippy::cast_possible_wrap)]
    let pid = child.id() as i32;
    let _ = child.wait().expect("reap child");
    seed_proc_entry(proc_dir.path(), pid, "true");

    let namespaces: Vec<Box<dyn Namespace>> = vec![Box::new(TempNamespace::with_processes(
        NamespaceId::Host,
        root_dir.path(),
        proc_dir.path(),
        vec![pid],
    ))];

    let report = run_stop_in(&namespaces, &StopConfig::default(), &CancelToken::new());

    let section = &report.namespaces[0];
    assert_eq!(section.detaches.len(), 1);
    assert_eq!(section.detaches[0].outcome, Outcome::AlreadyClean);
    assert!(report.unresolved().is_empty(), "{:?}", report.unresolved());
}

#[test]
fn second_run_is_a_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_instrumented_root(dir.path());
    let namespaces: Vec<Box<dyn Namespace>> =
        vec![Box::new(TempNamespace::new(NamespaceId::Host, dir.path()))];
    let config = StopConfig::default();

    let first = run_stop_in(&namespaces, &config, &CancelToken::new());
    assert!(first.unresolved().is_empty());
    assert!(!first.is_noop());

    let second = run_stop_in(&namespaces, &config, &CancelToken::new());
    assert!(second.unresolved().is_empty());
    assert!(second.is_noop(), "second run should find clean state everywhere");
}

#[test]
fn unreachable_namespace_does_not_block_others() {
    let good_dir = tempfile::tempdir().expect("tempdir");
    seed_instrumented_root(good_dir.path());
    let bad_dir = tempfile::tempdir().expect("tempdir");

    let namespaces: Vec<Box<dyn Namespace>> = vec![
        Box::new(UnreachableNamespace {
            id: NamespaceId::Container { mnt_inode: 1 },
            root: bad_dir.path().to_path_buf(),
        }),
        Box::new(TempNamespace::new(NamespaceId::Host, good_dir.path())),
    ];

    let report = run_stop_in(&namespaces, &StopConfig::default(), &CancelToken::new());

    assert!(report.namespaces[0].error.is_some());
    assert!(report.namespaces[1].error.is_none());
    assert_root_clean(good_dir.path());

    let unresolved = report.unresolved();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].starts_with("[mnt-1]"));
}

#[test]
fn cancelled_run_issues_no_new_work() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_instrumented_root(dir.path());
    let proc_dir = tempfile::tempdir().expect("proc tempdir");
    let pid = self_pid();
    seed_proc_entry(proc_dir.path(), pid, "nginx");
    let namespaces: Vec<Box<dyn Namespace>> = vec![Box::new(TempNamespace::with_processes(
        NamespaceId::Host,
        dir.path(),
        proc_dir.path(),
        vec![pid],
    ))];

    let cancel = CancelToken::new();
    cancel.cancel();
    let report = run_stop_in(&namespaces, &StopConfig::default(), &cancel);

    // Nothing was touched: no command file was written, no file rewritten.
    assert!(!dir.path().join(format!("tmp/tracelet.{pid}")).exists());
    assert!(dir.path().join("usr/lib/tracelet/tracelet_filter").exists());
    assert!(dir.path().join("etc/profile.d/tracelet.sh").exists());
    let section = &report.namespaces[0];
    assert_eq!(section.detaches.len(), 1);
    assert!(section
        .detaches
        .iter()
        .chain(section.configs.iter())
        .chain(section.artifacts.iter())
        .all(|item| matches!(item.outcome, Outcome::Skipped(_))));
}
