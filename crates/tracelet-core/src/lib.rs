//! # tracelet-core
//!
//! The de-instrumentation engine behind `tlt stop`.
//!
//! Removes the Tracelet LD_PRELOAD layer from the host and from every
//! reachable container: detaches live processes, rewrites service-manager
//! configurations, and deletes on-disk artifacts. Governing policy is
//! "best effort, maximum cleanup": every operation is attempted
//! independently and its outcome collected into a [`report::StopReport`];
//! only the inability to enumerate namespaces or processes at all is a
//! hard error.

pub mod artifacts;
pub mod detach;
mod fsutil;
pub mod namespace;
pub mod report;
pub mod scan;
pub mod services;
pub mod stop;
