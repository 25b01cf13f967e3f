//! Synchronization primitives.
//!
//! The control core is driven from one cooperative loop, so these are used at
//! the edges only: `watch` for clock snapshots and live settings, `mpsc` for
//! background resolution results, `broadcast` for the event bus, and
//! [`CancellationToken`] for tearing down a screen's polling.

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

pub use tokio_util::sync::CancellationToken;
