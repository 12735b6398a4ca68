//! Socket lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Externally visible state of the socket owned by a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
    /// No socket. The next send (or `open`) creates one.
    Unbound,
    /// A live socket exists, idle or serving the active entry.
    Bound,
    /// Forcibly torn down by `destroy`. The next send creates a fresh socket.
    Destroyed,
}

impl SocketState {
    /// Whether a new socket may be created from this state.
    pub fn can_create(&self) -> bool {
        !matches!(self, SocketState::Bound)
    }
}

/// Internal slot holding the handle.
///
/// `Busy` means the worker has checked the handle out (or is creating one).
/// Anyone who moves the slot away from `Busy` while the worker holds the
/// handle leaves the worker responsible for tearing it down.
pub(crate) enum Slot<H> {
    Unbound,
    Bound(H),
    Busy,
    Destroyed,
}

impl<H> Slot<H> {
    pub(crate) fn state(&self) -> SocketState {
        match self {
            Slot::Unbound => SocketState::Unbound,
            Slot::Bound(_) | Slot::Busy => SocketState::Bound,
            Slot::Destroyed => SocketState::Destroyed,
        }
    }

    pub(crate) fn take(&mut self, next: Slot<H>) -> Slot<H> {
        std::mem::replace(self, next)
    }

    pub(crate) fn is_busy(&self) -> bool {
        matches!(self, Slot::Busy)
    }
}

impl<H> fmt::Debug for Slot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Unbound => f.write_str("Unbound"),
            Slot::Bound(_) => f.write_str("Bound"),
            Slot::Busy => f.write_str("Busy"),
            Slot::Destroyed => f.write_str("Destroyed"),
        }
    }
}

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque label identifying one queue (and its socket) in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl QueueId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}
