//! Process-wide networking context.
//!
//! # Design
//! The platform socket library is initialized once per process, on first use,
//! and never torn down by individual connections. Every `Connection` holds a
//! `&'static NetContext` and reports its open/close transitions here, which
//! makes descriptor leaks observable from tests and host applications.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

static CONTEXT: OnceLock<NetContext> = OnceLock::new();

#[derive(Debug)]
pub struct NetContext {
    live_sockets: AtomicUsize,
    opened_sockets: AtomicUsize,
}

impl NetContext {
    /// Return the process-wide context, initializing it on first call.
    pub fn acquire() -> &'static NetContext {
        CONTEXT.get_or_init(|| {
            // socket2 performs the platform socket-library startup on its first
            // socket; from here on it stays up for the life of the process.
            tracing::debug!("initializing process-wide networking context");
            NetContext {
                live_sockets: AtomicUsize::new(0),
                opened_sockets: AtomicUsize::new(0),
            }
        })
    }

    /// Sockets created and not yet closed.
    pub fn live_sockets(&self) -> usize {
        self.live_sockets.load(Ordering::SeqCst)
    }

    /// Sockets created since process start.
    pub fn opened_sockets(&self) -> usize {
        self.opened_sockets.load(Ordering::SeqCst)
    }

    pub(crate) fn socket_opened(&self) {
        self.opened_sockets.fetch_add(1, Ordering::SeqCst);
        self.live_sockets.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn socket_closed(&self) {
        self.live_sockets.fetch_sub(1, Ordering::SeqCst);
    }
}
