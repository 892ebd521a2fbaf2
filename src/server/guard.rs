//! Single-instance guard for the callback listener
//!
//! Launching the application twice on one host would otherwise fail the
//! second time with "address already in use". The guard probes the callback
//! port by binding and immediately releasing it; if the bind fails, another
//! listener is assumed to be serving and the caller should not start one.
//!
//! The probe is check-then-act: another process can take the port between
//! the probe and the real bind. It only keeps duplicate launches quiet and
//! is not a coordination primitive between instances.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of [`ListenerGuard::try_acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// The port was free; the caller should start the listener
    Acquired,
    /// A listener already holds the port (this process or another)
    AlreadyRunning,
}

/// Guards the callback port for the lifetime of the process
#[derive(Debug)]
pub struct ListenerGuard {
    addr: SocketAddr,
    held: AtomicBool,
}

impl ListenerGuard {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            held: AtomicBool::new(false),
        }
    }

    /// The guarded address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether this process currently holds the listener slot
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Claim the listener slot if nobody else holds the port
    ///
    /// Bind errors other than `AddrInUse` are returned as-is.
    pub fn try_acquire(&self) -> io::Result<Acquisition> {
        if self.held.swap(true, Ordering::AcqRel) {
            tracing::debug!(addr = %self.addr, "Listener already started in this process");
            return Ok(Acquisition::AlreadyRunning);
        }

        match TcpListener::bind(self.addr) {
            Ok(probe) => {
                drop(probe);
                Ok(Acquisition::Acquired)
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                self.held.store(false, Ordering::Release);
                tracing::info!(addr = %self.addr, "Callback port in use, assuming listener is running");
                Ok(Acquisition::AlreadyRunning)
            }
            Err(e) => {
                self.held.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Give the slot back after the listener stops
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}
