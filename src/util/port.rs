//! Scoped ephemeral port allocation.
//!
//! A [`PortLease`] binds a listener on port 0, reports the port the OS
//! picked and keeps the socket bound until the lease is released. Handing
//! the port to a child process requires releasing first, so callers hold
//! the lease until just before the child is spawned.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use thiserror::Error;

/// Failure to obtain a free local port.
#[derive(Debug, Error, miette::Diagnostic)]
#[error("failed to allocate an ephemeral port")]
#[diagnostic(code(quay::port::allocation))]
pub struct PortAllocationError {
    #[source]
    pub source: std::io::Error,
}

/// An allocated local TCP port, held until released or dropped.
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    listener: Option<TcpListener>,
}

impl PortLease {
    /// Bind an ephemeral port on the loopback interface.
    pub fn acquire() -> Result<Self, PortAllocationError> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .map_err(|source| PortAllocationError { source })?;
        let port = listener
            .local_addr()
            .map_err(|source| PortAllocationError { source })?
            .port();
        tracing::debug!("leased port {}", port);
        Ok(PortLease {
            port,
            listener: Some(listener),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the socket is still bound.
    pub fn is_held(&self) -> bool {
        self.listener.is_some()
    }

    /// Unbind the socket. Idempotent.
    pub fn release(&mut self) {
        if self.listener.take().is_some() {
            tracing::debug!("released port {}", self.port);
        }
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run `f` with a held lease, releasing it on every exit path.
///
/// `f` must call [`PortLease::release`] before handing the port to a child
/// process; the lease is dropped when `f` returns or fails.
pub fn with_ephemeral_port<T, E>(f: impl FnOnce(&mut PortLease) -> Result<T, E>) -> Result<T, E>
where
    E: From<PortAllocationError>,
{
    let mut lease = PortLease::acquire()?;
    f(&mut lease)
}
