//! UDP listener socket.
//!
//! # Responsibilities
//! - Bind the configured address exactly once, before any worker starts
//! - Register the socket with the reactor's I/O driver
//! - Close exactly once during teardown

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::reactor::Reactor;

/// The listener could not be bound.
#[derive(Debug, Error)]
#[error("failed to bind {address}: {source}")]
pub struct BindError {
    /// Address that was requested.
    pub address: SocketAddr,
    #[source]
    pub source: std::io::Error,
}

impl BindError {
    fn new(address: SocketAddr, source: std::io::Error) -> Self {
        Self { address, source }
    }
}

/// A bound UDP endpoint owned by the reactor thread.
#[derive(Debug)]
pub struct ListenerSocket {
    inner: UdpSocket,
    local_addr: SocketAddr,
}

impl ListenerSocket {
    /// Bind `address` and register the socket with `reactor`.
    pub fn bind(reactor: &Reactor, address: SocketAddr) -> Result<Self, BindError> {
        let std_socket =
            std::net::UdpSocket::bind(address).map_err(|e| BindError::new(address, e))?;
        std_socket
            .set_nonblocking(true)
            .map_err(|e| BindError::new(address, e))?;

        let inner = {
            let _guard = reactor.enter();
            UdpSocket::from_std(std_socket).map_err(|e| BindError::new(address, e))?
        };
        let local_addr = inner.local_addr().map_err(|e| BindError::new(address, e))?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The registered socket, for readiness-driven reads and writes.
    pub(crate) fn socket(&self) -> &UdpSocket {
        &self.inner
    }

    /// Deregister and close the socket.
    pub fn close(self) {
        tracing::info!(address = %self.local_addr, "Listener closed");
        drop(self.inner);
    }
}
