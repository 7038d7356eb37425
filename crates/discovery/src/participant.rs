//! Client-side envelope around the broker conversation: bind a datagram
//! socket, announce yourself once, hand peer notices to the caller, and
//! say goodbye on drop.

use crate::errors::DiscoveryError;
use crate::protocol::{PeerNotice, Registration, Request, MAX_DATAGRAM_LEN};
use std::fmt;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Participant {
    socket: UnixDatagram,
    socket_path: PathBuf,
    broker_path: PathBuf,
    registration: Registration,
}

impl Participant {
    /// Register under the per-process default socket path
    /// `/tmp/ipc_<role>_<pid>.sock`.
    pub fn register(
        broker_path: impl AsRef<Path>,
        role: Role,
        service: &str,
        ring: Option<&str>,
    ) -> Result<Self, DiscoveryError> {
        let socket_path = format!("/tmp/ipc_{}_{}.sock", role, std::process::id());
        Self::register_with_path(broker_path, socket_path, service, ring)
    }

    /// Register with an explicit socket path. Lets tests place several
    /// participants of one process in a scratch directory.
    pub fn register_with_path(
        broker_path: impl AsRef<Path>,
        socket_path: impl Into<PathBuf>,
        service: &str,
        ring: Option<&str>,
    ) -> Result<Self, DiscoveryError> {
        let socket_path = socket_path.into();
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        let socket = UnixDatagram::bind(&socket_path)?;

        let registration = Registration {
            service: service.to_string(),
            address: socket_path.to_string_lossy().into_owned(),
            ring: ring.map(str::to_string),
        };
        let broker_path = broker_path.as_ref().to_path_buf();
        let request = Request::Register(registration.clone()).to_string();
        socket.send_to(request.as_bytes(), &broker_path)?;

        tracing::info!(
            service = %registration.service,
            address = %registration.address,
            "registered with discovery broker"
        );

        Ok(Self {
            socket,
            socket_path,
            broker_path,
            registration,
        })
    }

    /// The address peers will be told to reach this participant at.
    pub fn address(&self) -> &str {
        &self.registration.address
    }

    /// Bound the blocking time of [`Participant::recv_peer`]. `None` blocks
    /// indefinitely.
    pub fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    /// Wait for the next peer notification.
    ///
    /// Returns `Ok(None)` when the receive timeout elapses so callers can
    /// interleave a shutdown check. Datagrams that do not parse as PEER are
    /// logged and skipped.
    pub fn recv_peer(&self) -> Result<Option<PeerNotice>, DiscoveryError> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        loop {
            let received = match self.socket.recv(&mut buf) {
                Ok(n) => n,
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    return Ok(None)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            match PeerNotice::parse(&buf[..received]) {
                Ok(notice) => return Ok(Some(notice)),
                Err(e) => tracing::warn!("ignoring datagram from broker: {e}"),
            }
        }
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        let request = Request::Deregister(self.registration.clone()).to_string();
        if let Err(e) = self.socket.send_to(request.as_bytes(), &self.broker_path) {
            tracing::debug!("deregister send failed: {e}");
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
