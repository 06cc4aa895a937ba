//! # Control-Reference Sender Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use eci_if::wire::ControlRefPacket;

use crate::EciError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Owns the send socket and the fixed destination the references go to.
///
/// The socket is exclusively the sender's; the receiver has its own. Dropping the sender
/// closes the socket.
pub(crate) struct RefSender {
    socket: UdpSocket,
    dest: SocketAddr,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RefSender {
    /// Resolve the destination and bind an ephemeral send socket.
    pub(crate) fn new(host: &str, tx_port: u16) -> Result<Self, EciError> {
        let mut addrs = (host, tx_port)
            .to_socket_addrs()
            .map_err(|e| EciError::ResolutionError(host.into(), e))?;

        let dest = addrs.next().ok_or_else(|| {
            EciError::ResolutionError(host.into(), std::io::ErrorKind::AddrNotAvailable.into())
        })?;

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(EciError::SocketError)?;

        Ok(Self { socket, dest })
    }

    /// The resolved destination address.
    pub(crate) fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Serialise and transmit one reference packet as a single datagram.
    ///
    /// Best-effort UDP: no retry, no acknowledgement. A short accepted byte count is an
    /// error, never silently tolerated.
    pub(crate) fn send(&self, packet: &ControlRefPacket) -> Result<(), EciError> {
        let buf = packet.encode();

        let sent = self
            .socket
            .send_to(&buf, self.dest)
            .map_err(EciError::SendError)?;

        if sent != buf.len() {
            return Err(EciError::TruncatedSend {
                sent,
                expected: buf.len(),
            });
        }

        Ok(())
    }
}
