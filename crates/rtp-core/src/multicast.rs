//! Multicast socket plumbing for loop groups.
//!
//! Every loop maps to one IPv4 multicast group; the port is a single
//! per-deployment constant. Receivers bind with `SO_REUSEADDR` so several
//! channels of one host can listen on the shared port.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use serde::{Deserialize, Serialize};

/// Default port shared by all loop groups of a deployment.
pub const DEFAULT_MULTICAST_PORT: u16 = 21_000;

/// One loop's multicast group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastGroup {
    pub addr: Ipv4Addr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_MULTICAST_PORT
}

impl MulticastGroup {
    pub fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.addr, self.port))
    }

    pub fn is_valid(&self) -> bool {
        self.addr.is_multicast() && self.port != 0
    }
}

impl std::fmt::Display for MulticastGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Open a receiver socket joined to `group`.
///
/// The socket is bound to the group port on all interfaces with address
/// reuse enabled, then joined to the group on the default interface.
pub fn multicast_receiver(group: MulticastGroup) -> io::Result<UdpSocket> {
    if !group.is_valid() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a multicast group", group),
        ));
    }
    let socket = bind_reusable(group.port)?;
    socket.join_multicast_v4(&group.addr, &Ipv4Addr::UNSPECIFIED)?;
    tracing::debug!(%group, "joined multicast group");
    Ok(socket)
}

/// Open a send socket for multicast traffic (TTL 1, any local port).
pub fn multicast_sender() -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_multicast_ttl_v4(1)?;
    Ok(socket)
}

#[cfg(unix)]
fn bind_reusable(port: u16) -> io::Result<UdpSocket> {
    use nix::sys::socket::{
        bind, setsockopt, socket, sockopt, AddressFamily, SockFlag, SockType, SockaddrIn,
    };
    use std::os::fd::AsRawFd;

    let fd = socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::empty(),
        None,
    )
    .map_err(io::Error::from)?;
    setsockopt(&fd, sockopt::ReuseAddr, &true).map_err(io::Error::from)?;
    bind(fd.as_raw_fd(), &SockaddrIn::new(0, 0, 0, 0, port)).map_err(io::Error::from)?;
    Ok(UdpSocket::from(fd))
}

#[cfg(not(unix))]
fn bind_reusable(port: u16) -> io::Result<UdpSocket> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
}
