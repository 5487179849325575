//! UDP socket setup for the packet source boundary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Binds a non-blocking UDP socket for transport packets, joining the
/// multicast group when the address calls for it.
pub fn bind_packet_source(addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let ip = match addr.ip() {
        IpAddr::V4(v4) => v4,
        _ => anyhow::bail!("only IPv4 is supported"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    if ip.is_multicast() {
        socket.join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED)?;
    }
    socket.set_nonblocking(true)?;

    Ok(UdpSocket::from_std(socket.into())?)
}
