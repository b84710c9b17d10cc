// Socket wrangling
// (c) 2024 Ross Younger

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, UdpSocket};

/// Creates and binds a UDP socket for the address family necessary to reach the given peer address
pub fn bind_unspecified_for(peer: &SocketAddr) -> io::Result<UdpSocket> {
    let addr: SocketAddr = match peer {
        SocketAddr::V4(_) => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0).into(),
    };
    UdpSocket::bind(addr)
}

/// Creates and binds a UDP socket on the given local address
pub fn bind(addr: SocketAddr) -> io::Result<UdpSocket> {
    UdpSocket::bind(addr)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    #[test]
    fn bind_matches_peer_family() -> anyhow::Result<()> {
        let peer: SocketAddr = "192.0.2.1:443".parse()?;
        let sock = super::bind_unspecified_for(&peer)?;
        assert!(sock.local_addr()?.is_ipv4());

        let peer: SocketAddr = "[2001:db8::1]:443".parse()?;
        let sock = super::bind_unspecified_for(&peer)?;
        assert!(sock.local_addr()?.is_ipv6());
        Ok(())
    }

    #[test]
    fn bind_ephemeral() -> anyhow::Result<()> {
        let sock = super::bind("127.0.0.1:0".parse()?)?;
        assert_ne!(sock.local_addr()?.port(), 0);
        Ok(())
    }
}
