// Address family helper
// (c) 2024 Ross Younger

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

// I am a little surprised that this enum, or something similar, doesn't appear in std::net.
/// Restricts an operation to one IP address family, or allows both.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
pub enum AddressFamily {
    /// Whichever family resolution yields first
    #[default]
    Any,
    /// IPv4 only
    IPv4,
    /// IPv6 only
    IPv6,
}

impl From<IpAddr> for AddressFamily {
    fn from(value: IpAddr) -> Self {
        match value {
            IpAddr::V4(_) => AddressFamily::IPv4,
            IpAddr::V6(_) => AddressFamily::IPv6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AddressFamily;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn from_addr() {
        assert_eq!(
            AddressFamily::from(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            AddressFamily::IPv4
        );
        assert_eq!(
            AddressFamily::from(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            AddressFamily::IPv6
        );
    }

    #[test]
    fn displays_nicely() {
        assert_eq!(AddressFamily::IPv4.to_string(), "IPv4");
        assert_eq!(AddressFamily::Any.to_string(), "Any");
    }
}
