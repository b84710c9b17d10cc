// DNS helpers
// (c) 2024 Ross Younger

use std::io;
use std::net::IpAddr;

use super::AddressFamily;
use crate::TransportError;

/// DNS lookup helper.
/// Results can be restricted to a given address family.
/// Only the first matching result is returned.
/// If there are no matching records of the required type, returns an error.
pub fn lookup_host_by_family(host: &str, desired: AddressFamily) -> Result<IpAddr, TransportError> {
    let candidates =
        dns_lookup::lookup_host(host).map_err(|source| TransportError::NameResolution {
            host: host.to_string(),
            source,
        })?;
    let mut it = candidates.iter();

    let found = match desired {
        AddressFamily::Any => it.next(),
        AddressFamily::IPv4 => it.find(|addr| addr.is_ipv4()),
        AddressFamily::IPv6 => it.find(|addr| addr.is_ipv6()),
    };
    found
        .copied()
        .ok_or_else(|| TransportError::NameResolution {
            host: host.to_string(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                format!("host found, but not as {desired}"),
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::lookup_host_by_family;
    use crate::util::AddressFamily;

    #[test]
    fn numeric_literal_resolves() {
        let addr = lookup_host_by_family("127.0.0.1", AddressFamily::Any).unwrap();
        assert!(addr.is_loopback());
    }

    #[test]
    fn family_mismatch_fails() {
        let _ = lookup_host_by_family("127.0.0.1", AddressFamily::IPv6)
            .expect_err("should have failed");
    }

    #[test]
    fn localhost_resolves() {
        let addr = lookup_host_by_family("localhost", AddressFamily::Any).unwrap();
        assert!(addr.is_loopback());
    }
}
