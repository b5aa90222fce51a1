use std::fmt;
use std::net::Ipv4Addr;

/// An IPv4 address as the four raw bytes found in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    pub const fn new(octets: [u8; 4]) -> Self {
        Self(octets)
    }

    /// Copy an address out of a slice. Returns `None` unless the slice is exactly 4 bytes.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let octets: [u8; 4] = data.try_into().ok()?;
        Some(Self(octets))
    }

    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl From<Address> for Ipv4Addr {
    fn from(addr: Address) -> Self {
        Ipv4Addr::from(addr.0)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr.octets())
    }
}

/// A TCP port as the two raw big-endian bytes found in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port([u8; 2]);

impl Port {
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    /// Copy a port out of a slice. Returns `None` unless the slice is exactly 2 bytes.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; 2] = data.try_into().ok()?;
        Some(Self(bytes))
    }

    pub const fn value(&self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    pub const fn bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl From<u16> for Port {
    fn from(value: u16) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_displays_dotted_decimal() {
        let addr = Address::new([192, 168, 0, 254]);
        assert_eq!(addr.to_string(), "192.168.0.254");
        assert_eq!(Ipv4Addr::from(addr), Ipv4Addr::new(192, 168, 0, 254));
    }

    #[test]
    fn address_requires_exactly_four_bytes() {
        assert!(Address::from_slice(&[1, 2, 3]).is_none());
        assert!(Address::from_slice(&[1, 2, 3, 4, 5]).is_none());
        assert_eq!(
            Address::from_slice(&[10, 0, 0, 1]),
            Some(Address::new([10, 0, 0, 1]))
        );
    }

    #[test]
    fn port_is_big_endian() {
        let port = Port::from_slice(&[0x1f, 0x90]).unwrap();
        assert_eq!(port.value(), 8080);
        assert_eq!(port.to_string(), "8080");
        assert_eq!(Port::from(80), Port::new([0, 80]));
        assert!(Port::from_slice(&[0]).is_none());
    }
}
