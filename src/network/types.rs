use std::net::IpAddr;

/// A network interface as reported by the capture library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Device name usable to open a capture handle (e.g. "eth0")
    pub name: String,
    pub description: Option<String>,
    /// Addresses bound to the interface, in the order the system reports them
    pub addresses: Vec<IpAddr>,
}

impl NetworkInterface {
    /// True when at least one bound address is IPv4 and not a loopback address.
    pub fn has_routable_ipv4(&self) -> bool {
        self.addresses
            .iter()
            .any(|addr| matches!(addr, IpAddr::V4(v4) if !v4.is_loopback()))
    }
}
