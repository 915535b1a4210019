//! # Interface Selection
//!
//! Picks the single network interface a capture session listens on. The
//! list of interfaces comes from an [`InterfaceProvider`]; in production this
//! is [`PcapInterfaceProvider`], which asks libpcap for its devices.
//!
//! Selection rules:
//! - with a pinned name, the interface carrying exactly that name is chosen;
//! - otherwise the first interface, in enumeration order, having at least one
//!   IPv4 address that is not a loopback address is chosen;
//! - when nothing qualifies the result is `None`, which is not an error.
//!
//! Failing to enumerate at all (typically missing capture privileges) is an
//! error and is never reported as an empty list.

use super::types::NetworkInterface;
use crate::error_handling::types::CaptureError;
use log::{debug, info, warn};

/// Source of the host's network interfaces.
pub trait InterfaceProvider: Send + Sync {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>, CaptureError>;
}

/// Enumerates interfaces through libpcap.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcapInterfaceProvider;

impl InterfaceProvider for PcapInterfaceProvider {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>, CaptureError> {
        let devices = pcap::Device::list()
            .map_err(|e| CaptureError::InterfaceEnumeration(e.to_string()))?;
        Ok(devices
            .into_iter()
            .map(|device| NetworkInterface {
                name: device.name,
                description: device.desc,
                addresses: device.addresses.iter().map(|a| a.addr).collect(),
            })
            .collect())
    }
}

/// Chooses the capture interface, either by pinned name or by address heuristics.
pub struct InterfaceSelector<'a> {
    provider: &'a dyn InterfaceProvider,
    pinned: Option<&'a str>,
}

impl<'a> InterfaceSelector<'a> {
    pub fn new(provider: &'a dyn InterfaceProvider) -> Self {
        Self {
            provider,
            pinned: None,
        }
    }

    /// Restricts selection to the interface called `name`.
    pub fn pinned(mut self, name: Option<&'a str>) -> Self {
        self.pinned = name;
        self
    }

    pub fn select(&self) -> Result<Option<NetworkInterface>, CaptureError> {
        let interfaces = self.provider.interfaces()?;
        if interfaces.is_empty() {
            warn!("No network interface available");
            return Ok(None);
        }
        debug!("Enumerated {} network interface(s)", interfaces.len());

        if let Some(name) = self.pinned {
            let found = interfaces.into_iter().find(|i| i.name == name);
            match found {
                Some(ref iface) => info!("Using configured interface {}", iface.name),
                None => warn!("Configured interface {} not found", name),
            }
            return Ok(found);
        }

        let selected = interfaces.into_iter().find(|iface| {
            let qualifies = iface.has_routable_ipv4();
            if !qualifies {
                debug!("Skipping interface {} (no non-loopback IPv4 address)", iface.name);
            }
            qualifies
        });

        match selected {
            Some(ref iface) => info!(
                "Selected interface {} ({})",
                iface.name,
                iface.description.as_deref().unwrap_or("no description")
            ),
            None => warn!("No interface has a non-loopback IPv4 address"),
        }
        Ok(selected)
    }
}
