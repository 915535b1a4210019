//! Capture handles.
//!
//! A [`CaptureOpener`] turns an interface into a [`FrameSource`], the
//! blocking read side of a live capture. The pcap-backed pair is what runs in
//! production; sessions only ever see the traits.

use chrono::{DateTime, Utc};
use log::{debug, info};
use pcap::{Active, Capture};

use super::types::{FrameRead, RawFrame};
use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::CaptureError;
use crate::network::types::NetworkInterface;

/// Blocking read side of an open capture handle.
pub trait FrameSource: Send {
    /// Waits for the next frame, at most the handle's read timeout.
    fn next_frame(&mut self) -> Result<FrameRead, CaptureError>;
}

/// Opens capture handles on an interface.
pub trait CaptureOpener: Send + Sync {
    fn open(
        &self,
        interface: &NetworkInterface,
        settings: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError>;
}

/// Opens live libpcap handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcapOpener;

impl CaptureOpener for PcapOpener {
    fn open(
        &self,
        interface: &NetworkInterface,
        settings: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        debug!(
            "Opening capture on {} (snaplen={}, promisc={}, timeout={}ms)",
            interface.name, settings.snapshot_len, settings.promiscuous, settings.read_timeout_ms
        );
        let capture = Capture::from_device(interface.name.as_str())
            .map_err(|e| CaptureError::HandleOpen(format!("{}: {}", interface.name, e)))?
            .snaplen(settings.snapshot_len)
            .promisc(settings.promiscuous)
            .timeout(settings.read_timeout_ms)
            .open()
            .map_err(|e| CaptureError::HandleOpen(format!("{}: {}", interface.name, e)))?;
        info!("Capture handle opened on {}", interface.name);
        Ok(Box::new(PcapFrameSource { capture }))
    }
}

/// Live libpcap capture handle.
pub struct PcapFrameSource {
    capture: Capture<Active>,
}

impl FrameSource for PcapFrameSource {
    fn next_frame(&mut self) -> Result<FrameRead, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let timestamp =
                    DateTime::from_timestamp(ts.tv_sec as i64, (ts.tv_usec as u32) * 1_000)
                        .unwrap_or_else(Utc::now);
                Ok(FrameRead::Frame(RawFrame {
                    data: packet.data.to_vec(),
                    timestamp,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(FrameRead::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(FrameRead::EndOfCapture),
            Err(e) => Err(CaptureError::HandleRead(e.to_string())),
        }
    }
}
