//! In-memory doubles for the capture, interface and storage seams.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::configuration::types::CaptureConfig;
use crate::data_capture::frame_source::{CaptureOpener, FrameSource};
use crate::data_capture::types::{FrameRead, RawFrame};
use crate::error_handling::types::{CaptureError, StorageError};
use crate::network::interface_selector::InterfaceProvider;
use crate::network::types::NetworkInterface;
use crate::storage::storage_trait::Storage;
use crate::storage::types::{Finding, FindingFilter};

/// Timestamp carried by every scripted frame.
pub fn fixed_instant() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

pub fn frame(payload: &[u8]) -> FrameRead {
    FrameRead::Frame(RawFrame {
        data: payload.to_vec(),
        timestamp: fixed_instant(),
    })
}

pub fn single_ethernet() -> NetworkInterface {
    NetworkInterface {
        name: "eth0".into(),
        description: Some("test ethernet".into()),
        addresses: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))],
    }
}

pub struct StaticInterfaces {
    result: Result<Vec<NetworkInterface>, String>,
}

impl StaticInterfaces {
    pub fn new(interfaces: Vec<NetworkInterface>) -> Self {
        Self {
            result: Ok(interfaces),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
        }
    }
}

impl InterfaceProvider for StaticInterfaces {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>, CaptureError> {
        match &self.result {
            Ok(interfaces) => Ok(interfaces.clone()),
            Err(reason) => Err(CaptureError::InterfaceEnumeration(reason.clone())),
        }
    }
}

/// Frame source driven by a closure, one call per read.
pub struct FnSource<F>(F);

impl<F> FrameSource for FnSource<F>
where
    F: FnMut() -> Result<FrameRead, CaptureError> + Send,
{
    fn next_frame(&mut self) -> Result<FrameRead, CaptureError> {
        (self.0)()
    }
}

pub fn source<F>(read: F) -> Box<dyn FrameSource>
where
    F: FnMut() -> Result<FrameRead, CaptureError> + Send + 'static,
{
    Box::new(FnSource(read))
}

type SourceFactory = Box<dyn Fn() -> Result<Box<dyn FrameSource>, CaptureError> + Send + Sync>;

/// Opener handing out sources built by a factory, counting every open.
pub struct ScriptedOpener {
    factory: SourceFactory,
    opens: AtomicUsize,
}

impl ScriptedOpener {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn FrameSource>, CaptureError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            opens: AtomicUsize::new(0),
        }
    }

    /// Each opened source replays `reads`, then reports end of capture.
    pub fn with_reads(reads: Vec<FrameRead>) -> Self {
        Self::new(move || {
            let mut pending: VecDeque<FrameRead> = reads.clone().into();
            Ok(source(move || Ok(pending.pop_front().unwrap_or(FrameRead::EndOfCapture))))
        })
    }

    pub fn with_payloads(payloads: Vec<Vec<u8>>) -> Self {
        Self::with_reads(payloads.iter().map(|p| frame(p)).collect())
    }

    pub fn failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(move || Err(CaptureError::HandleOpen(reason.clone())))
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl CaptureOpener for ScriptedOpener {
    fn open(
        &self,
        _interface: &NetworkInterface,
        _settings: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        (self.factory)()
    }
}

/// Storage keeping every saved batch in memory.
#[derive(Default)]
pub struct MemStorage {
    batches: Mutex<Vec<(Uuid, Vec<Finding>)>>,
    failing: bool,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<(Uuid, Vec<Finding>)> {
        self.batches.lock().unwrap().clone()
    }
}

impl Storage for MemStorage {
    fn save_findings(&self, session_id: Uuid, findings: &[Finding]) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::WriteFailed);
        }
        if findings.is_empty() {
            return Ok(());
        }
        self.batches
            .lock()
            .unwrap()
            .push((session_id, findings.to_vec()));
        Ok(())
    }

    fn get_findings(&self, filter: Option<FindingFilter>) -> Result<Vec<Finding>, StorageError> {
        let filter = filter.unwrap_or_default();
        Ok(self
            .batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, findings)| findings.iter().cloned())
            .filter(|f| filter.matches(f))
            .collect())
    }

    fn cleanup_old_findings(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = older_than.timestamp_millis();
        let mut removed = 0;
        for (_, findings) in self.batches.lock().unwrap().iter_mut() {
            let before = findings.len();
            findings.retain(|f| f.captured_at_epoch_millis >= cutoff);
            removed += before - findings.len();
        }
        Ok(removed)
    }
}
