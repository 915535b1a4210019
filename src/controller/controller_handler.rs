use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::configuration::config::Config;
use crate::data_capture::{
    CaptureOpener, CaptureSession, FieldExtractor, FindingBuilder, KeywordMatcher, PcapOpener,
};
use crate::error_handling::types::*;
use crate::network::{InterfaceProvider, InterfaceSelector, PcapInterfaceProvider};
use crate::storage::{open_storage, Storage};

/// Wait before retrying when no interface could be selected.
const NO_INTERFACE_RETRY: Duration = Duration::from_secs(5);

/// Outcome of one completed capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: Uuid,
    /// Interface captured on; `None` when selection found nothing usable
    pub interface: Option<String>,
    pub findings_saved: usize,
}

/// Drives capture sessions one after another and hands every batch to storage.
pub struct Controller {
    config: Config,
    storage: Arc<dyn Storage>,
    interfaces: Arc<dyn InterfaceProvider>,
    opener: Arc<dyn CaptureOpener>,
}

impl Controller {
    /// Builds a controller on libpcap and the configured storage backend.
    ///
    /// Opening the database backend blocks; call this outside async tasks
    /// (e.g. from `spawn_blocking`).
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        let storage = open_storage(&config.storage).map_err(|e| {
            error!("Unable to open {:?} storage: {}", config.storage.backend, e);
            ControllerError::StorageError(e)
        })?;
        Ok(Self::with_components(
            config,
            storage,
            Arc::new(PcapInterfaceProvider),
            Arc::new(PcapOpener),
        ))
    }

    pub fn with_components(
        config: Config,
        storage: Arc<dyn Storage>,
        interfaces: Arc<dyn InterfaceProvider>,
        opener: Arc<dyn CaptureOpener>,
    ) -> Self {
        Self {
            config,
            storage,
            interfaces,
            opener,
        }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Runs one session: select an interface, capture, process, save.
    ///
    /// The whole session runs on the blocking pool so pcap reads never stall
    /// the runtime.
    pub async fn run_session(
        &self,
        cancel: CancellationToken,
    ) -> Result<SessionReport, ControllerError> {
        let capture = self.config.capture.clone();
        let matcher = KeywordMatcher::new(self.config.keywords.clone())
            .with_ignored_sites(self.config.ignored_sites.clone());
        let storage = Arc::clone(&self.storage);
        let interfaces = Arc::clone(&self.interfaces);
        let opener = Arc::clone(&self.opener);

        let handle = tokio::task::spawn_blocking(move || -> Result<SessionReport, CaptureError> {
            let interface = InterfaceSelector::new(interfaces.as_ref())
                .pinned(capture.interface.as_deref())
                .select()?;
            let session = CaptureSession::new(
                capture,
                matcher,
                FindingBuilder::new(FieldExtractor::new()),
                opener,
                cancel,
            );
            let findings_saved = session.run_to_sink(interface.as_ref(), storage.as_ref())?;
            Ok(SessionReport {
                session_id: session.id(),
                interface: interface.map(|i| i.name),
                findings_saved,
            })
        });

        let report = handle
            .await
            .map_err(|e| ControllerError::TaskFailed(e.to_string()))??;
        Ok(report)
    }

    /// Runs sessions until cancelled, or once when the schedule is not continuous.
    ///
    /// Cancellation is a clean stop. Any other session failure stops the loop
    /// and is returned.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ControllerError> {
        info!(
            "Controller started ({} keyword(s), continuous: {})",
            self.config.keywords.len(),
            self.config.schedule.continuous
        );
        let mut completed: u64 = 0;

        while !cancel.is_cancelled() {
            let report = match self.run_session(cancel.clone()).await {
                Ok(report) => report,
                Err(ControllerError::CaptureError(CaptureError::Cancelled)) => {
                    info!("Session cancelled, stopping");
                    break;
                }
                Err(e) => {
                    error!("Session failed: {}", e);
                    return Err(e);
                }
            };
            completed += 1;
            info!(
                "[{}] Session #{} saved {} finding(s)",
                report.session_id, completed, report.findings_saved
            );

            if !self.config.schedule.continuous {
                break;
            }

            let mut pause = Duration::from_secs(self.config.schedule.pause_secs);
            if report.interface.is_none() && pause < NO_INTERFACE_RETRY {
                warn!("No interface to capture on, retrying in {:?}", NO_INTERFACE_RETRY);
                pause = NO_INTERFACE_RETRY;
            }
            if !pause.is_zero() {
                debug!("Pausing {:?} before next session", pause);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        info!("Controller stopped after {} session(s)", completed);
        Ok(())
    }
}
