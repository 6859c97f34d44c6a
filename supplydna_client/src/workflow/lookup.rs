//! Component lookup
//!
//! `Idle -> Normalizing -> Reading -> {Found | NotFound | Error} -> Idle`.
//! Only the found path touches the recent-lookup history.

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::InFlight;
use crate::errors::WorkflowError;
use crate::history::{HistoryRepository, RecentHistory, RecentLookup};
use crate::ledger::LedgerAccessor;
use crate::normalizer::normalize;
use crate::qr;
use crate::stage::{stage_index, LifecycleStage};
use crate::types::ComponentRecord;

pub const NOT_FOUND_MESSAGE: &str = "Component not found for this UUID!";
pub const SCAN_FAILED_MESSAGE: &str = "Could not scan QR from image.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LookupPhase {
    #[default]
    Idle,
    Normalizing,
    Reading,
}

/// What the lookup surface currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupView {
    /// Normalized id of the last lookup
    pub input: String,
    pub component: Option<ComponentRecord>,
    pub error: Option<String>,
    pub phase: LookupPhase,
}

impl LookupView {
    pub fn stage_index(&self) -> i8 {
        stage_index(self.component.as_ref())
    }

    pub fn stage(&self) -> Option<LifecycleStage> {
        LifecycleStage::from_index(self.stage_index())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(ComponentRecord),
    NotFound { id: String },
    Failed { message: String },
    /// Input normalized to nothing; no ledger call was made
    Skipped,
    /// A lookup is already running on this surface
    Busy,
}

pub struct LookupWorkflow {
    ledger: LedgerAccessor,
    repository: Arc<dyn HistoryRepository>,
    history: Mutex<RecentHistory>,
    view: Mutex<LookupView>,
    in_flight: InFlight,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LookupWorkflow {
    /// Build the workflow, loading persisted history
    pub fn new(
        ledger: LedgerAccessor,
        repository: Arc<dyn HistoryRepository>,
    ) -> Result<Self, WorkflowError> {
        let history = RecentHistory::new(repository.load()?);
        debug!("Loaded {} recent lookups", history.len());
        Ok(Self {
            ledger,
            repository,
            history: Mutex::new(history),
            view: Mutex::new(LookupView::default()),
            in_flight: InFlight::new(),
        })
    }

    pub fn view(&self) -> LookupView {
        locked(&self.view).clone()
    }

    pub fn history(&self) -> Vec<RecentLookup> {
        locked(&self.history).entries().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_active()
    }

    fn set_phase(&self, phase: LookupPhase) {
        debug!("Lookup phase -> {:?}", phase);
        locked(&self.view).phase = phase;
    }

    /// Look up raw scanned or typed input
    pub async fn lookup(&self, raw: &str) -> LookupOutcome {
        let Some(_guard) = self.in_flight.try_acquire() else {
            return LookupOutcome::Busy;
        };

        self.set_phase(LookupPhase::Normalizing);
        let id = normalize(raw).into_identifier();
        if id.is_empty() {
            self.set_phase(LookupPhase::Idle);
            return LookupOutcome::Skipped;
        }

        {
            let mut view = locked(&self.view);
            view.input = id.clone();
            view.component = None;
            view.error = None;
            view.phase = LookupPhase::Reading;
        }

        let result = self.ledger.read_component(&id).await;
        let outcome = match result {
            Ok(Some(record)) => {
                info!("Found component {}", record.id);
                self.remember(&record);
                LookupOutcome::Found(record)
            }
            Ok(None) => LookupOutcome::NotFound { id },
            Err(err) => {
                error!("Lookup failed: {}", err);
                LookupOutcome::Failed {
                    message: WorkflowError::from(err).lookup_message(),
                }
            }
        };

        let mut view = locked(&self.view);
        match &outcome {
            LookupOutcome::Found(record) => view.component = Some(record.clone()),
            LookupOutcome::NotFound { .. } => view.error = Some(NOT_FOUND_MESSAGE.to_string()),
            LookupOutcome::Failed { message } => view.error = Some(message.clone()),
            LookupOutcome::Skipped | LookupOutcome::Busy => {}
        }
        view.phase = LookupPhase::Idle;
        outcome
    }

    /// Scan a QR code from the image at `path` and look up its content.
    /// An unreadable image sets the scan error and leaves the displayed
    /// component alone.
    pub async fn lookup_qr_image(&self, path: &Path) -> LookupOutcome {
        if self.is_busy() {
            return LookupOutcome::Busy;
        }

        let owned = path.to_path_buf();
        let scanned = tokio::task::spawn_blocking(move || qr::decode_file(&owned)).await;
        let reason = match scanned {
            Ok(Ok(text)) => {
                debug!("Scanned QR payload from {}", path.display());
                return self.lookup(&text).await;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Could not scan QR from {}: {}", path.display(), reason);
        locked(&self.view).error = Some(SCAN_FAILED_MESSAGE.to_string());
        LookupOutcome::Failed {
            message: SCAN_FAILED_MESSAGE.to_string(),
        }
    }

    fn remember(&self, record: &ComponentRecord) {
        let mut history = locked(&self.history);
        history.record(RecentLookup::for_record(record, Utc::now()));
        if let Err(e) = self.repository.save(history.entries()) {
            error!("Failed to persist recent lookups: {}", e);
        }
    }
}
