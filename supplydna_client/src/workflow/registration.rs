//! Component registration
//!
//! `Idle -> Validating -> UploadingMetadata? -> Writing -> {Success | Error}`.
//!
//! With `mints_certificate` the metadata is pinned first and any upload
//! failure aborts before the ledger is touched. The ledger accessor resolves
//! only after confirmation, so `Writing` covers both submission and
//! confirmation.

use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::InFlight;
use crate::errors::WorkflowError;
use crate::ipfs::{metadata_uri, MetadataUploader};
use crate::ledger::LedgerAccessor;
use crate::metadata::NftMetadata;
use crate::types::ComponentRecord;

pub const SUCCESS_MESSAGE: &str = "Component registered successfully!";
pub const MISSING_FIELDS_MESSAGE: &str = "All fields are required.";
pub const WRONG_PASSPHRASE_MESSAGE: &str = "Incorrect password.";

/// Registration form fields as entered by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub id: String,
    pub name: String,
    pub supplier: String,
    pub batch: String,
    pub date: String,
    /// Shared passphrase, only checked when no certificate is minted
    pub password: String,
}

impl RegistrationForm {
    /// Fields as entered; trimming only applies to the completeness check
    pub fn record(&self) -> ComponentRecord {
        ComponentRecord::new(
            self.id.clone(),
            self.name.clone(),
            self.supplier.clone(),
            self.batch.clone(),
            self.date.clone(),
        )
    }

    fn has_all_fields(&self) -> bool {
        [&self.id, &self.name, &self.supplier, &self.batch, &self.date]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RegistrationPhase {
    #[default]
    Idle,
    Validating,
    UploadingMetadata,
    /// Submitted and awaiting confirmation
    Writing,
    Success,
    Error,
}

/// Result of a confirmed registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSuccess {
    pub component_id: String,
    pub message: String,
    pub transaction_hash: String,
    /// Minted certificate, when enabled
    pub token_id: Option<String>,
    pub metadata_uri: Option<String>,
}

pub struct RegistrationWorkflow {
    ledger: LedgerAccessor,
    uploader: Arc<dyn MetadataUploader>,
    mints_certificate: bool,
    passphrase: String,
    phase: Mutex<RegistrationPhase>,
    in_flight: InFlight,
}

impl RegistrationWorkflow {
    pub fn new(
        ledger: LedgerAccessor,
        uploader: Arc<dyn MetadataUploader>,
        mints_certificate: bool,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            uploader,
            mints_certificate,
            passphrase: passphrase.into(),
            phase: Mutex::new(RegistrationPhase::Idle),
            in_flight: InFlight::new(),
        }
    }

    pub fn mints_certificate(&self) -> bool {
        self.mints_certificate
    }

    pub fn phase(&self) -> RegistrationPhase {
        *self.lock_phase()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_active()
    }

    fn lock_phase(&self) -> MutexGuard<'_, RegistrationPhase> {
        self.phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_phase(&self, phase: RegistrationPhase) {
        debug!("Registration phase -> {:?}", phase);
        *self.lock_phase() = phase;
    }

    /// Submit the form. On success the form is reset; on failure it is left
    /// as entered.
    pub async fn submit(
        &self,
        form: &mut RegistrationForm,
    ) -> Result<RegistrationSuccess, WorkflowError> {
        let Some(_guard) = self.in_flight.try_acquire() else {
            return Err(WorkflowError::Busy);
        };

        match self.run(form).await {
            Ok(success) => {
                form.reset();
                self.set_phase(RegistrationPhase::Success);
                Ok(success)
            }
            Err(err) => {
                warn!("Registration failed: {}", err);
                self.set_phase(RegistrationPhase::Error);
                Err(err)
            }
        }
    }

    async fn run(&self, form: &RegistrationForm) -> Result<RegistrationSuccess, WorkflowError> {
        self.set_phase(RegistrationPhase::Validating);
        self.validate(form)?;
        let record = form.record();

        if !self.mints_certificate {
            self.set_phase(RegistrationPhase::Writing);
            let receipt = self.ledger.register_component(&record).await?;
            return Ok(RegistrationSuccess {
                component_id: record.id,
                message: SUCCESS_MESSAGE.to_string(),
                transaction_hash: receipt.transaction_hash,
                token_id: None,
                metadata_uri: None,
            });
        }

        self.set_phase(RegistrationPhase::UploadingMetadata);
        let metadata = NftMetadata::for_today(&record);
        let cid = self.uploader.upload(&metadata.to_json()).await?;
        let uri = metadata_uri(&cid);

        self.set_phase(RegistrationPhase::Writing);
        let mint = self
            .ledger
            .register_component_with_metadata(&record, &uri)
            .await?;
        info!(
            "Component {} registered with certificate #{}",
            record.id, mint.token_id
        );
        Ok(RegistrationSuccess {
            component_id: record.id,
            message: format!("{} NFT #{} minted.", SUCCESS_MESSAGE, mint.token_id),
            transaction_hash: mint.transaction_hash,
            token_id: Some(mint.token_id),
            metadata_uri: Some(uri),
        })
    }

    fn validate(&self, form: &RegistrationForm) -> Result<(), WorkflowError> {
        // The passphrase is a UX gate for the shared demo form, not access control.
        if !self.mints_certificate && form.password != self.passphrase {
            return Err(WorkflowError::ValidationFailed(
                WRONG_PASSPHRASE_MESSAGE.to_string(),
            ));
        }
        if !form.has_all_fields() {
            return Err(WorkflowError::ValidationFailed(
                MISSING_FIELDS_MESSAGE.to_string(),
            ));
        }
        Ok(())
    }
}
