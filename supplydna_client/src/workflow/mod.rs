//! Lookup and registration workflows
//!
//! The orchestrators compose the normalizer, ledger accessor, uploader and
//! history store. Each runs its steps strictly in sequence and refuses to
//! start while a previous invocation on the same workflow is still running.

pub mod certificate;
pub mod lookup;
pub mod registration;

use std::sync::atomic::{AtomicBool, Ordering};

pub use certificate::{CertificateResolver, CertificateView};
pub use lookup::{LookupOutcome, LookupPhase, LookupView, LookupWorkflow};
pub use registration::{
    RegistrationForm, RegistrationPhase, RegistrationSuccess, RegistrationWorkflow,
};

/// Single-flight flag for one interaction surface
#[derive(Debug, Default)]
pub struct InFlight(AtomicBool);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the surface; `None` if an invocation is already running
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(&self.0))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the surface on drop
#[derive(Debug)]
pub struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
