//! In-flight guard: at most one concurrent sync attempt per fingerprint.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::models::Fingerprint;

/// Returned by [`InFlightGuard::acquire`] when another attempt holds the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is already being synchronized")]
pub struct AlreadyInProgress(pub String);

/// Process-local set of fingerprints currently being synchronized.
///
/// Acquiring is a non-blocking check-and-set: a second attempt on the same
/// fingerprint is rejected, never queued. Cloning shares the same set.
#[derive(Clone, Default)]
pub struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl InFlightGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `fingerprint` for the lifetime of the returned permit.
    pub fn acquire(&self, fingerprint: &Fingerprint) -> Result<InFlightPermit, AlreadyInProgress> {
        let key = fingerprint.to_string();
        if !self.lock().insert(key.clone()) {
            return Err(AlreadyInProgress(key));
        }
        Ok(InFlightPermit {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }

    pub fn is_in_flight(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().contains(&fingerprint.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the set half-updated.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for InFlightGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InFlightGuard")
            .field("in_flight", &self.len())
            .finish()
    }
}

/// Proof that a fingerprint is claimed. Dropping it releases the claim on
/// every exit path, including errors and unwinding panics.
#[must_use = "the fingerprint is released as soon as the permit is dropped"]
pub struct InFlightPermit {
    in_flight: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightPermit {
    /// Release explicitly; equivalent to dropping the permit.
    pub fn release(self) {}
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl fmt::Debug for InFlightPermit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InFlightPermit")
            .field("fingerprint", &self.key)
            .finish()
    }
}
