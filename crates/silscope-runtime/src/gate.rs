//! Process-wide admission gate.
//!
//! Every compiler process must hold a permit from the gate for as long as it
//! runs. The gate is shared by all in-flight requests and is the only mutable
//! state they share. Permits are RAII guards: dropping one (normal exit,
//! timeout or a cancelled request) returns it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::GateError;

type GateResult<T> = std::result::Result<T, GateError>;

/// Counting gate limiting concurrently running compiler processes.
pub struct AdmissionGate {
    /// Semaphore holding one permit per allowed process.
    semaphore: Arc<Semaphore>,

    /// Maximum number of concurrent processes.
    capacity: usize,

    /// Current number of admitted processes (approximate).
    in_flight: Arc<AtomicUsize>,

    /// Set once the gate is closed; acquires fail from then on.
    closed: Arc<AtomicBool>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` processes at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wait for a permit.
    pub async fn acquire(&self) -> GateResult<AdmissionPermit> {
        self.handle().acquire().await
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        self.handle().try_acquire()
    }

    /// Stop admitting processes. Pending and future acquires fail with
    /// [`GateError::Closed`]; permits already held stay valid.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of free permits (approximate under contention).
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of admitted processes (approximate under contention).
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cloneable handle sharing this gate's permits.
    pub fn handle(&self) -> AdmissionGateHandle {
        AdmissionGateHandle {
            semaphore: Arc::clone(&self.semaphore),
            in_flight: Arc::clone(&self.in_flight),
            closed: Arc::clone(&self.closed),
        }
    }
}

/// RAII guard for an admitted process.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Cloneable handle to an [`AdmissionGate`].
#[derive(Clone)]
pub struct AdmissionGateHandle {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl AdmissionGateHandle {
    /// Wait for a permit (see [`AdmissionGate::acquire`]).
    pub async fn acquire(&self) -> GateResult<AdmissionPermit> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GateError::Closed);
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;

        Ok(self.admit(permit))
    }

    /// Take a permit without waiting.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }

        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        Some(self.admit(permit))
    }

    /// Close the underlying gate.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        AdmissionPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_gate_creation() {
        let gate = AdmissionGate::new(4);
        assert_eq!(gate.capacity(), 4);
        assert_eq!(gate.available_permits(), 4);
        assert_eq!(gate.in_flight_count(), 0);
        assert!(!gate.is_closed());
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = AdmissionGate::new(2);

        let first = gate.acquire().await.expect("first permit");
        let second = gate.acquire().await.expect("second permit");
        assert_eq!(gate.in_flight_count(), 2);
        assert_eq!(gate.available_permits(), 0);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.in_flight_count(), 1);
        assert_eq!(gate.available_permits(), 1);

        drop(second);
        assert_eq!(gate.in_flight_count(), 0);
        assert_eq!(gate.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_close_rejects_waiters_and_new_acquires() {
        let gate = Arc::new(AdmissionGate::new(1));
        let held = gate.acquire().await.expect("permit");

        let waiter = {
            let handle = gate.handle();
            tokio::spawn(async move { handle.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.close();
        assert!(matches!(waiter.await.unwrap(), Err(GateError::Closed)));
        assert!(matches!(gate.acquire().await, Err(GateError::Closed)));
        assert!(gate.try_acquire().is_none());

        // Held permits survive closing.
        assert_eq!(gate.in_flight_count(), 1);
        drop(held);
        assert_eq!(gate.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_blocked_acquire_resumes_on_release() {
        let gate = AdmissionGate::new(1);
        let permit = gate.acquire().await.expect("permit");

        let handle = gate.handle();
        let waiter = tokio::spawn(async move { handle.acquire().await.map(|_| ()) });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_handles_share_counters() {
        let gate = AdmissionGate::new(3);
        let a = gate.handle();
        let b = a.clone();

        let permit = a.acquire().await.expect("permit");
        assert_eq!(b.in_flight_count(), 1);
        assert_eq!(gate.available_permits(), 2);

        drop(permit);
        assert_eq!(b.in_flight_count(), 0);

        b.close();
        assert!(gate.is_closed());
    }
}
