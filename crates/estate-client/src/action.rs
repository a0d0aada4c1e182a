//! Per-trigger `Idle -> InFlight -> Idle` tracking.
//!
//! The client itself never refuses a second call. Preventing re-entry is the
//! caller's job: hold an [`InFlightGuard`] for the duration of the call and keep
//! the triggering control disabled while [`ActionSlot::is_enabled`] is false.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    InFlight,
}

#[derive(Debug, Clone, Default)]
pub struct ActionSlot {
    in_flight: Arc<AtomicBool>,
}

impl ActionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActionState {
        if self.in_flight.load(Ordering::Acquire) {
            ActionState::InFlight
        } else {
            ActionState::Idle
        }
    }

    /// Whether the control bound to this slot should accept input.
    pub fn is_enabled(&self) -> bool {
        self.state() == ActionState::Idle
    }

    /// Claim the slot. Returns `None` while another call holds it.
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }
}

/// Returns the slot to `Idle` when dropped, on every exit path.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_while_in_flight() {
        let slot = ActionSlot::new();
        let guard = slot.try_begin().expect("idle slot can be claimed");
        assert_eq!(slot.state(), ActionState::InFlight);
        assert!(!slot.is_enabled());
        assert!(slot.try_begin().is_none());

        drop(guard);
        assert!(slot.is_enabled());
        assert!(slot.try_begin().is_some());
    }

    #[test]
    fn guard_releases_on_panic_unwind() {
        let slot = ActionSlot::new();
        let cloned = slot.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.try_begin().expect("claim");
            panic!("handler blew up");
        });
        assert!(result.is_err());
        assert_eq!(slot.state(), ActionState::Idle);
    }
}
