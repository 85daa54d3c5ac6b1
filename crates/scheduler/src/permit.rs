//! The run permit: at most one rule or rule group executes at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide IDLE/RUNNING flag.
#[derive(Debug, Clone, Default)]
pub struct RunGate {
    running: Arc<AtomicBool>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move IDLE → RUNNING, or `None` if a run is already in progress.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of holding the RUNNING state. Dropping it returns the gate to IDLE,
/// including when the run panics.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl RunPermit {
    /// Whether this permit was issued by `gate`.
    pub fn belongs_to(&self, gate: &RunGate) -> bool {
        Arc::ptr_eq(&self.running, &gate.running)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_drop() {
        let gate = RunGate::new();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_running());
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_running());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn panic_releases_permit() {
        let gate = RunGate::new();
        let g = gate.clone();
        let outcome = std::panic::catch_unwind(move || {
            let _permit = g.try_acquire().unwrap();
            panic!("rule blew up");
        });
        assert!(outcome.is_err());
        assert!(!gate.is_running());
    }

    #[test]
    fn permit_knows_its_gate() {
        let a = RunGate::new();
        let b = RunGate::new();
        let permit = a.try_acquire().unwrap();
        assert!(permit.belongs_to(&a));
        assert!(!permit.belongs_to(&b));
    }
}
