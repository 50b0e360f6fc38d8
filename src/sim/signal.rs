//! Wave completion signals
//!
//! A signal settles exactly once: resolved when the collection it watches
//! empties, or rejected when the level is abandoned. Clones share state, so the
//! orchestrator can hand one to the enemy system and keep one for itself.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Pending,
    Resolved,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CompletionSignal {
    name: &'static str,
    state: Rc<Cell<SignalState>>,
}

impl CompletionSignal {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Rc::new(Cell::new(SignalState::Pending)),
        }
    }

    /// Resolve. Returns true only if this call moved the signal out of pending,
    /// so continuations run once and never after a rejection.
    pub fn resolve(&self) -> bool {
        self.settle(SignalState::Resolved)
    }

    /// Reject. Returns true only if this call moved the signal out of pending.
    pub fn reject(&self) -> bool {
        self.settle(SignalState::Rejected)
    }

    fn settle(&self, to: SignalState) -> bool {
        if self.state.get() != SignalState::Pending {
            return false;
        }
        log::debug!("signal '{}' {:?}", self.name, to);
        self.state.set(to);
        true
    }

    pub fn state(&self) -> SignalState {
        self.state.get()
    }

    pub fn is_settled(&self) -> bool {
        self.state.get() != SignalState::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.state.get() == SignalState::Resolved
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The pair of signals produced by starting a level
#[derive(Debug, Clone)]
pub struct WaveSignals {
    /// Resolves when every asteroid, split children included, is gone
    pub asteroids_cleared: CompletionSignal,
    /// Resolves when the enemy wave is told the level is ending and no craft remain
    pub ufos_cleared: CompletionSignal,
}

impl WaveSignals {
    pub fn new() -> Self {
        Self {
            asteroids_cleared: CompletionSignal::new("asteroids cleared"),
            ufos_cleared: CompletionSignal::new("ufos cleared"),
        }
    }

    /// Reject whatever is still pending
    pub fn reject_pending(&self) {
        self.asteroids_cleared.reject();
        self.ufos_cleared.reject();
    }
}

impl Default for WaveSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_once() {
        let s = CompletionSignal::new("test");
        assert!(s.resolve());
        assert!(!s.resolve());
        assert!(!s.reject());
        assert_eq!(s.state(), SignalState::Resolved);
    }

    #[test]
    fn test_rejected_never_resolves() {
        let s = CompletionSignal::new("test");
        assert!(s.reject());
        assert!(!s.resolve());
        assert!(!s.is_resolved());
        assert!(s.is_settled());
    }

    #[test]
    fn test_clones_share_state() {
        let s = CompletionSignal::new("test");
        let other = s.clone();
        other.resolve();
        assert!(s.is_resolved());
    }

    #[test]
    fn test_reject_pending_leaves_resolved_alone() {
        let w = WaveSignals::new();
        w.asteroids_cleared.resolve();
        w.reject_pending();
        assert_eq!(w.asteroids_cleared.state(), SignalState::Resolved);
        assert_eq!(w.ufos_cleared.state(), SignalState::Rejected);
    }
}
