use crate::state::session::Session;
use crate::state_machine::{PipStateMachine, StateTransitionError};
use crate::PipState;
use std::sync::{Arc, Mutex, MutexGuard};

/// Couples the state machine with the session data it guards so a
/// transition and the matching session mutation happen under one lock.
#[derive(Clone)]
pub struct UnifiedSessionState {
    inner: Arc<Mutex<UnifiedStateInner>>,
}

struct UnifiedStateInner {
    machine: PipStateMachine,
    session: Session,
}

impl Default for UnifiedSessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifiedSessionState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(UnifiedStateInner {
                machine: PipStateMachine::new(),
                session: Session::default(),
            })),
        }
    }

    /// Transition to a new state atomically
    pub fn transition_to(&self, new_state: PipState) -> Result<(), StateTransitionError> {
        self.transition_with(new_state, |_| {})
    }

    /// Transition and, only if the transition is valid, update the session
    pub fn transition_with<F>(&self, new_state: PipState, update: F) -> Result<(), StateTransitionError>
    where
        F: FnOnce(&mut Session),
    {
        let mut guard = self.lock_or_recover();
        guard.machine.transition_to(new_state)?;
        update(&mut guard.session);
        Ok(())
    }

    /// Get current state
    pub fn current(&self) -> PipState {
        self.lock_or_recover().machine.current()
    }

    /// Entry or exit acknowledgment pending
    pub fn is_in_flight(&self) -> bool {
        self.lock_or_recover().machine.is_in_flight()
    }

    /// Read from the session without changing state
    pub fn with_session<T>(&self, read: impl FnOnce(PipState, &Session) -> T) -> T {
        let guard = self.lock_or_recover();
        read(guard.machine.current(), &guard.session)
    }

    /// Drop every session reference and go to Idle. Returns the old session.
    pub fn finish(&self) -> Session {
        let mut guard = self.lock_or_recover();
        if guard.machine.transition_to(PipState::Idle).is_err() {
            guard.machine.reset();
        }
        std::mem::take(&mut guard.session)
    }

    /// Lock the state, recovering from poison if necessary
    fn lock_or_recover(&self) -> MutexGuard<'_, UnifiedStateInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Recovering from poisoned mutex in UnifiedSessionState");
                poisoned.into_inner()
            }
        }
    }
}
