use crate::PipState;
use std::fmt;

#[derive(Debug, Clone)]
pub struct StateTransitionError {
    from: PipState,
    to: PipState,
    message: String,
}

impl fmt::Display for StateTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid state transition from {:?} to {:?}: {}",
            self.from, self.to, self.message
        )
    }
}

impl std::error::Error for StateTransitionError {}

/// State machine for the PiP session lifecycle with validation
pub struct PipStateMachine {
    current_state: PipState,
}

impl Default for PipStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: PipState::Idle,
        }
    }

    pub fn current(&self) -> PipState {
        self.current_state
    }

    /// Validate and perform state transition
    pub fn transition_to(&mut self, new_state: PipState) -> Result<(), StateTransitionError> {
        if self.is_valid_transition(self.current_state, new_state) {
            log::debug!(
                "[FLOW] PiP state transition: {:?} -> {:?}",
                self.current_state,
                new_state
            );
            let old_state = self.current_state;
            self.current_state = new_state;

            match (old_state, new_state) {
                (PipState::Active, PipState::Entering) => {
                    log::info!("[FLOW] Replacing active PiP session with a new target");
                }
                (PipState::Exiting, PipState::Active) => {
                    log::warn!("[FLOW] Exit refused, PiP surface is still up");
                }
                _ => {}
            }

            Ok(())
        } else {
            log::debug!(
                "[FLOW] PiP state transition INVALID: {:?} -> {:?}",
                self.current_state,
                new_state
            );
            Err(StateTransitionError {
                from: self.current_state,
                to: new_state,
                message: "Transition not allowed by state machine rules".to_string(),
            })
        }
    }

    /// Check if a state transition is valid
    fn is_valid_transition(&self, from: PipState, to: PipState) -> bool {
        match (from, to) {
            (PipState::Idle, PipState::Idle) => true,
            (PipState::Idle, PipState::Entering) => true,

            // Acknowledged, or refused by the native layer
            (PipState::Entering, PipState::Active) => true,
            (PipState::Entering, PipState::Idle) => true,

            (PipState::Active, PipState::Exiting) => true,
            (PipState::Active, PipState::Entering) => true, // Replace target

            (PipState::Exiting, PipState::Idle) => true,
            (PipState::Exiting, PipState::Active) => true, // Exit refused

            // A second request while one is in flight is never valid
            _ => false,
        }
    }

    /// Entry or exit acknowledgment pending
    pub fn is_in_flight(&self) -> bool {
        matches!(self.current_state, PipState::Entering | PipState::Exiting)
    }

    /// Reset to idle state (useful for error recovery)
    pub fn reset(&mut self) {
        log::info!("Resetting PiP state machine to Idle from {:?}", self.current_state);
        self.current_state = PipState::Idle;
    }
}
