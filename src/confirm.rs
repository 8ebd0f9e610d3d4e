//! Confirmation Gate: `Idle -> AwaitingConfirmation -> Idle`.
//!
//! The only way to obtain a [`ConfirmedAction`], and therefore the only way
//! to reach the Mutation Coordinator, is to confirm the action the gate is
//! currently awaiting.

use tracing::{debug, info};

use crate::error::MutationError;
use crate::mutation::{Operation, PendingAction, Target};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Idle,
    AwaitingConfirmation(PendingAction),
}

/// Proof that the user confirmed this exact action.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfirmedAction {
    action: PendingAction,
}

impl ConfirmedAction {
    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    pub(crate) fn into_action(self) -> PendingAction {
        self.action
    }
}

#[derive(Debug, Default)]
pub struct ConfirmationGate {
    state: GateState,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GateState::Idle
    }

    pub fn awaiting(&self) -> Option<&PendingAction> {
        match &self.state {
            GateState::AwaitingConfirmation(action) => Some(action),
            GateState::Idle => None,
        }
    }

    /// Opens the prompt for `operation` on `target`, replacing any prompt
    /// that was still open.
    pub fn request(&mut self, operation: Operation, target: Target) -> PendingAction {
        let action = PendingAction::new(operation, target);
        if let GateState::AwaitingConfirmation(previous) = &self.state {
            debug!(replaced = %previous.id, "Replacing unanswered confirmation");
        }
        info!(action_id = %action.id, prompt = %action.prompt(), "Awaiting confirmation");

        self.state = GateState::AwaitingConfirmation(action.clone());
        action
    }

    /// Closes the prompt without side effects.
    pub fn cancel(&mut self) -> Option<PendingAction> {
        match std::mem::take(&mut self.state) {
            GateState::AwaitingConfirmation(action) => {
                info!(action_id = %action.id, "Confirmation cancelled");
                Some(action)
            }
            GateState::Idle => None,
        }
    }

    /// Confirms the awaited action and returns to `Idle`.
    pub fn confirm(&mut self) -> Result<ConfirmedAction, MutationError> {
        match std::mem::take(&mut self.state) {
            GateState::AwaitingConfirmation(action) => {
                info!(action_id = %action.id, "Action confirmed");
                Ok(ConfirmedAction { action })
            }
            GateState::Idle => Err(MutationError::NothingToConfirm),
        }
    }
}

#[cfg(test)]
#[path = "tests/confirm_tests.rs"]
mod tests;
