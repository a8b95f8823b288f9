use crate::error::AppError;
use parking_lot::RwLock;
use std::sync::Arc;

/// Session-level voice phase. At most one of Listening/Speaking is ever
/// current, and the coordinator owns all transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Listening,
    Processing,
    Speaking,
}

/// Tone of the voice status line, mapped to a fixed color per tone in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Listening,
    Processing,
    Speaking,
    Error,
}

#[derive(Clone)]
pub struct SessionStateManager {
    phase: Arc<RwLock<SessionPhase>>,
}

impl Default for SessionStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateManager {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(RwLock::new(SessionPhase::Idle)),
        }
    }

    /// Moves to `next`, rejecting transitions the session flow never takes.
    /// Re-entering the current phase is a no-op.
    pub fn transition(&self, next: SessionPhase) -> Result<(), AppError> {
        let mut current = self.phase.write();

        if *current == next {
            return Ok(());
        }

        let valid = matches!(
            (&*current, &next),
            (SessionPhase::Idle, SessionPhase::Listening)
                | (SessionPhase::Idle, SessionPhase::Processing)
                | (SessionPhase::Idle, SessionPhase::Speaking)
                | (SessionPhase::Listening, SessionPhase::Idle)
                | (SessionPhase::Listening, SessionPhase::Processing)
                | (SessionPhase::Processing, SessionPhase::Idle)
                | (SessionPhase::Processing, SessionPhase::Speaking)
                | (SessionPhase::Speaking, SessionPhase::Idle)
        );

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid phase transition: {:?} -> {:?}",
                *current, next
            )));
        }

        tracing::debug!("Session phase: {:?} -> {:?}", *current, next);
        *current = next;
        Ok(())
    }

    pub fn current(&self) -> SessionPhase {
        *self.phase.read()
    }
}
