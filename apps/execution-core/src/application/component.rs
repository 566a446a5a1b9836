//! Component Lifecycle
//!
//! Engines move through `PRE_INITIALIZED → READY → RUNNING ⇄ STOPPED → DISPOSED`.
//! `reset` returns a stopped component to `READY`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::shared::DomainError;

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// Constructed, not yet wired.
    #[default]
    PreInitialized,
    /// Wired and ready to start.
    Ready,
    /// Processing commands and events.
    Running,
    /// Stopped; may be restarted or reset.
    Stopped,
    /// Released for good.
    Disposed,
}

/// Lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTrigger {
    /// Finish wiring.
    Initialize,
    /// Start processing.
    Start,
    /// Stop processing.
    Stop,
    /// Clear state for a fresh session.
    Reset,
    /// Release for good.
    Dispose,
}

impl ComponentState {
    /// State after `trigger`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when `trigger` is not allowed in this state.
    pub fn transition(self, trigger: ComponentTrigger) -> Result<Self, DomainError> {
        use ComponentState as S;
        use ComponentTrigger as T;

        match (self, trigger) {
            (S::PreInitialized, T::Initialize) => Ok(S::Ready),
            (S::Ready | S::Stopped, T::Start) => Ok(S::Running),
            (S::Running, T::Stop) => Ok(S::Stopped),
            (S::Ready | S::Stopped, T::Reset) => Ok(S::Ready),
            (S::Ready | S::Stopped, T::Dispose) => Ok(S::Disposed),
            (from, trigger) => Err(DomainError::InvalidStateTransition {
                entity: "Component".to_string(),
                from: from.to_string(),
                to: format!("{trigger:?}"),
                reason: format!("cannot {trigger:?} a {from} component"),
            }),
        }
    }

    /// Returns true while processing.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PreInitialized => "PRE_INITIALIZED",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Disposed => "DISPOSED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ComponentState::PreInitialized, ComponentTrigger::Initialize, ComponentState::Ready; "initialize")]
    #[test_case(ComponentState::Ready, ComponentTrigger::Start, ComponentState::Running; "start")]
    #[test_case(ComponentState::Running, ComponentTrigger::Stop, ComponentState::Stopped; "stop")]
    #[test_case(ComponentState::Stopped, ComponentTrigger::Start, ComponentState::Running; "restart")]
    #[test_case(ComponentState::Stopped, ComponentTrigger::Reset, ComponentState::Ready; "reset")]
    #[test_case(ComponentState::Stopped, ComponentTrigger::Dispose, ComponentState::Disposed; "dispose")]
    fn valid_transitions(from: ComponentState, trigger: ComponentTrigger, to: ComponentState) {
        assert_eq!(from.transition(trigger).unwrap(), to);
    }

    #[test_case(ComponentState::PreInitialized, ComponentTrigger::Start; "start before initialize")]
    #[test_case(ComponentState::Running, ComponentTrigger::Reset; "reset while running")]
    #[test_case(ComponentState::Running, ComponentTrigger::Dispose; "dispose while running")]
    #[test_case(ComponentState::Disposed, ComponentTrigger::Start; "start after dispose")]
    fn invalid_transitions(from: ComponentState, trigger: ComponentTrigger) {
        let err = from.transition(trigger).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn display_uses_screaming_case() {
        assert_eq!(ComponentState::PreInitialized.to_string(), "PRE_INITIALIZED");
    }
}
