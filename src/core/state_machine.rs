//! State machine tracking the progress of one rescope run
//!
//! State lives in memory only; every run starts from `Init`.

use crate::core::error::RescopeError;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::info;

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Installing,
    RescopingNames,
    ReinstallingOptional,
    RewritingDependents,
    RunningPrePublishHooks,
    Publishing,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub from: RunState,
    pub to: RunState,
    pub timestamp: DateTime<Utc>,

    /// Directory or error the transition relates to
    pub detail: Option<String>,
}

/// State machine for tracking the rescope workflow
#[derive(Debug)]
pub struct RunStateMachine {
    current_state: RunState,
    transitions: Vec<StateTransition>,
    error: Option<String>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: RunState::Init,
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, to: RunState, detail: Option<String>) {
        info!(
            from = %self.current_state,
            to = %to,
            detail = detail.as_deref().unwrap_or(""),
            "state transition"
        );

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
            detail,
        });
        self.current_state = to;
    }

    /// Record `error` and move to `Failed`
    pub fn fail(&mut self, error: &RescopeError) {
        let message = error.to_string();
        self.error = Some(message.clone());
        self.transition(RunState::Failed, Some(message));
    }

    pub fn get_state(&self) -> RunState {
        self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Milliseconds between the first and the last transition
    pub fn get_elapsed_time(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let detail = t
                    .detail
                    .as_ref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default();
                format!("{}: {} → {}{}", time, t.from, t.to, detail)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
