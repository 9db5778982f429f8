// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Deploy workflow state machine

use serde::Serialize;
use thiserror::Error;

/// A step of the deploy workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    BuildImage,
    CompilePipeline,
    SubmitRun,
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuildImage => write!(f, "building image"),
            Self::CompilePipeline => write!(f, "compiling pipeline"),
            Self::SubmitRun => write!(f, "submitting run"),
        }
    }
}

/// Where the workflow is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    BuildingImage,
    CompilingPipeline,
    SubmittingRun,
    Done,
    Failed { step: BuildStep, reason: String },
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A trigger matched
    Triggered,
    /// A trigger did not match its filter
    Ignored,
    StepSucceeded,
    StepFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid workflow transition from {from:?} on {event:?}")]
pub struct InvalidTransition {
    pub from: WorkflowState,
    pub event: WorkflowEvent,
}

impl WorkflowState {
    /// The step running in this state, if any
    pub fn step(&self) -> Option<BuildStep> {
        match self {
            Self::BuildingImage => Some(BuildStep::BuildImage),
            Self::CompilingPipeline => Some(BuildStep::CompilePipeline),
            Self::SubmittingRun => Some(BuildStep::SubmitRun),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Transition function
    pub fn next(&self, event: WorkflowEvent) -> Result<WorkflowState, InvalidTransition> {
        use WorkflowEvent as E;
        use WorkflowState as S;

        let next = match (self, &event) {
            (S::Idle, E::Triggered) => Some(S::BuildingImage),
            (S::Idle, E::Ignored) => Some(S::Idle),

            (S::BuildingImage, E::StepSucceeded) => Some(S::CompilingPipeline),
            (S::CompilingPipeline, E::StepSucceeded) => Some(S::SubmittingRun),
            (S::SubmittingRun, E::StepSucceeded) => Some(S::Done),

            (state, E::StepFailed(reason)) => state.step().map(|step| S::Failed {
                step,
                reason: reason.clone(),
            }),

            _ => None,
        };

        next.ok_or_else(|| InvalidTransition {
            from: self.clone(),
            event,
        })
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::BuildingImage => write!(f, "building image"),
            Self::CompilingPipeline => write!(f, "compiling pipeline"),
            Self::SubmittingRun => write!(f, "submitting run"),
            Self::Done => write!(f, "done"),
            Self::Failed { step, reason } => write!(f, "failed while {}: {}", step, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = WorkflowState::Idle;
        state = state.next(WorkflowEvent::Triggered).unwrap();
        assert_eq!(state, WorkflowState::BuildingImage);

        state = state.next(WorkflowEvent::StepSucceeded).unwrap();
        assert_eq!(state, WorkflowState::CompilingPipeline);

        state = state.next(WorkflowEvent::StepSucceeded).unwrap();
        assert_eq!(state, WorkflowState::SubmittingRun);

        state = state.next(WorkflowEvent::StepSucceeded).unwrap();
        assert_eq!(state, WorkflowState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_ignored_trigger_stays_idle() {
        let state = WorkflowState::Idle.next(WorkflowEvent::Ignored).unwrap();
        assert_eq!(state, WorkflowState::Idle);
    }

    #[test]
    fn test_failure_records_step() {
        let state = WorkflowState::CompilingPipeline
            .next(WorkflowEvent::StepFailed("missing PROJECT_ID".into()))
            .unwrap();

        assert_eq!(
            state,
            WorkflowState::Failed {
                step: BuildStep::CompilePipeline,
                reason: "missing PROJECT_ID".into()
            }
        );
        assert_eq!(
            state.to_string(),
            "failed while compiling pipeline: missing PROJECT_ID"
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(WorkflowState::Idle.next(WorkflowEvent::StepSucceeded).is_err());
        assert!(WorkflowState::Idle
            .next(WorkflowEvent::StepFailed("x".into()))
            .is_err());
        assert!(WorkflowState::Done.next(WorkflowEvent::Triggered).is_err());
        assert!(WorkflowState::BuildingImage
            .next(WorkflowEvent::Ignored)
            .is_err());

        let failed = WorkflowState::Failed {
            step: BuildStep::SubmitRun,
            reason: "x".into(),
        };
        assert!(failed.next(WorkflowEvent::StepSucceeded).is_err());
    }
}
