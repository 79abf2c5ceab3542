//! Finite state machines for the deploy and create pipelines
//!
//! Both pipelines are linear: every stage may only advance to its successor
//! (with the optional stages allowed to be skipped) or fail. There is no way
//! back; a failed pipeline stays failed.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// A pipeline stage
pub trait Stage: Copy + Eq + Debug {
    /// Stage before anything ran
    const INITIAL: Self;

    /// Whether `next` may directly follow `self`
    fn can_advance_to(self, next: Self) -> bool;

    /// Done or failed
    fn is_terminal(self) -> bool;

    /// Failure stage
    fn failed() -> Self;
}

/// Stages of `deploy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    Pending,
    CleanPriorArtifact,
    ExternalBuild,
    LuisPublish,
    Package,
    Upload,
    Done,
    Failed,
}

impl Stage for DeployStage {
    const INITIAL: Self = DeployStage::Pending;

    fn can_advance_to(self, next: Self) -> bool {
        use DeployStage::*;
        matches!(
            (self, next),
            (Pending, CleanPriorArtifact)
                | (CleanPriorArtifact, ExternalBuild)
                | (ExternalBuild, LuisPublish)
                | (ExternalBuild, Package)
                | (LuisPublish, Package)
                | (Package, Upload)
                | (Upload, Done)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, DeployStage::Done | DeployStage::Failed)
    }

    fn failed() -> Self {
        DeployStage::Failed
    }
}

/// Stages of `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStage {
    Pending,
    ResolveTenant,
    EnsureAppRegistration,
    CreateResourceGroup,
    BuildParameters,
    ValidateTemplate,
    ApplyTemplate,
    LinkTelemetry,
    PersistOutputs,
    Done,
    Failed,
}

impl Stage for ProvisionStage {
    const INITIAL: Self = ProvisionStage::Pending;

    fn can_advance_to(self, next: Self) -> bool {
        use ProvisionStage::*;
        matches!(
            (self, next),
            (Pending, ResolveTenant)
                | (ResolveTenant, EnsureAppRegistration)
                | (EnsureAppRegistration, CreateResourceGroup)
                | (CreateResourceGroup, BuildParameters)
                | (BuildParameters, ValidateTemplate)
                | (ValidateTemplate, ApplyTemplate)
                | (ApplyTemplate, LinkTelemetry)
                | (ApplyTemplate, PersistOutputs)
                | (LinkTelemetry, PersistOutputs)
                | (PersistOutputs, Done)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, ProvisionStage::Done | ProvisionStage::Failed)
    }

    fn failed() -> Self {
        ProvisionStage::Failed
    }
}

/// Pipeline event
#[derive(Debug, Clone)]
pub enum StageEvent<S> {
    /// Move on to a stage
    Advance(S),

    /// The current stage failed
    Fail(String),
}

/// Linear pipeline FSM
#[derive(Debug, Clone)]
pub struct StageFsm<S: Stage> {
    stage: S,
    error: Option<String>,
    history: Vec<S>,
}

impl<S: Stage> StageFsm<S> {
    /// Create a new FSM in the initial stage
    pub fn new() -> Self {
        Self {
            stage: S::INITIAL,
            error: None,
            history: vec![S::INITIAL],
        }
    }

    /// Get current stage
    pub fn stage(&self) -> S {
        self.stage
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every stage visited, in order
    pub fn history(&self) -> &[S] {
        &self.history
    }

    /// Process an event and transition
    pub fn process(&mut self, event: StageEvent<S>) -> Result<(), DeployError> {
        let next = match (&self.stage, &event) {
            (stage, _) if stage.is_terminal() => {
                return Err(DeployError::InvalidTransition(format!(
                    "{:?} is terminal, got {:?}",
                    stage, event
                )));
            }
            (_, StageEvent::Fail(err)) => {
                self.error = Some(err.clone());
                S::failed()
            }
            (stage, StageEvent::Advance(next)) if stage.can_advance_to(*next) => *next,
            (stage, event) => {
                return Err(DeployError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    stage, event
                )));
            }
        };

        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    /// Shorthand for `process(StageEvent::Advance(next))`
    pub fn advance(&mut self, next: S) -> Result<(), DeployError> {
        self.process(StageEvent::Advance(next))
    }

    /// Record a failure; a pipeline that already ended is left as is
    pub fn fail(&mut self, error: &DeployError) {
        if !self.stage.is_terminal() {
            let _ = self.process(StageEvent::Fail(error.to_string()));
        }
    }
}

impl<S: Stage> Default for StageFsm<S> {
    fn default() -> Self {
        Self::new()
    }
}
