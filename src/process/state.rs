// src/process/state.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{ProcessingError, ProcessingErrorKind};

/// Where a processing run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Loaded,
    Preprocessed,
    Balanced,
    FeatureSelected,
    Aligned,
    Saved,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Idle => "Idle",
            Stage::Loaded => "Loaded",
            Stage::Preprocessed => "Preprocessed",
            Stage::Balanced => "Balanced",
            Stage::FeatureSelected => "FeatureSelected",
            Stage::Aligned => "Aligned",
            Stage::Saved => "Saved",
            Stage::Done => "Done",
            Stage::Failed => "Failed",
        }
    }

    /// The only stage a successful step may move to.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Loaded),
            Stage::Loaded => Some(Stage::Preprocessed),
            Stage::Preprocessed => Some(Stage::Balanced),
            Stage::Balanced => Some(Stage::FeatureSelected),
            Stage::FeatureSelected => Some(Stage::Aligned),
            Stage::Aligned => Some(Stage::Saved),
            Stage::Saved => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// One recorded move of the state machine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
    pub at: DateTime<Utc>,
}

/// Linear state machine for a single processing run. Any non-terminal
/// stage may fail; everything else must follow [`Stage::next`].
#[derive(Clone, Debug)]
pub struct PipelineState {
    current: Stage,
    history: Vec<Transition>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    #[track_caller]
    pub fn advance(&mut self, to: Stage) -> Result<(), ProcessingError> {
        let allowed = match to {
            Stage::Failed => !self.current.is_terminal(),
            _ => self.current.next() == Some(to),
        };
        if !allowed {
            return Err(ProcessingError::new(
                ProcessingErrorKind::InvalidTransition,
                format!("cannot move from {} to {}", self.current.as_str(), to.as_str()),
            ));
        }

        self.history.push(Transition {
            from: self.current,
            to,
            at: Utc::now(),
        });
        self.current = to;
        Ok(())
    }

    /// Move to [`Stage::Failed`] unless already terminal, in which case the
    /// stage is kept and the refusal is logged at debug level.
    pub fn fail(&mut self) {
        if let Err(e) = self.advance(Stage::Failed) {
            debug!(stage = self.current.as_str(), "run not marked failed: {}", e);
        }
    }
}
