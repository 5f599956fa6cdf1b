//! Two-phase component validation.
//!
//! Component code is sent once to a [`ComponentValidator`], which answers with
//! a `{typecheck, serialize}` pair. The [`ValidationPipeline`] surfaces that
//! answer as two sequential [`ValidationStep`]s so a UI can show progress:
//!
//! ```text
//! Type Check     pending -> loading -> success | failed
//! Serialization  pending -> loading -> success | failed   (only after step 1 succeeds)
//! ```
//!
//! A failed step stops the sequence and reports once through
//! [`ValidationObserver::on_failed`]. Two successes report once through
//! [`ValidationObserver::on_completed`]. Every run takes a
//! [`CancellationToken`]; a cancelled run stops at its next suspension point
//! and reports nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use crayon_config::ValidationConfig;
//! use crayon_core::http::HttpComponentValidator;
//! use crayon_core::validation::{NoopObserver, ValidationController, ValidationPipeline};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = ValidationConfig::default();
//! let validator = Arc::new(HttpComponentValidator::new(&config));
//! let controller = ValidationController::new(ValidationPipeline::new(validator, &config));
//!
//! let report = controller.validate("export const App = () => null", &mut NoopObserver).await;
//! println!("{:?}", report.outcome);
//! # }
//! ```

use async_trait::async_trait;
use crayon_config::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// Steps
// ============================================================================

/// Status of one validation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Loading,
    Success,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// One row of the validation progress indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStep {
    pub title: String,
    pub description: String,
    pub status: StepStatus,
}

impl ValidationStep {
    fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            status: StepStatus::Pending,
        }
    }

    /// The two steps every run goes through, both pending
    pub fn initial() -> Vec<ValidationStep> {
        vec![
            Self::new("Type Check", "Validating component structure and syntax"),
            Self::new("Serialization", "Verifying component can be serialized properly"),
        ]
    }
}

// ============================================================================
// Validator seam
// ============================================================================

/// Answer of the validation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub typecheck: bool,
    pub serialize: bool,
}

/// Errors talking to the validation service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Validation request failed: {0}")]
    Transport(String),

    #[error("Validator answered with status {0}")]
    Status(u16),

    #[error("Could not decode validator response: {0}")]
    Decode(String),

    /// Payload carried none of `isValid`, `json` or `stateManager`
    #[error("Validator response carried no recognisable result")]
    UnexpectedPayload,
}

/// External service that type-checks and serializes component code
#[async_trait]
pub trait ComponentValidator: Send + Sync {
    async fn validate(&self, component_code: &str) -> Result<ValidationResult, ValidationError>;
}

// ============================================================================
// Observer
// ============================================================================

/// Receives progress of a validation run. All methods default to no-ops.
pub trait ValidationObserver: Send {
    fn on_step_changed(&mut self, _index: usize, _step: &ValidationStep) {}

    /// Both steps succeeded
    fn on_completed(&mut self) {}

    /// A step failed; fires at most once per run
    fn on_failed(&mut self, _reason: &FailureReason) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ValidationObserver for NoopObserver {}

/// Why a run failed
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The validator rejected the code at step `step`
    StepFailed { step: usize },
    /// The validator could not be reached or understood
    Error(ValidationError),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StepFailed { step } => write!(f, "validation step {} failed", step + 1),
            Self::Error(e) => write!(f, "{}", e),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Completed,
    Failed(FailureReason),
    Cancelled,
}

/// Final step states and outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub steps: Vec<ValidationStep>,
    pub outcome: ValidationOutcome,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.outcome == ValidationOutcome::Completed
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives the two validation steps for one piece of component code
#[derive(Clone)]
pub struct ValidationPipeline {
    validator: Arc<dyn ComponentValidator>,
    first_step_delay: Duration,
    step_delay: Duration,
    completion_delay: Duration,
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("first_step_delay", &self.first_step_delay)
            .field("step_delay", &self.step_delay)
            .field("completion_delay", &self.completion_delay)
            .finish_non_exhaustive()
    }
}

/// Progress of one run; owns the steps and forwards changes to the observer
struct Run<'a> {
    steps: Vec<ValidationStep>,
    observer: &'a mut dyn ValidationObserver,
}

impl Run<'_> {
    fn set(&mut self, index: usize, status: StepStatus) {
        let step = &mut self.steps[index];
        step.status = status;
        debug!("Validation step '{}' -> {:?}", step.title, status);
        self.observer.on_step_changed(index, step);
    }

    fn fail(mut self, index: usize, reason: FailureReason) -> ValidationReport {
        self.set(index, StepStatus::Failed);
        warn!("Validation failed: {}", reason);
        self.observer.on_failed(&reason);
        ValidationReport {
            steps: self.steps,
            outcome: ValidationOutcome::Failed(reason),
        }
    }

    fn cancelled(self) -> ValidationReport {
        debug!("Validation run cancelled");
        ValidationReport {
            steps: self.steps,
            outcome: ValidationOutcome::Cancelled,
        }
    }
}

impl ValidationPipeline {
    pub fn new(validator: Arc<dyn ComponentValidator>, config: &ValidationConfig) -> Self {
        Self {
            validator,
            first_step_delay: config.first_step_delay(),
            step_delay: config.step_delay(),
            completion_delay: config.completion_delay(),
        }
    }

    /// Override the pacing delays
    pub fn with_delays(
        mut self,
        first_step_delay: Duration,
        step_delay: Duration,
        completion_delay: Duration,
    ) -> Self {
        self.first_step_delay = first_step_delay;
        self.step_delay = step_delay;
        self.completion_delay = completion_delay;
        self
    }

    /// Validate `code`, reporting progress to `observer`
    pub async fn run(
        &self,
        code: &str,
        cancel: &CancellationToken,
        observer: &mut dyn ValidationObserver,
    ) -> ValidationReport {
        let mut run = Run {
            steps: ValidationStep::initial(),
            observer,
        };

        info!("Validating {} bytes of component code", code.len());
        run.set(0, StepStatus::Loading);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return run.cancelled(),
            result = self.validator.validate(code) => result,
        };
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                error!("Validator error: {}", e);
                return run.fail(0, FailureReason::Error(e));
            }
        };
        debug!(
            "Validator answered typecheck={} serialize={}",
            result.typecheck, result.serialize
        );

        if !self.pause(self.first_step_delay, cancel).await {
            return run.cancelled();
        }
        if !result.typecheck {
            return run.fail(0, FailureReason::StepFailed { step: 0 });
        }
        run.set(0, StepStatus::Success);

        run.set(1, StepStatus::Loading);
        if !self.pause(self.step_delay, cancel).await {
            return run.cancelled();
        }
        if !result.serialize {
            return run.fail(1, FailureReason::StepFailed { step: 1 });
        }
        run.set(1, StepStatus::Success);

        if !self.pause(self.completion_delay, cancel).await {
            return run.cancelled();
        }
        info!("Validation completed");
        run.observer.on_completed();
        ValidationReport {
            steps: run.steps,
            outcome: ValidationOutcome::Completed,
        }
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Runs validations so that at most one is live: starting a run cancels the
/// one before it.
#[derive(Debug)]
pub struct ValidationController {
    pipeline: ValidationPipeline,
    current: Mutex<Option<CancellationToken>>,
}

impl ValidationController {
    pub fn new(pipeline: ValidationPipeline) -> Self {
        Self {
            pipeline,
            current: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &ValidationPipeline {
        &self.pipeline
    }

    /// Cancel any live run and hand out the token for a new one
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(token.clone()) {
            if !previous.is_cancelled() {
                debug!("Superseding previous validation run");
            }
            previous.cancel();
        }
        token
    }

    /// Cancel the live run, if any
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.take() {
            token.cancel();
        }
    }

    /// Start a run, superseding the previous one
    pub async fn validate(
        &self,
        code: &str,
        observer: &mut dyn ValidationObserver,
    ) -> ValidationReport {
        let token = self.begin();
        self.pipeline.run(code, &token, observer).await
    }
}
