// Async driver around the transition state machine.
//
// Every operation takes `&mut self`, so a workflow can never be cancelled or
// reopened while it is waiting on the mover. Dropping the submit future puts
// the form back into editing with the submission error recorded.

use statig::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::Instrument;

use super::state_machine::{State, TransitionEvent, TransitionForm};
use super::traits::{LeadMover, MoveError};
use super::types::{FieldUpdate, MoveRequest, ParseError, Stage, TransitionPayload, TransitionRequest};
use super::validation::{ValidationError, ValidationRules};
use crate::config::WorkflowConfig;
use crate::observability::{transition_metrics, OperationTimer};
use crate::telemetry::{create_transition_span, generate_correlation_id};

pub const SUBMISSION_FAILED_MESSAGE: &str = "Failed to move lead. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Editing,
    Submitting,
    Success,
    Closed,
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::Editing => "editing",
            WorkflowPhase::Submitting => "submitting",
            WorkflowPhase::Success => "success",
            WorkflowPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SubmissionFailure {
    #[error(transparent)]
    Rejected(#[from] MoveError),
    #[error("no response from mover after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to move lead. Please try again.")]
    Submission {
        #[source]
        cause: SubmissionFailure,
    },
    #[error("Cannot move a lead into {0}")]
    InvalidDestination(Stage),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Cannot {operation} while the transition is {phase}")]
    NotAllowed {
        operation: &'static str,
        phase: WorkflowPhase,
    },
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub rules: ValidationRules,
    pub auto_close_delay: Duration,
    /// `None` waits on the mover forever
    pub submit_timeout: Option<Duration>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for WorkflowSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            rules: ValidationRules {
                min_notes_length: config.min_notes_length,
            },
            auto_close_delay: Duration::from_millis(config.auto_close_delay_ms),
            submit_timeout: (config.submit_timeout_seconds > 0)
                .then(|| Duration::from_secs(config.submit_timeout_seconds)),
        }
    }
}

/// One transition form bound to the mover that applies accepted moves
pub struct TransitionWorkflow {
    machine: StateMachine<TransitionForm>,
    mover: Arc<dyn LeadMover>,
    settings: WorkflowSettings,
    correlation_id: Option<String>,
    /// Set while the machine sits in `Success`
    succeeded_at: Option<Instant>,
}

impl fmt::Debug for TransitionWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionWorkflow")
            .field("phase", &self.phase())
            .field("form", self.machine.inner())
            .field("settings", &self.settings)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl TransitionWorkflow {
    pub fn new(mover: Arc<dyn LeadMover>, settings: WorkflowSettings) -> Self {
        let machine = TransitionForm::new(settings.rules.clone()).state_machine();
        Self {
            machine,
            mover,
            settings,
            correlation_id: None,
            succeeded_at: None,
        }
    }

    /// Current phase. A success older than the auto-close delay reads as `Closed`.
    pub fn phase(&self) -> WorkflowPhase {
        match self.machine.state() {
            State::Idle {} => WorkflowPhase::Idle,
            State::Editing {} => WorkflowPhase::Editing,
            State::Submitting {} => WorkflowPhase::Submitting,
            State::Success {} if self.success_expired() => WorkflowPhase::Closed,
            State::Success {} => WorkflowPhase::Success,
            State::Closed {} => WorkflowPhase::Closed,
        }
    }

    pub fn form(&self) -> &TransitionForm {
        self.machine.inner()
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.form().validation_error()
    }

    pub fn submission_error(&self) -> Option<&str> {
        self.form().submission_error()
    }

    pub fn is_qualification_move(&self) -> bool {
        self.form().is_qualification_move()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    fn success_expired(&self) -> bool {
        self.succeeded_at
            .is_some_and(|at| at.elapsed() >= self.settings.auto_close_delay)
    }

    /// Catch the machine up with an auto-close nobody waited for
    fn close_if_expired(&mut self) {
        if self.success_expired() {
            self.finish_close();
        }
    }

    fn finish_close(&mut self) {
        self.machine.handle(&TransitionEvent::AutoCloseElapsed);
        self.succeeded_at = None;
        self.correlation_id = None;
    }

    fn require(&self, expected: WorkflowPhase, operation: &'static str) -> Result<(), WorkflowError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(WorkflowError::NotAllowed { operation, phase })
        }
    }

    /// Start a new attempt. Anything entered before is discarded.
    pub fn open(&mut self, request: TransitionRequest) -> Result<(), WorkflowError> {
        if !request.destination_stage.is_valid_destination() {
            return Err(WorkflowError::InvalidDestination(request.destination_stage));
        }
        self.close_if_expired();
        let phase = self.phase();
        if matches!(phase, WorkflowPhase::Submitting | WorkflowPhase::Success) {
            return Err(WorkflowError::NotAllowed {
                operation: "open",
                phase,
            });
        }

        let correlation_id = generate_correlation_id();
        let span = create_transition_span("open", &request.lead_name, &correlation_id);
        let _guard = span.enter();
        self.machine.handle(&TransitionEvent::Open(request));
        self.correlation_id = Some(correlation_id);
        transition_metrics().record_opened();
        Ok(())
    }

    pub fn update_field(&mut self, update: FieldUpdate) -> Result<(), WorkflowError> {
        self.require(WorkflowPhase::Editing, "update a field")?;
        self.machine.handle(&TransitionEvent::UpdateField(update));
        Ok(())
    }

    /// Field-name/string-value form of `update_field`
    pub fn update_field_raw(&mut self, field: &str, value: &str) -> Result<(), WorkflowError> {
        let update = FieldUpdate::parse(field, value)?;
        self.update_field(update)
    }

    /// Validate and hand the move to the mover.
    ///
    /// On success the workflow sits in `Success` for the auto-close delay and
    /// then counts as `Closed`; [`auto_close`](Self::auto_close) waits that out.
    /// Validation and submission errors leave it in `Editing` with the message
    /// recorded on the form.
    pub async fn submit(&mut self) -> Result<TransitionPayload, WorkflowError> {
        self.require(WorkflowPhase::Editing, "submit")?;
        let metrics = transition_metrics();

        self.machine.handle(&TransitionEvent::Submit);
        if self.phase() != WorkflowPhase::Submitting {
            metrics.record_validation_failure();
            return match self.form().validation_error() {
                Some(e) => Err(e.clone().into()),
                None => Err(WorkflowError::NotAllowed {
                    operation: "submit",
                    phase: self.phase(),
                }),
            };
        }

        let (request, payload) = match (self.form().draft().request.clone(), self.form().pending_payload().cloned()) {
            (Some(request), Some(payload)) => (request, payload),
            _ => {
                return Err(WorkflowError::NotAllowed {
                    operation: "submit",
                    phase: self.phase(),
                })
            }
        };
        let correlation_id = self
            .correlation_id
            .get_or_insert_with(generate_correlation_id)
            .clone();
        let span = create_transition_span("submit", &request.lead_name, &correlation_id);
        let move_request = MoveRequest {
            request,
            payload: payload.clone(),
            correlation_id,
        };

        metrics.record_submission();
        let TransitionWorkflow {
            machine,
            mover,
            settings,
            succeeded_at,
            ..
        } = self;
        let in_flight = InFlightSubmit::arm(machine);
        let timer = OperationTimer::new("move_lead");
        let outcome = call_mover(&**mover, settings.submit_timeout, &move_request)
            .instrument(span.clone())
            .await;
        timer.finish();

        let _guard = span.enter();
        match outcome {
            Ok(()) => {
                in_flight.resolve(&TransitionEvent::SubmissionSucceeded);
                *succeeded_at = Some(Instant::now());
                metrics.record_completed();
                Ok(payload)
            }
            Err(cause) => {
                tracing::warn!(error = %cause, "Mover did not accept transition");
                in_flight.resolve(&TransitionEvent::SubmissionFailed {
                    message: SUBMISSION_FAILED_MESSAGE.to_string(),
                });
                metrics.record_submission_failure();
                Err(WorkflowError::Submission { cause })
            }
        }
    }

    /// Wait out whatever is left of the success window, then close
    pub async fn auto_close(&mut self) -> Result<(), WorkflowError> {
        let Some(succeeded_at) = self.succeeded_at else {
            return Err(WorkflowError::NotAllowed {
                operation: "auto-close",
                phase: self.phase(),
            });
        };
        tokio::time::sleep_until(succeeded_at + self.settings.auto_close_delay).await;
        self.finish_close();
        Ok(())
    }

    pub async fn submit_and_close(&mut self) -> Result<TransitionPayload, WorkflowError> {
        let payload = self.submit().await?;
        self.auto_close().await?;
        Ok(payload)
    }

    /// Discard the attempt. Refused once a submission is in flight or has succeeded.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        self.close_if_expired();
        match self.phase() {
            WorkflowPhase::Editing => {
                self.machine.handle(&TransitionEvent::Cancel);
                self.correlation_id = None;
                transition_metrics().record_cancelled();
                Ok(())
            }
            WorkflowPhase::Idle | WorkflowPhase::Closed => Ok(()),
            phase @ (WorkflowPhase::Submitting | WorkflowPhase::Success) => {
                Err(WorkflowError::NotAllowed {
                    operation: "close",
                    phase,
                })
            }
        }
    }

    pub fn close(&mut self) -> Result<(), WorkflowError> {
        self.cancel()
    }
}

async fn call_mover(
    mover: &dyn LeadMover,
    submit_timeout: Option<Duration>,
    request: &MoveRequest,
) -> Result<(), SubmissionFailure> {
    match submit_timeout {
        Some(limit) => match tokio::time::timeout(limit, mover.move_lead(request)).await {
            Ok(result) => result.map_err(SubmissionFailure::from),
            Err(_) => Err(SubmissionFailure::TimedOut(limit)),
        },
        None => mover.move_lead(request).await.map_err(SubmissionFailure::from),
    }
}

/// Holds the machine while the mover runs. If the submit future is dropped
/// first, the form goes back to editing as a failed submission.
struct InFlightSubmit<'a> {
    machine: Option<&'a mut StateMachine<TransitionForm>>,
}

impl<'a> InFlightSubmit<'a> {
    fn arm(machine: &'a mut StateMachine<TransitionForm>) -> Self {
        Self {
            machine: Some(machine),
        }
    }

    fn resolve(mut self, event: &TransitionEvent) {
        if let Some(machine) = self.machine.take() {
            machine.handle(event);
        }
    }
}

impl Drop for InFlightSubmit<'_> {
    fn drop(&mut self) {
        if let Some(machine) = self.machine.take() {
            tracing::warn!("Submission abandoned before the mover answered");
            machine.handle(&TransitionEvent::SubmissionFailed {
                message: SUBMISSION_FAILED_MESSAGE.to_string(),
            });
            transition_metrics().record_submission_failure();
        }
    }
}
