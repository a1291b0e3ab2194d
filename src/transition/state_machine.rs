use statig::prelude::*;

use super::types::{FieldUpdate, LeadTransition, TransitionPayload, TransitionRequest};
use super::validation::{validate, ValidationError, ValidationRules};

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent {
    Open(TransitionRequest),
    UpdateField(FieldUpdate),
    Submit,
    SubmissionSucceeded,
    SubmissionFailed { message: String },
    AutoCloseElapsed,
    Cancel,
}

/// Form state driven by the transition state machine.
///
/// The machine only ever owns one attempt. Opening again discards whatever was
/// entered before.
#[derive(Debug, Default)]
pub struct TransitionForm {
    draft: LeadTransition,
    rules: ValidationRules,
    validation_error: Option<ValidationError>,
    submission_error: Option<String>,
    pending: Option<TransitionPayload>,
    submitted: Option<TransitionPayload>,
}

impl TransitionForm {
    pub fn new(rules: ValidationRules) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    fn start(&mut self, request: &TransitionRequest) {
        self.reset_state();
        self.draft = LeadTransition::open(request.clone());
        tracing::info!(
            lead = %request.lead_name,
            action = %request.action_type,
            from = ?request.source_stage,
            to = %request.destination_stage,
            qualification = self.draft.is_qualification_move(),
            "Transition opened"
        );
    }

    fn apply_update(&mut self, update: &FieldUpdate) {
        let field = update.field();
        if self
            .validation_error
            .as_ref()
            .is_some_and(|e| e.field() == field)
        {
            self.validation_error = None;
        }
        self.draft.apply(update.clone());
        tracing::debug!(field = ?field, "Transition field updated");
    }

    fn reset_state(&mut self) {
        self.draft = LeadTransition::default();
        self.validation_error = None;
        self.submission_error = None;
        self.pending = None;
        self.submitted = None;
    }

    fn lead_name(&self) -> &str {
        self.draft
            .request
            .as_ref()
            .map(|r| r.lead_name.as_str())
            .unwrap_or_default()
    }
}

#[state_machine(initial = "State::idle()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl TransitionForm {
    #[state]
    fn idle(&mut self, event: &TransitionEvent) -> Outcome<State> {
        match event {
            TransitionEvent::Open(request) => {
                self.start(request);
                Transition(State::editing())
            }
            _ => Handled,
        }
    }

    #[state]
    fn editing(&mut self, event: &TransitionEvent) -> Outcome<State> {
        match event {
            TransitionEvent::Open(request) => {
                self.start(request);
                Handled
            }
            TransitionEvent::UpdateField(update) => {
                self.apply_update(update);
                Handled
            }
            TransitionEvent::Submit => {
                self.submission_error = None;
                match validate(&self.draft, &self.rules) {
                    Ok(payload) => {
                        self.validation_error = None;
                        self.pending = Some(payload);
                        tracing::info!(lead = %self.lead_name(), "Transition submitting");
                        Transition(State::submitting())
                    }
                    Err(e) => {
                        tracing::warn!(
                            lead = %self.lead_name(),
                            field = ?e.field(),
                            "Transition validation failed: {}",
                            e
                        );
                        self.validation_error = Some(e);
                        Handled
                    }
                }
            }
            TransitionEvent::Cancel => {
                tracing::info!(lead = %self.lead_name(), "Transition cancelled");
                self.reset_state();
                Transition(State::closed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn submitting(&mut self, event: &TransitionEvent) -> Outcome<State> {
        match event {
            TransitionEvent::SubmissionSucceeded => {
                self.submitted = self.pending.take();
                tracing::info!(lead = %self.lead_name(), "Transition accepted");
                Transition(State::success())
            }
            TransitionEvent::SubmissionFailed { message } => {
                self.pending = None;
                self.submission_error = Some(message.clone());
                tracing::warn!(
                    lead = %self.lead_name(),
                    "Transition submission failed: {}",
                    message
                );
                Transition(State::editing())
            }
            _ => Handled,
        }
    }

    #[state]
    fn success(&mut self, event: &TransitionEvent) -> Outcome<State> {
        match event {
            TransitionEvent::AutoCloseElapsed => {
                tracing::info!(lead = %self.lead_name(), "Transition closed after success");
                self.reset_state();
                Transition(State::closed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn closed(&mut self, event: &TransitionEvent) -> Outcome<State> {
        match event {
            TransitionEvent::Open(request) => {
                self.start(request);
                Transition(State::editing())
            }
            _ => Handled,
        }
    }
}

impl TransitionForm {
    pub fn draft(&self) -> &LeadTransition {
        &self.draft
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn submission_error(&self) -> Option<&str> {
        self.submission_error.as_deref()
    }

    /// Payload waiting on the mover while submitting
    pub fn pending_payload(&self) -> Option<&TransitionPayload> {
        self.pending.as_ref()
    }

    /// Payload the mover accepted, kept until the form closes
    pub fn submitted_payload(&self) -> Option<&TransitionPayload> {
        self.submitted.as_ref()
    }

    pub fn is_qualification_move(&self) -> bool {
        self.draft.is_qualification_move()
    }
}
