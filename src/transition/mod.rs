// Lead Transition Module - stage moves gated behind justification
//
// Validation and the state machine are pure; the mover that applies an accepted
// move is injected so tests can swap it out.

pub mod types;
pub mod validation;
pub mod state_machine;
pub mod traits;
pub mod movers;
pub mod workflow;


pub use types::{FieldUpdate, LeadTransition, LeadType, MoveRequest, Stage, TransitionField, TransitionPayload, TransitionRequest};
pub use validation::{is_qualification_move, validate, ValidationError, ValidationRules};
pub use state_machine::{TransitionEvent, TransitionForm};
pub use traits::{LeadMover, MoveError};
pub use movers::SimulatedLatencyMover;
pub use workflow::{TransitionWorkflow, WorkflowError, WorkflowPhase, WorkflowSettings, SUBMISSION_FAILED_MESSAGE};
