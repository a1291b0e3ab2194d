// leadflow - funnel stage transitions for CRM leads
// This exposes the core components for testing and integration

pub mod transition;
pub mod board;
pub mod telemetry;
pub mod observability;
pub mod config;

// Re-export key types for easy access
pub use transition::{
    FieldUpdate, LeadMover, LeadType, MoveError, MoveRequest, SimulatedLatencyMover, Stage,
    TransitionPayload, TransitionRequest, TransitionWorkflow, ValidationError, WorkflowError,
    WorkflowPhase, WorkflowSettings,
};
pub use board::{Lead, LeadBoard, LeadStatus, StageChange};
pub use telemetry::{init_telemetry, shutdown_telemetry, generate_correlation_id, create_transition_span};
pub use observability::{TransitionMetrics, transition_metrics, OperationTimer};
pub use crate::config::{LeadflowConfig, config};
