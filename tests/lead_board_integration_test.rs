//! Lead board integration tests
//!
//! The board plays the page component that owns the lead list: the workflow
//! validates, the board applies. These cover the hand-off between the two.

use leadflow::{
    LeadBoard, LeadStatus, LeadType, SimulatedLatencyMover, Stage, TransitionRequest,
    TransitionWorkflow, WorkflowError, WorkflowPhase, WorkflowSettings,
};
use std::sync::Arc;
use std::time::Duration;

const SEED: &str = r#"[
    {"id": "lead-1", "name": "Acme Corp Lead", "stage": "TOFU"},
    {"id": "lead-2", "name": "Beta Inc", "stage": "MOFU", "status": "qualified", "leadType": "MQL"},
    {"id": "lead-3", "name": "Gamma LLC", "stage": "BOFU", "prospectValue": 12000.0}
]"#;

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_board() -> Arc<LeadBoard> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(&path, SEED).unwrap();
        Arc::new(LeadBoard::load(&path).await.unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_funnel_walk_through_board() {
        let board = seeded_board().await;
        let mut workflow = TransitionWorkflow::new(board.clone(), WorkflowSettings::default());

        workflow
            .open(
                TransitionRequest::new("Acme Corp Lead", Some(Stage::Tofu), Stage::Mofu)
                    .with_lead_id("lead-1")
                    .with_action_type("Qualify"),
            )
            .unwrap();
        workflow.update_field_raw("notes", "Downloaded two whitepapers").unwrap();
        workflow.update_field_raw("leadType", "MQL").unwrap();
        workflow.update_field_raw("reason", "Engaged with nurture track").unwrap();
        workflow.submit_and_close().await.unwrap();

        workflow
            .open(TransitionRequest::new("Acme Corp Lead", Some(Stage::Mofu), Stage::Bofu).with_lead_id("lead-1"))
            .unwrap();
        workflow.update_field_raw("notes", "Requested a pricing proposal").unwrap();
        workflow.update_field_raw("leadType", "SQL").unwrap();
        workflow.update_field_raw("reason", "Budget holder on the call").unwrap();
        workflow.update_field_raw("prospectValue", "48000").unwrap();
        workflow.submit_and_close().await.unwrap();

        workflow
            .open(TransitionRequest::new("Acme Corp Lead", Some(Stage::Bofu), Stage::Customer).with_lead_id("lead-1"))
            .unwrap();
        workflow.update_field_raw("notes", "Contract signed for annual plan").unwrap();
        workflow.submit_and_close().await.unwrap();

        let lead = board.get("lead-1").await.unwrap();
        assert_eq!(lead.stage, Stage::Customer);
        assert_eq!(lead.status, LeadStatus::Customer);
        assert_eq!(lead.lead_type, Some(LeadType::Sql));
        assert_eq!(lead.prospect_value, Some(48000.0));
        assert_eq!(lead.history.len(), 3);
        assert_eq!(lead.history[0].action_type, "Qualify");
        assert_eq!(lead.history[2].to, Stage::Customer);
        assert_eq!(lead.history[2].reason, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_stage_surfaces_as_submission_error() {
        let board = seeded_board().await;
        let mut workflow = TransitionWorkflow::new(board.clone(), WorkflowSettings::default());

        // Beta Inc already sits in MOFU
        workflow
            .open(TransitionRequest::new("Beta Inc", Some(Stage::Tofu), Stage::Mofu))
            .unwrap();
        workflow.update_field_raw("notes", "Second rep qualifying again").unwrap();
        workflow.update_field_raw("leadType", "MQL").unwrap();
        workflow.update_field_raw("reason", "Duplicate outreach").unwrap();

        let err = workflow.submit().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Submission { .. }));
        assert_eq!(workflow.phase(), WorkflowPhase::Editing);
        assert_eq!(board.get("Beta Inc").await.unwrap().history.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_lead_surfaces_as_submission_error() {
        let board = seeded_board().await;
        let mut workflow = TransitionWorkflow::new(board, WorkflowSettings::default());
        workflow
            .open(TransitionRequest::new("Omega Ltd", None, Stage::Bofu))
            .unwrap();
        workflow.update_field_raw("notes", "Walked in asking for a quote").unwrap();

        assert!(matches!(
            workflow.submit().await,
            Err(WorkflowError::Submission { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_mover_within_timeout() {
        let mover = Arc::new(SimulatedLatencyMover::new(Duration::from_secs(1)));
        let mut workflow = TransitionWorkflow::new(mover, WorkflowSettings::default());
        workflow
            .open(TransitionRequest::new("Gamma LLC", Some(Stage::Bofu), Stage::Customer))
            .unwrap();
        workflow.update_field_raw("notes", "Contract signed for annual plan").unwrap();

        let start = tokio::time::Instant::now();
        workflow.submit_and_close().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(workflow.phase(), WorkflowPhase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_mover_keeps_form_for_retry() {
        let mover = Arc::new(SimulatedLatencyMover::failing(
            Duration::from_millis(200),
            "service unavailable",
        ));
        let mut workflow = TransitionWorkflow::new(mover, WorkflowSettings::default());
        workflow
            .open(TransitionRequest::new("Gamma LLC", Some(Stage::Bofu), Stage::Customer))
            .unwrap();
        workflow.update_field_raw("notes", "Contract signed for annual plan").unwrap();

        let err = workflow.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to move lead. Please try again.");
        assert_eq!(workflow.form().draft().notes, "Contract signed for annual plan");
        workflow.cancel().unwrap();
        assert_eq!(workflow.phase(), WorkflowPhase::Closed);
    }
}
