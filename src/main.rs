use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use leadflow::transition::validation::{is_qualification_move, validate};
use leadflow::transition::LeadTransition;
use leadflow::{
    config, init_telemetry, shutdown_telemetry, transition_metrics, FieldUpdate, LeadBoard,
    LeadMover, LeadType, LeadflowConfig, SimulatedLatencyMover, Stage, TransitionRequest,
    TransitionWorkflow, WorkflowError, WorkflowSettings,
};

#[derive(Parser)]
#[command(name = "leadflow")]
#[command(about = "Move CRM leads between funnel stages with mandatory justification")]
#[command(long_about = "leadflow validates a funnel stage move (TOFU, MOFU, BOFU, Customer), \
                       requires a lead type and reason for qualification moves, and hands \
                       the accepted move to a lead board.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a move and apply it
    Move(MoveArgs),
    /// Validate a move without applying it
    Check(MoveArgs),
}

#[derive(Args, Debug)]
struct MoveArgs {
    /// Lead name (or id when --board is given)
    #[arg(long)]
    lead: String,
    /// Current stage; taken from the board when omitted
    #[arg(long)]
    from: Option<Stage>,
    /// Destination stage: MOFU, BOFU or Customer
    #[arg(long)]
    to: Stage,
    /// Why the lead is moving (at least 10 characters)
    #[arg(long, default_value = "")]
    notes: String,
    /// MQL or SQL, required for qualification moves
    #[arg(long)]
    lead_type: Option<LeadType>,
    /// Reason for the qualification
    #[arg(long, default_value = "")]
    reason: String,
    /// Expected deal value
    #[arg(long, default_value = "")]
    prospect_value: String,
    /// Label recorded with the move
    #[arg(long)]
    action_type: Option<String>,
    /// JSON file with the leads to seed the board from
    #[arg(long)]
    board: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config()?;
    init_telemetry(&settings.observability)?;

    let result = tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::Move(args) => move_command(args, settings).await,
            Commands::Check(args) => check_command(args, settings).await,
        }
    });

    if settings.observability.metrics_enabled {
        transition_metrics().log_stats();
    }
    shutdown_telemetry();
    result
}

async fn load_board(args: &MoveArgs) -> Result<Option<Arc<LeadBoard>>> {
    match &args.board {
        Some(path) => Ok(Some(Arc::new(LeadBoard::load(path).await?))),
        None => Ok(None),
    }
}

async fn build_request(args: &MoveArgs, board: Option<&LeadBoard>) -> Result<TransitionRequest> {
    let mut source = args.from;
    let mut request_id = None;
    let mut lead_name = args.lead.clone();

    if let Some(board) = board {
        let lead = board
            .get(&args.lead)
            .await
            .with_context(|| format!("Lead '{}' is not on the board", args.lead))?;
        source = source.or(Some(lead.stage));
        request_id = Some(lead.id);
        lead_name = lead.name;
    }

    let mut request = TransitionRequest::new(lead_name, source, args.to);
    if let Some(id) = request_id {
        request = request.with_lead_id(id);
    }
    if let Some(action) = &args.action_type {
        request = request.with_action_type(action.clone());
    }
    Ok(request)
}

fn field_updates(args: &MoveArgs) -> Vec<FieldUpdate> {
    vec![
        FieldUpdate::Notes(args.notes.clone()),
        FieldUpdate::LeadType(args.lead_type),
        FieldUpdate::ProspectValue(args.prospect_value.clone()),
        FieldUpdate::Reason(args.reason.clone()),
    ]
}

async fn move_command(args: MoveArgs, settings: &LeadflowConfig) -> Result<()> {
    let board = load_board(&args).await?;
    let request = build_request(&args, board.as_deref()).await?;

    let mover: Arc<dyn LeadMover> = match &board {
        Some(board) => board.clone() as Arc<dyn LeadMover>,
        None => Arc::new(SimulatedLatencyMover::new(Duration::from_millis(
            settings.workflow.simulated_latency_ms,
        ))),
    };

    let mut workflow = TransitionWorkflow::new(mover, WorkflowSettings::from(&settings.workflow));
    workflow.open(request)?;
    for update in field_updates(&args) {
        workflow.update_field(update)?;
    }

    match workflow.submit_and_close().await {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            if let Some(board) = &board {
                if let Some(lead) = board.get(&args.lead).await {
                    println!("{}", serde_json::to_string_pretty(&lead)?);
                }
            }
            Ok(())
        }
        Err(WorkflowError::Submission { cause }) => {
            bail!("Failed to move lead. Please try again. ({cause})")
        }
        Err(e) => Err(e.into()),
    }
}

async fn check_command(args: MoveArgs, settings: &LeadflowConfig) -> Result<()> {
    let board = load_board(&args).await?;
    let request = build_request(&args, board.as_deref()).await?;
    if !request.destination_stage.is_valid_destination() {
        return Err(WorkflowError::InvalidDestination(request.destination_stage).into());
    }

    let qualification = is_qualification_move(request.source_stage, request.destination_stage);
    println!(
        "{} -> {}: {}",
        request
            .source_stage
            .map(|s| s.to_string())
            .unwrap_or_else(|| "(none)".to_string()),
        request.destination_stage,
        if qualification {
            "qualification move (lead type and reason required)"
        } else {
            "notes only"
        }
    );

    let mut form = LeadTransition::open(request);
    for update in field_updates(&args) {
        form.apply(update);
    }
    let rules = WorkflowSettings::from(&settings.workflow).rules;
    let payload = validate(&form, &rules)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
