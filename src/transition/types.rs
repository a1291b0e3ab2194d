// Core types for the lead stage transition workflow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Funnel stages ordered by purchase readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Top of funnel
    #[serde(rename = "TOFU")]
    Tofu,
    /// Middle of funnel
    #[serde(rename = "MOFU")]
    Mofu,
    /// Bottom of funnel
    #[serde(rename = "BOFU")]
    Bofu,
    /// Converted lead
    Customer,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Tofu => "TOFU",
            Stage::Mofu => "MOFU",
            Stage::Bofu => "BOFU",
            Stage::Customer => "Customer",
        }
    }

    /// Whether a lead may be moved into this stage. Nothing moves back to the top.
    pub fn is_valid_destination(&self) -> bool {
        !matches!(self, Stage::Tofu)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown funnel stage '{0}' (expected TOFU, MOFU, BOFU or Customer)")]
    UnknownStage(String),
    #[error("Unknown lead type '{0}' (expected MQL or SQL)")]
    UnknownLeadType(String),
    #[error("Unknown form field '{0}'")]
    UnknownField(String),
}

impl FromStr for Stage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TOFU" => Ok(Stage::Tofu),
            "MOFU" => Ok(Stage::Mofu),
            "BOFU" => Ok(Stage::Bofu),
            "CUSTOMER" => Ok(Stage::Customer),
            _ => Err(ParseError::UnknownStage(s.to_string())),
        }
    }
}

/// Lead quality judgment captured on qualification moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadType {
    /// Marketing qualified lead
    Mql,
    /// Sales qualified lead
    Sql,
}

impl fmt::Display for LeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadType::Mql => f.write_str("MQL"),
            LeadType::Sql => f.write_str("SQL"),
        }
    }
}

impl FromStr for LeadType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MQL" => Ok(LeadType::Mql),
            "SQL" => Ok(LeadType::Sql),
            _ => Err(ParseError::UnknownLeadType(s.to_string())),
        }
    }
}

/// Operator-editable fields of the transition form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionField {
    Notes,
    LeadType,
    ProspectValue,
    Reason,
}

impl FromStr for TransitionField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "notes" => Ok(TransitionField::Notes),
            "leadType" | "lead_type" => Ok(TransitionField::LeadType),
            "prospectValue" | "prospect_value" => Ok(TransitionField::ProspectValue),
            "reason" => Ok(TransitionField::Reason),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

/// A single field edit. Prospect value stays as raw input until submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Notes(String),
    LeadType(Option<LeadType>),
    ProspectValue(String),
    Reason(String),
}

impl FieldUpdate {
    /// Build an update from a field name and string value, the way a form hands them over.
    /// An empty lead type clears the selection.
    pub fn parse(field: &str, value: &str) -> Result<Self, ParseError> {
        let update = match field.parse::<TransitionField>()? {
            TransitionField::Notes => FieldUpdate::Notes(value.to_string()),
            TransitionField::LeadType if value.trim().is_empty() => FieldUpdate::LeadType(None),
            TransitionField::LeadType => FieldUpdate::LeadType(Some(value.parse()?)),
            TransitionField::ProspectValue => FieldUpdate::ProspectValue(value.to_string()),
            TransitionField::Reason => FieldUpdate::Reason(value.to_string()),
        };
        Ok(update)
    }

    pub fn field(&self) -> TransitionField {
        match self {
            FieldUpdate::Notes(_) => TransitionField::Notes,
            FieldUpdate::LeadType(_) => TransitionField::LeadType,
            FieldUpdate::ProspectValue(_) => TransitionField::ProspectValue,
            FieldUpdate::Reason(_) => TransitionField::Reason,
        }
    }
}

/// What the caller supplies when opening the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub lead_name: String,
    pub action_type: String,
    pub source_stage: Option<Stage>,
    pub destination_stage: Stage,
}

impl TransitionRequest {
    pub fn new(lead_name: impl Into<String>, source_stage: Option<Stage>, destination_stage: Stage) -> Self {
        Self {
            lead_id: None,
            lead_name: lead_name.into(),
            action_type: format!("Move to {destination_stage}"),
            source_stage,
            destination_stage,
        }
    }

    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = action_type.into();
        self
    }
}

/// Form state for one transition attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadTransition {
    pub request: Option<TransitionRequest>,
    pub notes: String,
    pub lead_type: Option<LeadType>,
    pub prospect_value: String,
    pub reason: String,
}

impl LeadTransition {
    pub fn open(request: TransitionRequest) -> Self {
        Self {
            request: Some(request),
            ..Default::default()
        }
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Notes(notes) => self.notes = notes,
            FieldUpdate::LeadType(lead_type) => self.lead_type = lead_type,
            FieldUpdate::ProspectValue(value) => self.prospect_value = value,
            FieldUpdate::Reason(reason) => self.reason = reason,
        }
    }

    pub fn is_qualification_move(&self) -> bool {
        self.request
            .as_ref()
            .map(|r| super::validation::is_qualification_move(r.source_stage, r.destination_stage))
            .unwrap_or(false)
    }
}

/// Delivered to the caller once a submission validates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_type: Option<LeadType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prospect_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Everything the mover needs to apply a validated transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub request: TransitionRequest,
    pub payload: TransitionPayload,
    pub correlation_id: String,
}

impl MoveRequest {
    pub fn is_qualification_move(&self) -> bool {
        super::validation::is_qualification_move(
            self.request.source_stage,
            self.request.destination_stage,
        )
    }
}
