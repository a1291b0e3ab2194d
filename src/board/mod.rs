// In-memory lead board - owns the leads and applies accepted transitions
//
// The transition workflow only validates. Locating the lead, moving it and
// keeping its history all happen here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

use crate::transition::traits::{LeadMover, MoveError};
use crate::transition::types::{LeadType, MoveRequest, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    Open,
    Qualified,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChange {
    pub from: Option<Stage>,
    pub to: Stage,
    pub action_type: String,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub stage: Stage,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_type: Option<LeadType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prospect_value: Option<f64>,
    #[serde(default)]
    pub history: Vec<StageChange>,
}

impl Lead {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stage: Stage) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stage,
            status: if stage == Stage::Customer {
                LeadStatus::Customer
            } else {
                LeadStatus::Open
            },
            lead_type: None,
            prospect_value: None,
            history: Vec::new(),
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.id == key || self.name.eq_ignore_ascii_case(key)
    }

    fn apply(&mut self, request: &MoveRequest) {
        let destination = request.request.destination_stage;
        let payload = &request.payload;

        if destination == Stage::Customer {
            self.status = LeadStatus::Customer;
        } else if request.is_qualification_move() {
            self.status = LeadStatus::Qualified;
            self.lead_type = payload.lead_type;
        } else if destination != self.stage {
            // Backward or skipping moves do not carry a qualification
            self.status = LeadStatus::Open;
        }
        if let Some(value) = payload.prospect_value {
            self.prospect_value = Some(value);
        }

        self.history.push(StageChange {
            from: Some(self.stage),
            to: destination,
            action_type: request.request.action_type.clone(),
            notes: payload.notes.clone(),
            reason: payload.reason.clone(),
            at: Utc::now(),
        });
        self.stage = destination;
    }
}

/// Leads kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct LeadBoard {
    leads: Mutex<Vec<Lead>>,
}

impl LeadBoard {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self {
            leads: Mutex::new(leads),
        }
    }

    /// Parse a JSON array of leads. A lead seeded in the Customer stage is a customer
    /// whatever status the file gives it.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut leads: Vec<Lead> =
            serde_json::from_str(json).context("Invalid lead board JSON")?;
        for lead in leads.iter_mut().filter(|lead| lead.stage == Stage::Customer) {
            lead.status = LeadStatus::Customer;
        }
        Ok(Self::new(leads))
    }

    /// Seed a board from a JSON file. The file is never written back.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read lead board {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Look a lead up by id, or by name ignoring case
    pub async fn get(&self, key: &str) -> Option<Lead> {
        self.leads.lock().await.iter().find(|l| l.matches(key)).cloned()
    }

    pub async fn leads(&self) -> Vec<Lead> {
        self.leads.lock().await.clone()
    }

    pub async fn by_stage(&self, stage: Stage) -> Vec<Lead> {
        self.leads
            .lock()
            .await
            .iter()
            .filter(|l| l.stage == stage)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LeadMover for LeadBoard {
    async fn move_lead(&self, request: &MoveRequest) -> Result<(), MoveError> {
        let subject = &request.request;
        let mut leads = self.leads.lock().await;

        let lead = match &subject.lead_id {
            Some(id) => leads.iter_mut().find(|l| &l.id == id),
            None => leads
                .iter_mut()
                .find(|l| l.name.eq_ignore_ascii_case(&subject.lead_name)),
        }
        .ok_or_else(|| {
            MoveError::LeadNotFound(
                subject
                    .lead_id
                    .clone()
                    .unwrap_or_else(|| subject.lead_name.clone()),
            )
        })?;

        if let Some(expected) = subject.source_stage {
            if lead.stage != expected {
                return Err(MoveError::StageMismatch {
                    lead: lead.name.clone(),
                    expected,
                    actual: lead.stage,
                });
            }
        }

        let from = lead.stage;
        lead.apply(request);
        tracing::info!(
            lead = %lead.name,
            from = %from,
            to = %lead.stage,
            status = ?lead.status,
            correlation_id = %request.correlation_id,
            "Lead moved"
        );
        Ok(())
    }
}
