// Stand-in movers for demos and tests

use async_trait::async_trait;
use std::time::Duration;

use super::traits::{LeadMover, MoveError};
use super::types::MoveRequest;

/// Accepts every move after a fixed delay, the way the dashboard faked its backend call
#[derive(Debug, Clone)]
pub struct SimulatedLatencyMover {
    latency: Duration,
    reject_with: Option<String>,
}

impl SimulatedLatencyMover {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            reject_with: None,
        }
    }

    /// Waits the same latency, then rejects
    pub fn failing(latency: Duration, message: impl Into<String>) -> Self {
        Self {
            latency,
            reject_with: Some(message.into()),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl LeadMover for SimulatedLatencyMover {
    async fn move_lead(&self, request: &MoveRequest) -> Result<(), MoveError> {
        tokio::time::sleep(self.latency).await;
        match &self.reject_with {
            Some(message) => Err(MoveError::Rejected(message.clone())),
            None => {
                tracing::debug!(
                    lead = %request.request.lead_name,
                    to = %request.request.destination_stage,
                    latency_ms = self.latency.as_millis() as u64,
                    "Simulated move accepted"
                );
                Ok(())
            }
        }
    }
}
