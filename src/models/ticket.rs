use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::rescuer::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    Assigned,
    InProgress,
    Verified,
    Completed,
    Cancelled,
}

impl TicketStatus {
    /// Statuses in which the ticket holds an active rescuer assignment.
    pub fn holds_assignment(self) -> bool {
        matches!(
            self,
            TicketStatus::Assigned | TicketStatus::InProgress | TicketStatus::Verified
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, alias = "address_text")]
    pub address: Option<String>,
}

impl TicketLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VictimInfo {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_people_count")]
    pub people_count: u32,
    #[serde(default)]
    pub elderly: bool,
    #[serde(default)]
    pub children: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_people_count() -> u32 {
    1
}

/// Proof-of-rescue verdict delivered by the external verification service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub is_valid: bool,
    pub confidence: f64,
    #[serde(default = "default_metadata_valid")]
    pub metadata_valid: bool,
}

fn default_metadata_valid() -> bool {
    true
}

impl VerificationVerdict {
    pub fn passes(&self, min_confidence: f64) -> bool {
        self.is_valid && self.metadata_valid && self.confidence >= min_confidence
    }
}

/// Parsed intake payload handed over by the NLP/geocoding collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketIntake {
    pub location: TicketLocation,
    pub victim_info: VictimInfo,
    pub priority: u8,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub status: TicketStatus,
    pub priority: u8,
    pub location: TicketLocation,
    pub victim_info: VictimInfo,
    pub assigned_rescuer_id: Option<String>,
    pub completed_by: Option<String>,
    pub raw_message: String,
    pub source: String,
    pub verification: Option<VerificationVerdict>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
