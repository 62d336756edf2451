use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RescuerStatus {
    Online,
    Offline,
    Idle,
    Busy,
    OnMission,
}

impl RescuerStatus {
    /// Only rescuers in these statuses may be claimed for a mission.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, RescuerStatus::Online | RescuerStatus::Idle)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Cano,
    Boat,
    Kayak,
    Raft,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistrationStatus {
    Pending,
    Verified,
    Active,
    Suspended,
}

/// Registration payload from the external onboarding flow.
#[derive(Debug, Clone, Deserialize)]
pub struct RescuerRegistration {
    pub name: String,
    pub phone: String,
    pub location: GeoPoint,
    pub vehicle: VehicleType,
    pub capacity: u32,
    #[serde(default)]
    pub payout_address: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    #[serde(default = "default_registration")]
    pub registration: RegistrationStatus,
}

fn default_registration() -> RegistrationStatus {
    RegistrationStatus::Active
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rescuer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub status: RescuerStatus,
    pub location: GeoPoint,
    pub vehicle: VehicleType,
    pub capacity: u32,
    pub payout_address: Option<String>,
    pub rating: f64,
    pub completed_missions: u32,
    pub telegram_chat_id: Option<String>,
    pub registration: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rescuer {
    /// Eligible to appear in candidate searches.
    pub fn is_candidate(&self) -> bool {
        self.status.is_dispatchable() && self.registration == RegistrationStatus::Active
    }
}
