use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub vehicle_score: f64,
    pub capacity_score: f64,
    pub rating_score: f64,
    pub experience_score: f64,
}

/// Audit record of one successful claim: which rescuer won a ticket, at what
/// score, and at which search radius tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: String,
    pub ticket_id: String,
    pub rescuer_id: String,
    pub score: i64,
    pub score_breakdown: ScoreBreakdown,
    pub distance_km: f64,
    pub radius_km: f64,
    pub assigned_at: DateTime<Utc>,
}
