use serde::Serialize;

use crate::models::dispatch::DispatchRecord;

/// Events published for the external notification and payout collaborators.
/// Delivery is fire-and-forget: a missing or slow consumer never blocks or
/// rolls back a registry transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    RescuerAssigned {
        ticket_id: String,
        rescuer_id: String,
        record: DispatchRecord,
    },
    /// No candidate inside the full radius ladder; the ticket stays open and
    /// a wider audience should be alerted.
    BroadcastAlert { ticket_id: String, searched_km: f64 },
    MissionCompleted {
        ticket_id: String,
        rescuer_id: String,
    },
    PayoutRequested {
        ticket_id: String,
        rescuer_id: String,
        amount: u64,
    },
}
