use tracing::{info, warn};

use crate::error::AppError;
use crate::models::ticket::{Ticket, TicketStatus, VerificationVerdict};
use crate::notify::EngineEvent;
use crate::state::AppState;

/// Field report from the assigned rescuer: the mission is underway.
pub fn report_progress(state: &AppState, ticket_id: &str) -> Result<Ticket, AppError> {
    let ticket = state.tickets.start_progress(ticket_id)?;
    info!(ticket_id = %ticket_id, "mission in progress");
    Ok(ticket)
}

/// Drives a ticket from InProgress to Completed off an external verification
/// verdict, and returns the rescuer to the pool. Re-driving an already
/// completed ticket is a no-op: no second release, no second payout.
pub fn complete_ticket(
    state: &AppState,
    ticket_id: &str,
    verdict: VerificationVerdict,
) -> Result<Ticket, AppError> {
    let ticket = state.tickets.get(ticket_id)?;
    if ticket.status == TicketStatus::Completed {
        return Ok(ticket);
    }

    let min_confidence = state.dispatch.min_verification_confidence;
    if !verdict.passes(min_confidence) {
        warn!(
            ticket_id = %ticket_id,
            confidence = verdict.confidence,
            min_confidence,
            "proof of rescue rejected"
        );
        return Err(AppError::VerificationFailed(format!(
            "ticket {ticket_id}: proof rejected (confidence {:.0}%, threshold {:.0}%)",
            verdict.confidence * 100.0,
            min_confidence * 100.0
        )));
    }

    state.tickets.mark_verified(ticket_id, verdict)?;
    let (completed, transitioned) = state.tickets.mark_completed(ticket_id)?;

    if transitioned {
        if let Some(rescuer_id) = completed.completed_by.clone() {
            state.rescuers.release(&rescuer_id, true)?;
            state.metrics.active_missions.dec();

            let amount = state
                .dispatch
                .reward
                .amount_for(completed.priority, completed.victim_info.people_count);

            let _ = state.events_tx.send(EngineEvent::MissionCompleted {
                ticket_id: ticket_id.to_string(),
                rescuer_id: rescuer_id.clone(),
            });
            let _ = state.events_tx.send(EngineEvent::PayoutRequested {
                ticket_id: ticket_id.to_string(),
                rescuer_id: rescuer_id.clone(),
                amount,
            });

            info!(
                ticket_id = %ticket_id,
                rescuer_id = %rescuer_id,
                reward = amount,
                "mission completed"
            );
        }
    }

    Ok(completed)
}

/// Cancels an open or assigned ticket, freeing any claimed rescuer without
/// crediting a mission.
pub fn cancel_ticket(state: &AppState, ticket_id: &str) -> Result<Ticket, AppError> {
    let (ticket, released) = state.tickets.cancel(ticket_id)?;

    if let Some(rescuer_id) = released {
        state.rescuers.release(&rescuer_id, false)?;
        state.metrics.active_missions.dec();
        info!(ticket_id = %ticket_id, rescuer_id = %rescuer_id, "ticket cancelled; rescuer freed");
    } else {
        info!(ticket_id = %ticket_id, "ticket cancelled");
    }

    Ok(ticket)
}
