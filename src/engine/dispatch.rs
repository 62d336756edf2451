use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::scoring::rank_candidates;
use crate::error::AppError;
use crate::ids;
use crate::models::dispatch::DispatchRecord;
use crate::models::ticket::TicketStatus;
use crate::notify::EngineEvent;
use crate::state::AppState;

/// Terminal result of one dispatch attempt. Exhaustion is a normal outcome
/// that the caller escalates, never an error.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Assigned(DispatchRecord),
    /// Full radius ladder searched without a claimable candidate; the ticket
    /// stays Open and a broadcast alert has been published.
    Exhausted { searched_km: f64 },
    /// The ticket was no longer Open when this attempt reached it.
    Skipped { status: TicketStatus },
}

pub async fn run_dispatch_engine(state: Arc<AppState>, mut ticket_rx: mpsc::Receiver<String>) {
    info!("dispatch engine started");

    while let Some(ticket_id) = ticket_rx.recv().await {
        state.metrics.tickets_in_queue.dec();

        let start = Instant::now();
        let outcome_label = match dispatch_ticket(&state, &ticket_id) {
            Ok(DispatchOutcome::Assigned(_)) => "assigned",
            Ok(DispatchOutcome::Exhausted { .. }) => "exhausted",
            Ok(DispatchOutcome::Skipped { .. }) => "skipped",
            Err(err) => {
                error!(ticket_id = %ticket_id, error = %err, "dispatch attempt failed");
                "error"
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        state
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&[outcome_label])
            .observe(elapsed);
        state
            .metrics
            .dispatches_total
            .with_label_values(&[outcome_label])
            .inc();
    }

    warn!("dispatch engine stopped: queue channel closed");
}

/// One bounded matching attempt for an open ticket: walk the radius ladder,
/// rank candidates at each tier, and claim the best one atomically across
/// both registries. Safe to re-invoke for the same ticket at any time.
pub fn dispatch_ticket(state: &AppState, ticket_id: &str) -> Result<DispatchOutcome, AppError> {
    let ticket = state.tickets.get(ticket_id)?;
    if ticket.status != TicketStatus::Open {
        info!(ticket_id = %ticket_id, status = ?ticket.status, "ticket no longer open; skipping");
        return Ok(DispatchOutcome::Skipped {
            status: ticket.status,
        });
    }

    let center = ticket.location.point();
    let min_capacity = ticket.victim_info.people_count;

    for &radius_km in &state.dispatch.radius_ladder_km {
        let candidates = state.rescuers.find_candidates(&center, radius_km, min_capacity);
        let ranked = rank_candidates(candidates, &ticket, &state.dispatch.scoring);

        for entry in ranked {
            let rescuer_id = entry.candidate.rescuer.id.clone();

            match state.rescuers.transition_to_mission(&rescuer_id) {
                Ok(_) => {}
                // Raced by another attempt; try the next candidate.
                Err(AppError::Conflict(_)) => continue,
                Err(err) => return Err(err),
            }

            match state.tickets.assign(ticket_id, &rescuer_id) {
                Ok(_) => {
                    let record = DispatchRecord {
                        id: ids::new_id(ids::DISPATCH_TAG),
                        ticket_id: ticket_id.to_string(),
                        rescuer_id: rescuer_id.clone(),
                        score: entry.score,
                        score_breakdown: entry.breakdown,
                        distance_km: entry.candidate.distance_km,
                        radius_km,
                        assigned_at: Utc::now(),
                    };
                    state.dispatches.insert(record.id.clone(), record.clone());
                    state.metrics.active_missions.inc();

                    let _ = state.events_tx.send(EngineEvent::RescuerAssigned {
                        ticket_id: ticket_id.to_string(),
                        rescuer_id: rescuer_id.clone(),
                        record: record.clone(),
                    });

                    info!(
                        ticket_id = %ticket_id,
                        rescuer_id = %rescuer_id,
                        score = record.score,
                        distance_km = record.distance_km,
                        radius_km,
                        "ticket assigned"
                    );

                    return Ok(DispatchOutcome::Assigned(record));
                }
                Err(AppError::Conflict(_)) => {
                    // Compensation: the claim must not outlive the failed
                    // assignment. The ticket left Open under us, so another
                    // attempt won it; this one is done.
                    state.rescuers.release(&rescuer_id, false)?;
                    let current = state.tickets.get(ticket_id)?;
                    info!(
                        ticket_id = %ticket_id,
                        status = ?current.status,
                        "lost ticket race after claiming rescuer; rolled back"
                    );
                    return Ok(DispatchOutcome::Skipped {
                        status: current.status,
                    });
                }
                Err(err) => {
                    state.rescuers.release(&rescuer_id, false)?;
                    return Err(err);
                }
            }
        }
    }

    let searched_km = state
        .dispatch
        .radius_ladder_km
        .last()
        .copied()
        .unwrap_or_default();

    warn!(
        ticket_id = %ticket_id,
        searched_km,
        "no rescuer available; escalating to broadcast"
    );
    let _ = state.events_tx.send(EngineEvent::BroadcastAlert {
        ticket_id: ticket_id.to_string(),
        searched_km,
    });

    Ok(DispatchOutcome::Exhausted { searched_km })
}
