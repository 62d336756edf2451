use chrono::Utc;
use dashmap::DashMap;

use crate::error::AppError;
use crate::ids;
use crate::models::ticket::{Ticket, TicketIntake, TicketStatus, VerificationVerdict};

/// Owns every ticket record and its lifecycle. All transitions are checked
/// compare-and-set operations under the per-entry write guard: only one
/// caller can move a ticket out of any given status.
#[derive(Default)]
pub struct TicketRegistry {
    inner: DashMap<String, Ticket>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn create(&self, intake: TicketIntake) -> Ticket {
        let now = Utc::now();
        let ticket = Ticket {
            id: ids::new_id(ids::TICKET_TAG),
            status: TicketStatus::Open,
            priority: intake.priority,
            location: intake.location,
            victim_info: intake.victim_info,
            assigned_rescuer_id: None,
            completed_by: None,
            raw_message: intake.raw_message,
            source: intake.source,
            verification: None,
            created_at: now,
            updated_at: now,
            verified_at: None,
            completed_at: None,
        };

        self.inner.insert(ticket.id.clone(), ticket.clone());
        ticket
    }

    pub fn get(&self, id: &str) -> Result<Ticket, AppError> {
        self.inner
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("ticket {id} not found")))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Binds a rescuer to an open ticket. Losing a race for the ticket is a
    /// Conflict so the scheduler can tell it apart from an illegal request.
    pub fn assign(&self, ticket_id: &str, rescuer_id: &str) -> Result<Ticket, AppError> {
        let mut ticket = self
            .inner
            .get_mut(ticket_id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {ticket_id} not found")))?;

        if ticket.status != TicketStatus::Open {
            return Err(AppError::Conflict(format!(
                "ticket {ticket_id} is {:?}, not Open",
                ticket.status
            )));
        }

        ticket.status = TicketStatus::Assigned;
        ticket.assigned_rescuer_id = Some(rescuer_id.to_string());
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    /// Field report from the assigned rescuer: the mission is underway.
    pub fn start_progress(&self, id: &str) -> Result<Ticket, AppError> {
        let mut ticket = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {id} not found")))?;

        match ticket.status {
            TicketStatus::Assigned => {
                ticket.status = TicketStatus::InProgress;
                ticket.updated_at = Utc::now();
                Ok(ticket.clone())
            }
            TicketStatus::InProgress => Ok(ticket.clone()),
            status => Err(AppError::InvalidState(format!(
                "ticket {id} is {status:?}; progress reports require Assigned"
            ))),
        }
    }

    pub fn mark_verified(
        &self,
        id: &str,
        verdict: VerificationVerdict,
    ) -> Result<Ticket, AppError> {
        let mut ticket = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {id} not found")))?;

        match ticket.status {
            TicketStatus::InProgress => {
                ticket.status = TicketStatus::Verified;
                ticket.verification = Some(verdict);
                ticket.verified_at = Some(Utc::now());
                ticket.updated_at = Utc::now();
                Ok(ticket.clone())
            }
            TicketStatus::Verified => Ok(ticket.clone()),
            status => Err(AppError::InvalidState(format!(
                "ticket {id} is {status:?}; verification requires InProgress"
            ))),
        }
    }

    /// Completes a verified ticket. The boolean reports whether this call
    /// performed the transition; exactly one concurrent caller sees true, so
    /// release and payout run once.
    pub fn mark_completed(&self, id: &str) -> Result<(Ticket, bool), AppError> {
        let mut ticket = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {id} not found")))?;

        match ticket.status {
            TicketStatus::Verified => {
                ticket.status = TicketStatus::Completed;
                ticket.completed_by = ticket.assigned_rescuer_id.take();
                ticket.completed_at = Some(Utc::now());
                ticket.updated_at = Utc::now();
                Ok((ticket.clone(), true))
            }
            TicketStatus::Completed => Ok((ticket.clone(), false)),
            status => Err(AppError::InvalidState(format!(
                "ticket {id} is {status:?}; completion requires Verified"
            ))),
        }
    }

    /// Cancels an open or assigned ticket. Returns the rescuer freed by the
    /// cancellation, if any; only the transitioning caller sees it.
    pub fn cancel(&self, id: &str) -> Result<(Ticket, Option<String>), AppError> {
        let mut ticket = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("ticket {id} not found")))?;

        match ticket.status {
            TicketStatus::Open => {
                ticket.status = TicketStatus::Cancelled;
                ticket.updated_at = Utc::now();
                Ok((ticket.clone(), None))
            }
            TicketStatus::Assigned => {
                ticket.status = TicketStatus::Cancelled;
                let released = ticket.assigned_rescuer_id.take();
                ticket.updated_at = Utc::now();
                Ok((ticket.clone(), released))
            }
            TicketStatus::Cancelled => Ok((ticket.clone(), None)),
            status => Err(AppError::InvalidState(format!(
                "ticket {id} is {status:?}; only Open or Assigned tickets can be cancelled"
            ))),
        }
    }
}
