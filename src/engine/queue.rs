use crate::error::AppError;
use crate::state::AppState;

/// Hands a ticket id to the dispatch engine. Only the id travels through the
/// queue so the engine always reads the ticket fresh from the registry.
pub async fn enqueue_ticket(state: &AppState, ticket_id: String) -> Result<(), AppError> {
    state
        .ticket_tx
        .send(ticket_id)
        .await
        .map_err(|err| AppError::Internal(format!("ticket queue send failed: {err}")))?;

    state.metrics.tickets_in_queue.inc();
    Ok(())
}
