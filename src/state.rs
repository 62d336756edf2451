use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::config::{Config, DispatchConfig};
use crate::models::dispatch::DispatchRecord;
use crate::notify::EngineEvent;
use crate::observability::metrics::Metrics;
use crate::registry::rescuers::RescuerRegistry;
use crate::registry::tickets::TicketRegistry;

pub struct AppState {
    pub tickets: TicketRegistry,
    pub rescuers: RescuerRegistry,
    pub dispatches: DashMap<String, DispatchRecord>,
    pub ticket_tx: mpsc::Sender<String>,
    pub events_tx: broadcast::Sender<EngineEvent>,
    pub dispatch: DispatchConfig,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<String>) {
        let (ticket_tx, ticket_rx) = mpsc::channel(config.ticket_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                tickets: TicketRegistry::new(),
                rescuers: RescuerRegistry::new(),
                dispatches: DashMap::new(),
                ticket_tx,
                events_tx,
                dispatch: config.dispatch.clone(),
                metrics: Metrics::new(),
            },
            ticket_rx,
        )
    }
}
