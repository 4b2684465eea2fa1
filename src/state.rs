use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::overlap::BoundaryPolicy;
use crate::models::event::DispatchEvent;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
    pub overlap_boundary: BoundaryPolicy,
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            store: Store::new(config.lock_timeout),
            events_tx,
            metrics: Metrics::new(),
            overlap_boundary: config.overlap_boundary,
            store_timeout: config.store_timeout,
        }
    }

    /// Fans a committed change out to subscribers. Having none is fine.
    pub fn publish(&self, event: DispatchEvent) {
        let _ = self.events_tx.send(event);
    }
}
