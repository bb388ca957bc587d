use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::models::artifact::Artifact;
use crate::models::category::Category;
use crate::models::courier::Courier;
use crate::models::offer::{Offer, OfferKind};
use crate::models::order::{Order, OrderItem, StatusHistoryEntry};
use crate::observability::metrics::Metrics;
use crate::publisher::{BroadcastPublisher, CourierEvent, Publisher};

/// A fan-out request consumed by the background dispatch engine.
#[derive(Debug, Clone, Copy)]
pub struct DispatchJob {
    pub order_id: Uuid,
    pub kind: OfferKind,
}

pub struct AppState {
    pub categories: DashMap<Uuid, Category>,
    pub couriers: DashMap<Uuid, Courier>,
    pub orders: DashMap<Uuid, Order>,
    /// Items per order, written once at creation.
    pub order_items: DashMap<Uuid, Vec<OrderItem>>,
    /// Append-only status history per order.
    pub history: DashMap<Uuid, Vec<StatusHistoryEntry>>,
    pub offers: DashMap<Uuid, Offer>,
    /// Photos and signatures per order.
    pub artifacts: DashMap<Uuid, Vec<Artifact>>,
    pub dispatch_tx: mpsc::Sender<DispatchJob>,
    pub publisher: Arc<dyn Publisher>,
    pub courier_events_tx: broadcast::Sender<CourierEvent>,
    pub metrics: Metrics,
    order_seq: AtomicU64,
}

impl AppState {
    pub fn new(
        dispatch_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<DispatchJob>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(dispatch_queue_size);
        let (courier_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let publisher = Arc::new(BroadcastPublisher::new(courier_events_tx.clone()));

        (
            Self {
                categories: DashMap::new(),
                couriers: DashMap::new(),
                orders: DashMap::new(),
                order_items: DashMap::new(),
                history: DashMap::new(),
                offers: DashMap::new(),
                artifacts: DashMap::new(),
                dispatch_tx,
                publisher,
                courier_events_tx,
                metrics: Metrics::new(),
                order_seq: AtomicU64::new(1),
            },
            dispatch_rx,
        )
    }

    pub fn next_order_number(&self) -> String {
        let seq = self.order_seq.fetch_add(1, Ordering::Relaxed);
        format!("LND-{seq:06}")
    }
}
