pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use chrono::Duration;

use crate::{
    db::{CanvasRepository, CoupleRepository, MemoryStore, Notifier},
    routes::AppState,
    services::{CornerService, PairingService},
};

/// Wires both services onto one store
pub fn build_state<R>(store: R, notifier: Notifier, invite_ttl: Duration) -> Arc<AppState>
where
    R: CoupleRepository + CanvasRepository + Clone + 'static,
{
    let couples: Arc<dyn CoupleRepository> = Arc::new(store.clone());
    let canvas: Arc<dyn CanvasRepository> = Arc::new(store);

    Arc::new(AppState {
        corner: CornerService::new(couples.clone(), canvas, notifier),
        pairing: PairingService::new(couples, invite_ttl),
    })
}

/// State backed by a fresh in-memory store with notifications disabled
pub fn memory_state(store: MemoryStore) -> Arc<AppState> {
    build_state(store, Notifier::disabled(), Duration::hours(24))
}
