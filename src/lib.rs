//! accessctl - resource ownership and access control declarations for container environments

pub mod access_control;
pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod store;
pub mod websocket;

use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            store: store::Store::new(pool),
        })
    }
}
