pub mod amount;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod readers;
pub mod tx;
pub mod units;
pub mod view;
pub mod wallet;

use std::sync::Arc;

pub use error::AppError;

/// Shared state handed to the HTTP handlers: the active session plus the
/// static configuration the dashboard bootstraps from.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<view::session::AutopilotSession>,
    pub settings: config::Settings,
    pub contracts: config::registry::ContractAddresses,
}
