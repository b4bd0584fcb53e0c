use std::sync::Arc;

use kiosk_client::ReqwestFetcher;
use kiosk_core::{ScriptSandbox, Scheduler};
use kiosk_db::{Database, SettingsRepository, SourceRepository};

/// The scheduler as wired in production: sqlite stores, reqwest fetcher,
/// rhai sandbox.
pub type KioskScheduler =
    Scheduler<SourceRepository, ReqwestFetcher, ScriptSandbox, SettingsRepository>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub scheduler: Arc<KioskScheduler>,
    /// API key for the /v1 endpoints (None = auth disabled, local use).
    pub api_key: Option<String>,
}
