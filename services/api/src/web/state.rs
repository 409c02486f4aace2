//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use huella_core::ports::{AccountStore, MediaHost, ReportStore};
use huella_core::ReportService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<dyn ReportStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub media: Arc<dyn MediaHost>,
    pub report_service: Arc<ReportService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        accounts: Arc<dyn AccountStore>,
        media: Arc<dyn MediaHost>,
        config: Arc<Config>,
    ) -> Self {
        let report_service = Arc::new(ReportService::new(reports.clone(), media.clone()));
        Self {
            reports,
            accounts,
            media,
            report_service,
            config,
        }
    }
}
