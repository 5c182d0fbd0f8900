//! Application state for the web layer.

use std::sync::Arc;

use crate::darwin::{AccessTokens, BoardFetcher, DeparturesFetcher, ServiceDetailsFetcher};
use crate::delays::DelayAnalyzer;
use crate::stations::StationNames;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Source of station boards
    pub boards: Arc<dyn BoardFetcher>,

    /// Source of service details
    pub services: Arc<dyn ServiceDetailsFetcher>,

    /// Source of staff next and fastest departures boards
    pub departures: Arc<dyn DeparturesFetcher>,

    /// Delay summaries over `boards`
    pub delays: DelayAnalyzer,

    /// Station list for name lookups
    pub stations: StationNames,

    /// Which Darwin key each request is served with
    pub access: AccessTokens,
}

impl AppState {
    /// Create a new app state with the default delay threshold.
    pub fn new(
        boards: Arc<dyn BoardFetcher>,
        services: Arc<dyn ServiceDetailsFetcher>,
        departures: Arc<dyn DeparturesFetcher>,
        stations: StationNames,
    ) -> Self {
        let delays = DelayAnalyzer::new(boards.clone(), Arc::new(stations.clone()));
        Self {
            boards,
            services,
            departures,
            delays,
            stations,
            access: AccessTokens::default(),
        }
    }

    /// Require `token` before serving requests with the gateway's own keys.
    pub fn with_client_token(mut self, token: impl Into<String>) -> Self {
        self.access = AccessTokens::new(token);
        self
    }

    /// Set the minutes late before a service counts as delayed.
    pub fn with_delay_threshold(mut self, minutes: i64) -> Self {
        self.delays = self.delays.with_threshold(minutes);
        self
    }
}
