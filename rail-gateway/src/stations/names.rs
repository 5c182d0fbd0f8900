//! Station name lookup.
//!
//! The list is loaded in the background after startup, so every lookup has
//! to cope with it not being there yet. [`StationNames::resolve`] reports
//! that case explicitly instead of guessing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::Crs;

use super::client::{StationClient, StationDto};
use super::error::StationError;
use super::london::{LondonTerminals, london_terminal_codes};

/// Query that lists the London terminals instead of searching by name.
const LONDON_TERMINALS_QUERY: &str = "London Terminals";

/// A station as returned by the station search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub crs_code: Crs,
    pub station_name: String,
}

/// Outcome of turning a caller's station query into a CRS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsResolution {
    /// The query named this station.
    Code(Crs),
    /// The station list has not been loaded yet.
    NotReady,
    /// Nothing in the station list matched.
    Unknown,
}

#[derive(Debug, Default)]
struct Lookup {
    by_code: HashMap<Crs, String>,
    /// Upper-cased name → code, ordered so partial matches are stable.
    by_name: BTreeMap<String, Crs>,
}

impl Lookup {
    fn build(stations: Vec<StationDto>) -> Self {
        let mut lookup = Lookup::default();
        for station in stations {
            // The API returns lowercase CRS codes in places
            let Ok(crs) = Crs::parse_normalized(&station.crs_code) else {
                continue;
            };
            let name = station.name.trim().to_string();
            lookup.by_name.insert(name.to_uppercase(), crs);
            lookup.by_code.insert(crs, name);
        }
        lookup
    }

    fn record(&self, crs: Crs) -> StationRecord {
        StationRecord {
            crs_code: crs,
            station_name: self
                .by_code
                .get(&crs)
                .cloned()
                .unwrap_or_else(|| crs.to_string()),
        }
    }
}

/// Thread-safe station name lookup.
///
/// Provides CRS ↔ station name mapping with support for background refresh
/// and an observable ready state.
#[derive(Clone)]
pub struct StationNames {
    inner: Arc<RwLock<Lookup>>,
    ready: Arc<watch::Sender<bool>>,
    client: Option<StationClient>,
}

impl StationNames {
    /// Create an empty, not-yet-ready lookup that loads from `client`.
    pub fn new(client: StationClient) -> Self {
        Self::with_client(Some(client))
    }

    /// Create a lookup that is ready immediately with the given stations.
    pub fn from_stations(stations: Vec<StationDto>) -> Self {
        let mut names = Self::with_client(None);
        let lookup = Lookup::build(stations);
        names.ready.send_replace(!lookup.by_code.is_empty());
        names.inner = Arc::new(RwLock::new(lookup));
        names
    }

    fn with_client(client: Option<StationClient>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(RwLock::new(Lookup::default())),
            ready: Arc::new(ready),
            client,
        }
    }

    /// Whether the station list has been loaded.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the station list has been loaded.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only ends when ready.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Fetch the station list and replace the current one.
    ///
    /// On failure the existing list (and ready state) is preserved and the
    /// error is returned.
    pub async fn load(&self) -> Result<usize, StationError> {
        let client = self.client.as_ref().ok_or(StationError::NoClient)?;
        let stations = client.fetch_all().await?;
        let lookup = Lookup::build(stations);
        let count = lookup.by_code.len();
        if count == 0 {
            return Err(StationError::Empty);
        }

        *self.inner.write().await = lookup;
        self.ready.send_replace(true);

        Ok(count)
    }

    /// Load now, then reload on every `interval`, logging failures.
    pub fn spawn_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let names = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match names.load().await {
                    Ok(count) => info!(count, "loaded station list"),
                    Err(e) => warn!(error = %e, "failed to load station list"),
                }
            }
        })
    }

    /// Look up a station name by CRS code.
    pub async fn get(&self, crs: &Crs) -> Option<String> {
        let guard = self.inner.read().await;
        guard.by_code.get(crs).cloned()
    }

    /// Get the number of stations in the lookup.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_code.len()
    }

    /// Check if the lookup is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_code.is_empty()
    }

    /// Turn a CRS code or station name into a CRS code.
    ///
    /// Tries, in order: a known code, an exact name, then the first name
    /// (alphabetically) containing the query. Case is ignored throughout.
    pub async fn resolve(&self, query: &str) -> CrsResolution {
        let query = query.trim();
        if query.is_empty() {
            return CrsResolution::Unknown;
        }
        if !self.is_ready() {
            return CrsResolution::NotReady;
        }

        let upper = query.to_uppercase();
        let guard = self.inner.read().await;

        if let Ok(crs) = Crs::parse(&upper)
            && guard.by_code.contains_key(&crs)
        {
            return CrsResolution::Code(crs);
        }

        if let Some(crs) = guard.by_name.get(&upper) {
            return CrsResolution::Code(*crs);
        }

        guard
            .by_name
            .iter()
            .find(|(name, _)| name.contains(&upper))
            .map(|(_, crs)| CrsResolution::Code(*crs))
            .unwrap_or(CrsResolution::Unknown)
    }

    /// Stations whose name contains `query`, sorted by name.
    ///
    /// An empty query lists every station; "London Terminals" lists the
    /// London terminals.
    pub async fn search(&self, query: Option<&str>) -> Vec<StationRecord> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());

        if query.is_some_and(|q| q.eq_ignore_ascii_case(LONDON_TERMINALS_QUERY)) {
            return self.london_terminal_records().await;
        }

        let guard = self.inner.read().await;
        let upper = query.map(str::to_uppercase);
        let mut records: Vec<StationRecord> = guard
            .by_code
            .iter()
            .filter(|(_, name)| {
                upper
                    .as_deref()
                    .is_none_or(|q| name.to_uppercase().contains(q))
            })
            .map(|(crs, name)| StationRecord {
                crs_code: *crs,
                station_name: name.clone(),
            })
            .collect();

        records.sort_by(|a, b| {
            a.station_name
                .cmp(&b.station_name)
                .then(a.crs_code.cmp(&b.crs_code))
        });
        records
    }

    /// The London terminals, named from the station list when it is loaded.
    pub async fn london_terminal_records(&self) -> Vec<StationRecord> {
        let guard = self.inner.read().await;
        let mut records: Vec<StationRecord> = london_terminal_codes()
            .into_iter()
            .map(|crs| guard.record(crs))
            .collect();
        records.sort_by(|a, b| a.station_name.cmp(&b.station_name));
        records
    }
}

impl LondonTerminals for StationNames {
    fn london_terminals(&self) -> HashSet<Crs> {
        london_terminal_codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::client::StationClientConfig;

    fn dto(crs: &str, name: &str) -> StationDto {
        StationDto {
            crs_code: crs.to_string(),
            name: name.to_string(),
        }
    }

    fn crs(s: &str) -> Crs {
        Crs::parse(s).unwrap()
    }

    fn sample() -> StationNames {
        StationNames::from_stations(vec![
            dto("BTN", "Brighton"),
            dto("VIC", "London Victoria"),
            dto("kgx", "London Kings Cross"),
            dto("CLJ", "Clapham Junction"),
            dto("invalid", "Bad Station"),
        ])
    }

    #[tokio::test]
    async fn build_filters_invalid_crs() {
        let names = sample();
        assert_eq!(names.len().await, 4);
        assert_eq!(
            names.get(&crs("KGX")).await.as_deref(),
            Some("London Kings Cross")
        );
    }

    #[tokio::test]
    async fn resolve_code_then_name_then_partial() {
        let names = sample();
        assert_eq!(names.resolve("btn").await, CrsResolution::Code(crs("BTN")));
        assert_eq!(
            names.resolve("clapham junction").await,
            CrsResolution::Code(crs("CLJ"))
        );
        // "LONDON KINGS CROSS" sorts before "LONDON VICTORIA"
        assert_eq!(
            names.resolve("London").await,
            CrsResolution::Code(crs("KGX"))
        );
        assert_eq!(names.resolve("Nowhere").await, CrsResolution::Unknown);
        assert_eq!(names.resolve("  ").await, CrsResolution::Unknown);
    }

    #[tokio::test]
    async fn not_ready_until_loaded() {
        let client = StationClient::new(StationClientConfig::new("k")).unwrap();
        let names = StationNames::new(client);
        assert!(!names.is_ready());
        assert_eq!(names.resolve("BTN").await, CrsResolution::NotReady);
        assert!(names.search(None).await.is_empty());
    }

    #[tokio::test]
    async fn load_without_client_keeps_state() {
        let names = sample();
        assert!(matches!(names.load().await, Err(StationError::NoClient)));
        assert!(names.is_ready());
        assert_eq!(names.len().await, 4);
    }

    #[tokio::test]
    async fn wait_ready_returns_when_loaded() {
        let names = sample();
        tokio::time::timeout(Duration::from_secs(1), names.wait_ready())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn search_sorts_by_name() {
        let names = sample();
        let all: Vec<_> = names
            .search(None)
            .await
            .into_iter()
            .map(|r| r.station_name)
            .collect();
        assert_eq!(
            all,
            [
                "Brighton",
                "Clapham Junction",
                "London Kings Cross",
                "London Victoria"
            ]
        );

        let london = names.search(Some("london")).await;
        assert_eq!(london.len(), 2);
        assert_eq!(london[0].crs_code, crs("KGX"));
    }

    #[tokio::test]
    async fn search_london_terminals() {
        let names = sample();
        let terminals = names.search(Some("london terminals")).await;
        assert_eq!(terminals.len(), 18);
        let victoria = terminals
            .iter()
            .find(|r| r.crs_code == crs("VIC"))
            .unwrap();
        assert_eq!(victoria.station_name, "London Victoria");
        // Unknown to the list, so named by code
        let waterloo = terminals
            .iter()
            .find(|r| r.crs_code == crs("WAT"))
            .unwrap();
        assert_eq!(waterloo.station_name, "WAT");
    }

    #[test]
    fn record_serializes_like_station_list() {
        let record = StationRecord {
            crs_code: crs("BTN"),
            station_name: "Brighton".into(),
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"crsCode":"BTN","stationName":"Brighton"}"#
        );
    }
}
