//! Delay summaries from station boards.
//!
//! A summary answers "is my train late?" for commuters: how many of the
//! services on a board are delayed or cancelled, and by how much in total.
//! Callers may narrow the board to London-bound (or London-origin) services
//! and to specific scheduled departures.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Europe::London;
use tracing::{debug, error};

use crate::darwin::{
    BoardContent, BoardFetcher, FilterType, ServiceItemWithCallingPoints, StationBoard,
};
use crate::domain::{ClockTime, Crs};
use crate::stations::LondonTerminals;

use super::error::DelaysError;
use super::request::DelaysRequest;
use super::response::{DelaysResponse, DelaysSummary};

/// Minutes late before a service counts as delayed.
pub const DEFAULT_DELAY_THRESHOLD_MINUTES: i64 = 5;

/// How far ahead of now a requested departure may be and still be looked up.
const STD_WINDOW_AHEAD_MINUTES: i64 = 2 * 60;

/// How far behind now a requested departure may be and still be looked up.
const STD_WINDOW_BEHIND_MINUTES: i64 = 60;

/// Estimate text Darwin uses for a service running to time.
const ON_TIME: &str = "On time";

/// Estimate texts that mark a service as disrupted without a time.
const DISRUPTED_ESTIMATES: [&str; 3] = ["Delayed", "Canceled", "Cancelled"];

/// What a single service contributes to the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assessment {
    /// Reported on time; ignored entirely.
    OnTime,
    /// Cancelled or delayed with no estimate.
    Disrupted,
    /// Minutes between schedule and estimate (negative when early).
    Running(i64),
    /// No usable estimate, e.g. "No Report" or "Starts Here".
    Unknown,
}

fn assess(service: &ServiceItemWithCallingPoints) -> Assessment {
    let estimates: Vec<&str> = [service.etd.as_deref(), service.eta.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !estimates.is_empty() && estimates.iter().all(|e| e.eq_ignore_ascii_case(ON_TIME)) {
        return Assessment::OnTime;
    }

    let estimate = service
        .etd
        .as_deref()
        .or(service.eta.as_deref())
        .unwrap_or_default();
    let scheduled = service
        .std
        .as_deref()
        .or(service.sta.as_deref())
        .unwrap_or_default();

    if service.is_cancelled
        || service.filter_location_cancelled
        || DISRUPTED_ESTIMATES
            .iter()
            .any(|word| estimate.eq_ignore_ascii_case(word))
    {
        return Assessment::Disrupted;
    }

    // A trailing or leading "*" marks an overdue report
    let estimate = estimate.replace('*', "");
    match (
        ClockTime::parse_hhmm(estimate.trim()),
        ClockTime::parse_hhmm(scheduled.trim()),
    ) {
        (Ok(est), Ok(sched)) => Assessment::Running(est.minutes_since(sched)),
        _ => Assessment::Unknown,
    }
}

/// Whether `service` calls at one of `terminals` on the side given by `filter_type`.
fn calls_at_any(
    service: &ServiceItemWithCallingPoints,
    filter_type: FilterType,
    terminals: &HashSet<Crs>,
) -> bool {
    let is_terminal = |crs: &str| {
        Crs::parse_normalized(crs).is_ok_and(|crs| terminals.contains(&crs))
    };
    match filter_type {
        FilterType::To => service.subsequent_calls().any(|cp| is_terminal(&cp.crs)),
        FilterType::From => service.previous_calls().any(|cp| is_terminal(&cp.crs)),
    }
}

/// Whether a requested departure is close enough to now to look up.
fn within_window(std: ClockTime, now: ClockTime) -> bool {
    let diff = std.minutes_since(now);
    (-STD_WINDOW_BEHIND_MINUTES..=STD_WINDOW_AHEAD_MINUTES).contains(&diff)
}

/// Builds delay summaries from boards fetched on demand.
#[derive(Clone)]
pub struct DelayAnalyzer {
    fetcher: Arc<dyn BoardFetcher>,
    terminals: Arc<dyn LondonTerminals>,
    threshold_minutes: i64,
}

impl DelayAnalyzer {
    pub fn new(fetcher: Arc<dyn BoardFetcher>, terminals: Arc<dyn LondonTerminals>) -> Self {
        Self {
            fetcher,
            terminals,
            threshold_minutes: DEFAULT_DELAY_THRESHOLD_MINUTES,
        }
    }

    /// Set the minutes late before a service counts as delayed.
    pub fn with_threshold(mut self, minutes: i64) -> Self {
        self.threshold_minutes = minutes;
        self
    }

    /// Summarise delays for a request, as of now.
    pub async fn analyze(&self, request: &DelaysRequest) -> Result<DelaysResponse, DelaysError> {
        self.analyze_at(request, Utc::now()).await
    }

    /// Summarise delays for a request, as of `now`.
    ///
    /// Returns the zero summary without fetching anything when every
    /// requested departure is too far from now to be on a board. A reply
    /// from Darwin that isn't a board also gives the zero summary; any
    /// other upstream failure is returned as an error.
    pub async fn analyze_at(
        &self,
        request: &DelaysRequest,
        now: DateTime<Utc>,
    ) -> Result<DelaysResponse, DelaysError> {
        let stds = request.parsed_stds();
        if !stds.is_empty() {
            let uk_now = ClockTime::from_time(now.with_timezone(&London).time());
            if stds.iter().all(|std| !within_window(*std, uk_now)) {
                debug!(
                    crs = %request.crs,
                    now = %uk_now,
                    "all requested departures outside window, skipping board"
                );
                return Ok(DelaysResponse::default());
            }
        }

        let board = match self.fetcher.fetch_board(&request.board_request()).await {
            Ok(board) => board,
            Err(e) if e.is_shape_mismatch() => {
                error!(crs = %request.crs, error = %e, "failed to get board for delay calculation");
                return Ok(DelaysResponse::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.summarize(request, &stds, board))
    }

    fn summarize(
        &self,
        request: &DelaysRequest,
        stds: &[ClockTime],
        board: StationBoard,
    ) -> DelaysResponse {
        let StationBoard {
            generated_at,
            content,
            ..
        } = board;
        let BoardContent {
            location_name,
            crs,
            mut filter_location_name,
            mut filtercrs,
            mut filter_type,
            train_services,
            bus_services,
            nrcc_messages,
            ..
        } = content;

        let mut services = train_services.unwrap_or_default();
        let rail_replacement = services.is_empty() && bus_services.is_some_and(|b| !b.is_empty());
        let messages_present = nrcc_messages.is_some_and(|m| !m.is_empty());

        if request.filters_on_london() {
            filtercrs.get_or_insert_with(|| "LON".to_string());
            filter_location_name.get_or_insert_with(|| "London".to_string());
            filter_type = Some(request.filter_type);

            let terminals = self.terminals.london_terminals();
            services.retain(|s| calls_at_any(s, request.filter_type, &terminals));
        }

        if !stds.is_empty() {
            services.retain(|s| {
                s.std
                    .as_deref()
                    .and_then(|t| ClockTime::parse_hhmm(t).ok())
                    .is_some_and(|t| stds.contains(&t))
            });
        }

        let mut delayed_trains = Vec::new();
        let mut total_delay_minutes = 0;
        for service in &services {
            match assess(service) {
                Assessment::OnTime | Assessment::Unknown => {}
                Assessment::Disrupted => delayed_trains.push(service.clone()),
                Assessment::Running(late) => {
                    total_delay_minutes += late;
                    if late > self.threshold_minutes {
                        delayed_trains.push(service.clone());
                    }
                }
            }
        }

        debug!(
            crs = %crs,
            total = services.len(),
            delayed = delayed_trains.len(),
            total_delay_minutes,
            "computed delay summary"
        );

        DelaysResponse {
            generated_at,
            summary: DelaysSummary {
                location_name,
                crs,
                filter_location_name,
                filtercrs,
                filter_type,
                delays: !delayed_trains.is_empty() || rail_replacement || messages_present,
                total_trains_delayed: delayed_trains.len() as u32,
                total_delay_minutes,
                total_trains: services.len() as u32,
                delayed_trains,
            },
        }
    }
}
