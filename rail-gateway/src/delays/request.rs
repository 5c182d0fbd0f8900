//! Delay query parameters.

use crate::darwin::{BoardKind, BoardRequest, DEFAULT_NUM_ROWS, FilterType};
use crate::domain::{ClockTime, Crs};

/// Station a delay query is filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    /// Any of the London terminals.
    London,
    /// A single station, filtered by Darwin itself.
    Station(Crs),
}

/// A request for a delay summary at one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelaysRequest {
    pub crs: Crs,
    pub filter: Option<FilterTarget>,
    pub filter_type: FilterType,
    pub num_rows: u8,
    pub time_offset: i16,
    pub time_window: u16,
    /// Scheduled departures of interest, as given by the caller (`HHmm,HHmm`).
    pub std: Option<String>,
    /// Darwin key to use instead of the configured one.
    pub access_token: Option<String>,
}

impl DelaysRequest {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            filter: None,
            filter_type: FilterType::To,
            num_rows: DEFAULT_NUM_ROWS,
            time_offset: 0,
            time_window: 120,
            std: None,
            access_token: None,
        }
    }

    pub fn with_filter(mut self, target: FilterTarget, filter_type: FilterType) -> Self {
        self.filter = Some(target);
        self.filter_type = filter_type;
        self
    }

    pub fn with_num_rows(mut self, n: u8) -> Self {
        self.num_rows = n;
        self
    }

    pub fn with_std(mut self, std: impl Into<String>) -> Self {
        self.std = Some(std.into());
        self
    }

    pub fn with_time_offset(mut self, minutes: i16) -> Self {
        self.time_offset = minutes;
        self
    }

    pub fn with_time_window(mut self, minutes: u16) -> Self {
        self.time_window = minutes;
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    /// Whether the filter means "any London terminal".
    pub fn filters_on_london(&self) -> bool {
        self.filter == Some(FilterTarget::London)
    }

    /// The requested departure times that parse; the rest are ignored.
    pub fn parsed_stds(&self) -> Vec<ClockTime> {
        self.std
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| ClockTime::parse_compact(s.trim()).ok())
            .collect()
    }

    /// The expanded board this query needs.
    ///
    /// A London filter can't be expressed to Darwin, so the board is fetched
    /// unfiltered and filtered afterwards.
    pub fn board_request(&self) -> BoardRequest {
        let request = BoardRequest::new(BoardKind::All, self.crs)
            .with_num_rows(self.num_rows)
            .with_time_offset(self.time_offset)
            .with_time_window(self.time_window)
            .with_access_token(self.access_token.clone())
            .expanded(true);

        match self.filter {
            Some(FilterTarget::Station(crs)) => request.with_filter(crs, self.filter_type),
            Some(FilterTarget::London) | None => request,
        }
    }
}
