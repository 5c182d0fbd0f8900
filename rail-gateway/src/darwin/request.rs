//! Board request parameters.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Europe::London;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Crs;

/// Default number of services requested from a board.
pub const DEFAULT_NUM_ROWS: u8 = 10;

/// Largest number of services Darwin will return.
pub const MAX_NUM_ROWS: u8 = 150;

/// Service types asked for on staff boards: passenger, bus and ship.
pub const DEFAULT_STAFF_SERVICES: &str = "PBS";

/// Widest window, in minutes, the staff boards accept.
pub const MAX_STAFF_TIME_WINDOW: u16 = 1440;

/// Which side of a station's timetable a board shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    #[default]
    Departures,
    Arrivals,
    /// Arrivals and departures together.
    All,
}

impl BoardKind {
    /// Darwin operation name for this kind of board.
    pub fn operation(self, expand: bool) -> &'static str {
        match (self, expand) {
            (BoardKind::Departures, true) => "GetDepBoardWithDetails",
            (BoardKind::Arrivals, true) => "GetArrBoardWithDetails",
            (BoardKind::All, true) => "GetArrDepBoardWithDetails",
            (BoardKind::Departures, false) => "GetDepartureBoard",
            (BoardKind::Arrivals, false) => "GetArrivalBoard",
            (BoardKind::All, false) => "GetArrivalDepartureBoard",
        }
    }
}

/// Which call produced a station board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BoardShape {
    pub kind: BoardKind,
    pub expanded: bool,
}

/// Staff boards listing one departure per filter station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeparturesKind {
    /// The next train to each filter station.
    #[default]
    Next,
    /// The train arriving first at each filter station.
    Fastest,
}

impl DeparturesKind {
    /// Darwin staff operation name for this board.
    pub fn operation(self, expand: bool) -> &'static str {
        match (self, expand) {
            (DeparturesKind::Next, true) => "GetNextDeparturesWithDetailsByCRS",
            (DeparturesKind::Next, false) => "GetNextDeparturesByCRS",
            (DeparturesKind::Fastest, true) => "GetFastestDeparturesWithDetailsByCRS",
            (DeparturesKind::Fastest, false) => "GetFastestDeparturesByCRS",
        }
    }

    /// Most filter stations Darwin accepts in one call.
    pub fn max_filters(self, expand: bool) -> usize {
        match (self, expand) {
            (_, true) => 10,
            (DeparturesKind::Next, false) => 25,
            (DeparturesKind::Fastest, false) => 15,
        }
    }
}

/// Which call produced a departures board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DeparturesShape {
    pub kind: DeparturesKind,
    pub expanded: bool,
}

/// Direction of a board filter.
///
/// `To` keeps services that call at the filter station after this one;
/// `From` keeps services that called there before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    To,
    From,
}

/// Error returned for a filter direction other than `to` or `from`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter type: {0:?} (expected \"to\" or \"from\")")]
pub struct InvalidFilterType(pub String);

impl FilterType {
    /// Parse a filter direction, ignoring case.
    pub fn parse(s: &str) -> Result<Self, InvalidFilterType> {
        if s.eq_ignore_ascii_case("to") {
            Ok(FilterType::To)
        } else if s.eq_ignore_ascii_case("from") {
            Ok(FilterType::From)
        } else {
            Err(InvalidFilterType(s.to_string()))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::To => "to",
            FilterType::From => "from",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a single station board call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRequest {
    pub kind: BoardKind,
    pub crs: Crs,
    pub filter_crs: Option<Crs>,
    pub filter_type: FilterType,
    pub num_rows: u8,
    /// Minutes offset from now (-120 to 120).
    pub time_offset: i16,
    /// Minutes window for results (0 to 120).
    pub time_window: u16,
    /// Whether to ask for calling points on every service.
    pub expand: bool,
    /// Darwin key to use instead of the configured one.
    pub access_token: Option<String>,
}

impl BoardRequest {
    /// An unfiltered, unexpanded board with Darwin's default window.
    pub fn new(kind: BoardKind, crs: Crs) -> Self {
        Self {
            kind,
            crs,
            filter_crs: None,
            filter_type: FilterType::To,
            num_rows: DEFAULT_NUM_ROWS,
            time_offset: 0,
            time_window: 120,
            expand: false,
            access_token: None,
        }
    }

    /// Filter the board to services calling at `crs`.
    pub fn with_filter(mut self, crs: Crs, filter_type: FilterType) -> Self {
        self.filter_crs = Some(crs);
        self.filter_type = filter_type;
        self
    }

    /// Number of rows, clamped to what Darwin accepts.
    pub fn with_num_rows(mut self, n: u8) -> Self {
        self.num_rows = n.clamp(1, MAX_NUM_ROWS);
        self
    }

    pub fn with_time_offset(mut self, minutes: i16) -> Self {
        self.time_offset = minutes.clamp(-120, 120);
        self
    }

    pub fn with_time_window(mut self, minutes: u16) -> Self {
        self.time_window = minutes.min(120);
        self
    }

    pub fn expanded(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn shape(&self) -> BoardShape {
        BoardShape {
            kind: self.kind,
            expanded: self.expand,
        }
    }

    /// Query parameters for the Darwin REST call.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("numRows", self.num_rows.to_string()),
            ("timeOffset", self.time_offset.to_string()),
            ("timeWindow", self.time_window.to_string()),
        ];
        if let Some(filter) = &self.filter_crs {
            query.push(("filterCrs", filter.as_str().to_string()));
            query.push(("filterType", self.filter_type.as_str().to_string()));
        }
        query
    }
}

/// Error returned for a departures board without any filter station.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at least one filter station is required")]
pub struct EmptyFilterList;

/// Parameters for a staff next or fastest departures call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeparturesRequest {
    pub kind: DeparturesKind,
    pub crs: Crs,
    /// Destinations, without duplicates, in the order given.
    pub filter_list: Vec<Crs>,
    /// Minutes from now (-120 to 119).
    pub time_offset: i16,
    /// Minutes window for results (0 to 1440).
    pub time_window: u16,
    pub expand: bool,
    /// Service types to include, e.g. `P` for passenger trains only.
    pub services: String,
    /// Darwin key to use instead of the configured one.
    pub access_token: Option<String>,
}

impl DeparturesRequest {
    pub fn new(
        kind: DeparturesKind,
        crs: Crs,
        filters: impl IntoIterator<Item = Crs>,
    ) -> Result<Self, EmptyFilterList> {
        let mut filter_list: Vec<Crs> = Vec::new();
        for crs in filters {
            if !filter_list.contains(&crs) {
                filter_list.push(crs);
            }
        }
        if filter_list.is_empty() {
            return Err(EmptyFilterList);
        }

        Ok(Self {
            kind,
            crs,
            filter_list,
            time_offset: 0,
            time_window: 120,
            expand: false,
            services: DEFAULT_STAFF_SERVICES.to_string(),
            access_token: None,
        })
    }

    pub fn with_time_offset(mut self, minutes: i16) -> Self {
        self.time_offset = minutes.clamp(-120, 119);
        self
    }

    pub fn with_time_window(mut self, minutes: u16) -> Self {
        self.time_window = minutes.min(MAX_STAFF_TIME_WINDOW);
        self
    }

    pub fn expanded(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_services(mut self, services: impl Into<String>) -> Self {
        self.services = services.into();
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn shape(&self) -> DeparturesShape {
        DeparturesShape {
            kind: self.kind,
            expanded: self.expand,
        }
    }

    /// Filter stations sent to Darwin, cut to what the call accepts.
    pub fn filters(&self) -> &[Crs] {
        let max = self.kind.max_filters(self.expand);
        if self.filter_list.len() > max {
            warn!(
                crs = %self.crs,
                requested = self.filter_list.len(),
                max,
                "filter list truncated"
            );
        }
        &self.filter_list[..self.filter_list.len().min(max)]
    }

    /// Path argument for the call: station, filter list and UK-local time.
    pub fn path_arg(&self, now: DateTime<Utc>) -> String {
        let time = (now + TimeDelta::minutes(i64::from(self.time_offset)))
            .with_timezone(&London)
            .format("%Y-%m-%dT%H:%M:%S");
        let filters: Vec<&str> = self.filters().iter().map(Crs::as_str).collect();
        format!("{}/{}/{time}", self.crs, filters.join(","))
    }

    /// Query parameters for the Darwin REST call.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("timeWindow", self.time_window.to_string()),
            ("services", self.services.clone()),
        ]
    }
}

/// Parameters for a service details call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// Service ID, or RID for the staff lookup.
    pub id: String,
    /// Darwin key to use instead of the configured one.
    pub access_token: Option<String>,
}

impl ServiceRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn crs(s: &str) -> Crs {
        Crs::parse(s).unwrap()
    }

    #[test]
    fn filter_type_parse() {
        assert_eq!(FilterType::parse("to").unwrap(), FilterType::To);
        assert_eq!(FilterType::parse("FROM").unwrap(), FilterType::From);
        let err = FilterType::parse("via").unwrap_err();
        assert_eq!(err, InvalidFilterType("via".into()));
    }

    #[test]
    fn filter_type_default_is_to() {
        assert_eq!(FilterType::default(), FilterType::To);
    }

    #[test]
    fn operation_names() {
        assert_eq!(
            BoardKind::Departures.operation(true),
            "GetDepBoardWithDetails"
        );
        assert_eq!(BoardKind::Arrivals.operation(false), "GetArrivalBoard");
        assert_eq!(
            BoardKind::All.operation(true),
            "GetArrDepBoardWithDetails"
        );
    }

    #[test]
    fn unfiltered_query() {
        let req = BoardRequest::new(BoardKind::Departures, crs("PAD"));
        let query = req.query();
        assert_eq!(query.len(), 3);
        assert!(query.contains(&("numRows", "10".to_string())));
    }

    #[test]
    fn filtered_query() {
        let req = BoardRequest::new(BoardKind::Arrivals, crs("BTN"))
            .with_filter(crs("VIC"), FilterType::From)
            .with_num_rows(20);
        let query = req.query();
        assert!(query.contains(&("filterCrs", "VIC".to_string())));
        assert!(query.contains(&("filterType", "from".to_string())));
        assert!(query.contains(&("numRows", "20".to_string())));
    }

    #[test]
    fn builder_clamps() {
        let req = BoardRequest::new(BoardKind::All, crs("KGX"))
            .with_num_rows(0)
            .with_time_offset(-500)
            .with_time_window(999);
        assert_eq!(req.num_rows, 1);
        assert_eq!(req.time_offset, -120);
        assert_eq!(req.time_window, 120);

        let req = req.with_num_rows(200);
        assert_eq!(req.num_rows, MAX_NUM_ROWS);
    }

    #[test]
    fn board_shape_follows_request() {
        let req = BoardRequest::new(BoardKind::Arrivals, crs("BTN")).expanded(true);
        assert_eq!(
            req.shape(),
            BoardShape {
                kind: BoardKind::Arrivals,
                expanded: true
            }
        );
        assert_ne!(
            req.shape(),
            BoardRequest::new(BoardKind::Departures, crs("BTN"))
                .expanded(true)
                .shape()
        );
    }

    #[test]
    fn departures_need_a_filter() {
        let none: Vec<Crs> = Vec::new();
        assert_eq!(
            DeparturesRequest::new(DeparturesKind::Next, crs("BTN"), none),
            Err(EmptyFilterList)
        );
    }

    #[test]
    fn departures_filters_deduplicated_and_capped() {
        let req = DeparturesRequest::new(
            DeparturesKind::Next,
            crs("BTN"),
            [crs("VIC"), crs("LBG"), crs("VIC")],
        )
        .unwrap();
        assert_eq!(req.filter_list, [crs("VIC"), crs("LBG")]);

        let many: Vec<Crs> = (0..40u8)
            .map(|i| crs(&format!("{}{}Z", (b'A' + i / 26) as char, (b'A' + i % 26) as char)))
            .collect();
        let req = DeparturesRequest::new(DeparturesKind::Fastest, crs("BTN"), many.clone()).unwrap();
        assert_eq!(req.filter_list.len(), 40);
        assert_eq!(req.filters().len(), 15);

        let req = DeparturesRequest::new(DeparturesKind::Next, crs("BTN"), many.clone()).unwrap();
        assert_eq!(req.filters().len(), 25);
        assert_eq!(req.expanded(true).filters().len(), 10);
    }

    #[test]
    fn departures_path_uses_uk_time() {
        let req = DeparturesRequest::new(DeparturesKind::Next, crs("BTN"), [crs("VIC"), crs("LBG")])
            .unwrap()
            .with_time_offset(30);
        // 10:00 UTC in July is 11:00 BST
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap();
        assert_eq!(req.path_arg(now), "BTN/VIC,LBG/2024-07-01T11:30:00");

        let query = req.query();
        assert!(query.contains(&("timeWindow", "120".to_string())));
        assert!(query.contains(&("services", "PBS".to_string())));
    }

    #[test]
    fn departures_clamps() {
        let req = DeparturesRequest::new(DeparturesKind::Fastest, crs("BTN"), [crs("VIC")])
            .unwrap()
            .with_time_offset(120)
            .with_time_window(5000);
        assert_eq!(req.time_offset, 119);
        assert_eq!(req.time_window, MAX_STAFF_TIME_WINDOW);
        assert_eq!(
            DeparturesKind::Fastest.operation(true),
            "GetFastestDeparturesWithDetailsByCRS"
        );
    }
}
