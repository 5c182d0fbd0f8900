//! Delay summary response.

use serde::{Deserialize, Serialize};

use crate::darwin::{FilterType, ServiceItemWithCallingPoints};

/// Delay summary for one board, as returned to clients.
///
/// The default value is the zero summary returned when there is nothing to
/// report: no board was fetched, or Darwin's reply was unusable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelaysResponse {
    /// Generation time of the underlying board; empty for the zero summary.
    pub generated_at: String,

    #[serde(flatten)]
    pub summary: DelaysSummary,
}

/// Everything in a delay summary apart from its generation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelaysSummary {
    pub location_name: String,
    pub crs: String,
    pub filter_location_name: Option<String>,
    pub filtercrs: Option<String>,
    pub filter_type: Option<FilterType>,

    /// True when trains are delayed, buses replace trains, or there are
    /// service messages.
    pub delays: bool,

    pub total_trains_delayed: u32,

    /// Sum of minutes late over services with parseable times; early
    /// running counts negative.
    pub total_delay_minutes: i64,

    /// Services left after filtering.
    pub total_trains: u32,

    pub delayed_trains: Vec<ServiceItemWithCallingPoints>,
}

impl DelaysResponse {
    /// Whether this is the zero summary.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_summary_json() {
        let value = serde_json::to_value(DelaysResponse::default()).unwrap();
        assert_eq!(value["generatedAt"], "");
        assert_eq!(value["delays"], false);
        assert_eq!(value["totalTrains"], 0);
        assert_eq!(value["totalDelayMinutes"], 0);
        assert_eq!(value["filtercrs"], serde_json::Value::Null);
        assert_eq!(value["delayedTrains"], serde_json::json!([]));
    }

    #[test]
    fn field_names() {
        let response = DelaysResponse {
            generated_at: "2024-03-15T22:30:00Z".into(),
            summary: DelaysSummary {
                location_name: "Brighton".into(),
                crs: "BTN".into(),
                filter_location_name: Some("London".into()),
                filtercrs: Some("LON".into()),
                filter_type: Some(FilterType::To),
                delays: true,
                total_trains_delayed: 2,
                total_delay_minutes: 21,
                total_trains: 3,
                delayed_trains: Vec::new(),
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["filterLocationName"], "London");
        assert_eq!(value["filterType"], "to");
        assert_eq!(value["totalTrainsDelayed"], 2);
        assert!(!response.is_empty());
    }
}
