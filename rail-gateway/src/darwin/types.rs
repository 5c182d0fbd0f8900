//! Darwin API response DTOs.
//!
//! These types map directly to the Darwin LDB JSON API responses and are
//! re-emitted to our own clients unchanged. They use `Option` liberally
//! because Darwin omits fields rather than sending null values in many cases.
//!
//! Every top-level response keeps its `generatedAt` timestamp apart from the
//! rest of the payload (`content`). The timestamp changes on every request,
//! and keeping it out of `content` lets the checksum module hash only the
//! data that matters.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::ServiceId;

use super::request::{BoardShape, DeparturesShape, FilterType};

/// Deserialize a field Darwin sometimes sends as `null`, falling back to the
/// default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response from any of the station board calls.
///
/// The `*WithDetails` calls include calling points for each service; the
/// plain calls leave them out but otherwise share this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationBoard {
    /// When this response was generated (ISO 8601 datetime).
    pub generated_at: String,

    /// The call that produced this board. Not part of Darwin's reply.
    #[serde(skip)]
    pub shape: BoardShape,

    #[serde(flatten)]
    pub content: BoardContent,
}

/// Everything on a station board apart from its generation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardContent {
    /// Human-readable name of the station.
    pub location_name: String,

    /// CRS code of the station.
    pub crs: String,

    /// Name of the filter location, when the board was filtered.
    pub filter_location_name: Option<String>,

    /// CRS code of the filter location. Darwin spells this in lowercase.
    pub filtercrs: Option<String>,

    /// Direction of the filter.
    pub filter_type: Option<FilterType>,

    /// Train services at this station.
    pub train_services: Option<Vec<ServiceItemWithCallingPoints>>,

    /// Bus replacement services.
    pub bus_services: Option<Vec<ServiceItemWithCallingPoints>>,

    /// Ferry services (rare).
    pub ferry_services: Option<Vec<ServiceItemWithCallingPoints>>,

    /// Whether platform information is available at this station.
    pub platform_available: Option<bool>,

    /// Whether services are available (false during disruption).
    pub are_services_available: Option<bool>,

    /// Network Rail communication messages.
    pub nrcc_messages: Option<Vec<NrccMessage>>,
}

impl BoardContent {
    /// Fill in the packed service ID forms on every service on the board.
    pub fn annotate_service_ids(&mut self) {
        let lists = [
            self.train_services.as_mut(),
            self.bus_services.as_mut(),
            self.ferry_services.as_mut(),
        ];
        for service in lists.into_iter().flatten().flatten() {
            service.annotate_service_id();
        }
    }
}

/// A service on a board, including calling points when requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItemWithCallingPoints {
    /// Darwin service ID. Only valid while on a departure board.
    #[serde(rename = "serviceID")]
    pub service_id: String,

    /// The service ID packed into a GUID, for older clients.
    #[serde(default)]
    pub service_id_guid: Option<String>,

    /// The service ID packed into 128 bits and base64url encoded.
    #[serde(default)]
    pub service_id_url_safe: Option<String>,

    /// Retail Service ID (headcode-like, e.g., "GW123400").
    pub rsid: Option<String>,

    /// Scheduled time of arrival at this station.
    pub sta: Option<String>,

    /// Estimated time of arrival at this station.
    pub eta: Option<String>,

    /// Scheduled time of departure from this station.
    pub std: Option<String>,

    /// Estimated time of departure from this station.
    /// May be "On time", "Delayed", "Cancelled", or a time like "10:15".
    pub etd: Option<String>,

    /// Platform number/letter.
    pub platform: Option<String>,

    /// Train operating company name.
    pub operator: Option<String>,

    /// Train operating company ATOC code.
    pub operator_code: Option<String>,

    /// Whether this service is cancelled.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_cancelled: bool,

    /// Whether the call at the filter location is cancelled.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter_location_cancelled: bool,

    /// Whether this is a circular route.
    pub is_circular_route: Option<bool>,

    /// Service type (train, bus, ferry).
    pub service_type: Option<ServiceType>,

    /// Train length in coaches.
    pub length: Option<i32>,

    /// Origin station(s).
    pub origin: Option<Vec<ServiceLocation>>,

    /// Destination station(s).
    pub destination: Option<Vec<ServiceLocation>>,

    /// Previous calling points (stations already visited).
    pub previous_calling_points: Option<Vec<ArrayOfCallingPoints>>,

    /// Subsequent calling points (stations still to visit).
    pub subsequent_calling_points: Option<Vec<ArrayOfCallingPoints>>,

    /// Reason for cancellation (if cancelled).
    pub cancel_reason: Option<String>,

    /// Reason for delay (if delayed).
    pub delay_reason: Option<String>,
}

impl ServiceItemWithCallingPoints {
    /// Set the packed ID fields if the service ID is in the current format.
    pub fn annotate_service_id(&mut self) {
        if let Ok(id) = ServiceId::parse(&self.service_id) {
            let token = id.token();
            self.service_id_guid = Some(token.to_guid_string());
            self.service_id_url_safe = Some(token.to_base64url());
        }
    }

    /// All previous calling points, across split portions.
    pub fn previous_calls(&self) -> impl Iterator<Item = &CallingPoint> {
        self.previous_calling_points
            .iter()
            .flatten()
            .flat_map(|portion| portion.calling_point.iter())
    }

    /// All subsequent calling points, across split portions.
    pub fn subsequent_calls(&self) -> impl Iterator<Item = &CallingPoint> {
        self.subsequent_calling_points
            .iter()
            .flatten()
            .flat_map(|portion| portion.calling_point.iter())
    }
}

/// Response from the staff next and fastest departures calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesBoard {
    pub generated_at: String,

    /// The call that produced this board. Not part of Darwin's reply.
    #[serde(skip)]
    pub shape: DeparturesShape,

    #[serde(flatten)]
    pub content: DeparturesContent,
}

/// Everything on a departures board apart from its generation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesContent {
    pub location_name: String,
    pub crs: String,
    pub platform_available: Option<bool>,
    pub are_services_available: Option<bool>,
    pub nrcc_messages: Option<Vec<NrccMessage>>,

    /// One entry per filter station, in the order requested.
    pub departures: Option<Vec<DepartureItem>>,
}

impl DeparturesContent {
    /// Fill in the packed service ID forms on every departure.
    pub fn annotate_service_ids(&mut self) {
        let services = self
            .departures
            .iter_mut()
            .flatten()
            .filter_map(|d| d.service.as_mut());
        for service in services {
            service.annotate_service_id();
        }
    }
}

/// The chosen departure towards one filter station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureItem {
    /// The filter station this departure is for.
    pub crs: String,

    /// Missing when nothing runs there within the window.
    pub service: Option<ServiceItemWithCallingPoints>,
}

/// Response from `GetServiceDetails` or `GetServiceDetailsByRID`.
///
/// Note: the public endpoint only works while the service is on a departure
/// board (~2 minutes after expected departure).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    /// When this response was generated.
    pub generated_at: String,

    #[serde(flatten)]
    pub content: ServiceDetailsContent,
}

/// Everything in a service details response apart from its generation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetailsContent {
    /// Station name where this detail request originated.
    pub location_name: Option<String>,

    /// CRS code of the originating station.
    pub crs: Option<String>,

    /// Running identifier (staff feed only).
    pub rid: Option<String>,

    /// Schedule UID (staff feed only).
    pub uid: Option<String>,

    /// Headcode (staff feed only).
    pub trainid: Option<String>,

    /// Train operating company name.
    pub operator: Option<String>,

    /// Train operating company ATOC code.
    pub operator_code: Option<String>,

    /// Retail Service ID.
    pub rsid: Option<String>,

    /// Whether the service is cancelled.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_cancelled: bool,

    /// Cancellation reason.
    pub cancel_reason: Option<String>,

    /// Delay reason.
    pub delay_reason: Option<String>,

    /// Platform at the board station.
    pub platform: Option<String>,

    /// Scheduled arrival at board station.
    pub sta: Option<String>,

    /// Estimated arrival at board station.
    pub eta: Option<String>,

    /// Actual arrival at board station.
    pub ata: Option<String>,

    /// Scheduled departure from board station.
    pub std: Option<String>,

    /// Estimated departure from board station.
    pub etd: Option<String>,

    /// Actual departure from board station.
    pub atd: Option<String>,

    /// Service type.
    pub service_type: Option<ServiceType>,

    /// Train length.
    pub length: Option<i32>,

    /// Previous calling points.
    pub previous_calling_points: Option<Vec<ArrayOfCallingPoints>>,

    /// Subsequent calling points.
    pub subsequent_calling_points: Option<Vec<ArrayOfCallingPoints>>,
}

/// Wrapper for a list of calling points.
///
/// Darwin wraps calling points in this structure to support split/join services,
/// where multiple arrays represent different portions of a train.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOfCallingPoints {
    /// The calling points in this portion.
    #[serde(default)]
    pub calling_point: Vec<CallingPoint>,

    /// Service type for this portion (usually matches parent).
    pub service_type: Option<ServiceType>,

    /// Whether a change of service is required at the split point.
    pub service_change_required: Option<bool>,

    /// Whether the associated service is cancelled (for joins).
    pub assoc_is_cancelled: Option<bool>,
}

/// A single calling point (station stop).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallingPoint {
    /// Human-readable station name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_name: String,

    /// CRS code of the station. Empty for locations without one.
    #[serde(default, deserialize_with = "null_as_default")]
    pub crs: String,

    /// Scheduled time (arrival for previous, departure for subsequent).
    pub st: Option<String>,

    /// Estimated time.
    pub et: Option<String>,

    /// Actual time (only present after the train has called).
    pub at: Option<String>,

    /// Whether this call is cancelled.
    pub is_cancelled: Option<bool>,

    /// Train length at this stop (may change due to coupling/uncoupling).
    pub length: Option<i32>,

    /// Cancellation reason for this stop.
    pub cancel_reason: Option<String>,

    /// Delay reason at this stop.
    pub delay_reason: Option<String>,
}

/// Origin or destination location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLocation {
    /// Human-readable station name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_name: String,

    /// CRS code.
    #[serde(default, deserialize_with = "null_as_default")]
    pub crs: String,

    /// "via" text (e.g., "via Bristol Parkway").
    pub via: Option<String>,

    /// Future change information.
    pub future_change_to: Option<String>,
}

/// Service type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Train,
    Bus,
    Ferry,
}

/// Network Rail communication message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NrccMessage {
    /// The message content (may contain HTML).
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_station_board() {
        let json = r#"{
            "generatedAt": "2024-03-15T10:30:00Z",
            "locationName": "London Paddington",
            "crs": "PAD",
            "platformAvailable": true,
            "areServicesAvailable": true,
            "trainServices": [
                {
                    "serviceID": "4611018PADTON__",
                    "std": "10:45",
                    "etd": "On time",
                    "platform": "1",
                    "operator": "Great Western Railway",
                    "operatorCode": "GW",
                    "destination": [
                        {"locationName": "Bristol Temple Meads", "crs": "BRI"}
                    ],
                    "subsequentCallingPoints": [
                        {
                            "callingPoint": [
                                {"locationName": "Reading", "crs": "RDG", "st": "11:10", "et": "On time"},
                                {"locationName": "Bristol Temple Meads", "crs": "BRI", "st": "12:00", "et": "On time"}
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let board: StationBoard = serde_json::from_str(json).unwrap();

        assert_eq!(board.generated_at, "2024-03-15T10:30:00Z");
        assert_eq!(board.content.location_name, "London Paddington");
        assert_eq!(board.content.crs, "PAD");
        assert!(board.content.filtercrs.is_none());

        let services = board.content.train_services.unwrap();
        assert_eq!(services.len(), 1);

        let service = &services[0];
        assert_eq!(service.service_id, "4611018PADTON__");
        assert!(!service.is_cancelled);
        assert_eq!(service.etd.as_deref(), Some("On time"));

        let calls: Vec<_> = service.subsequent_calls().map(|c| c.crs.as_str()).collect();
        assert_eq!(calls, ["RDG", "BRI"]);
        assert_eq!(service.previous_calls().count(), 0);
    }

    #[test]
    fn deserialize_filtered_board() {
        let json = r#"{
            "generatedAt": "2024-03-15T10:30:00Z",
            "locationName": "Brighton",
            "crs": "BTN",
            "filterLocationName": "London Victoria",
            "filtercrs": "VIC",
            "filterType": "to"
        }"#;

        let board: StationBoard = serde_json::from_str(json).unwrap();
        assert_eq!(board.content.filtercrs.as_deref(), Some("VIC"));
        assert_eq!(board.content.filter_type, Some(FilterType::To));
        assert!(board.content.train_services.is_none());
    }

    #[test]
    fn serialize_keeps_darwin_field_names() {
        let board = StationBoard {
            generated_at: "2024-03-15T10:30:00Z".into(),
            content: BoardContent {
                location_name: "Brighton".into(),
                crs: "BTN".into(),
                filtercrs: Some("VIC".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let value = serde_json::to_value(&board).unwrap();
        assert_eq!(value["generatedAt"], "2024-03-15T10:30:00Z");
        assert!(value.get("shape").is_none());
        assert_eq!(value["locationName"], "Brighton");
        assert_eq!(value["filtercrs"], "VIC");
    }

    #[test]
    fn deserialize_cancelled_service() {
        let json = r#"{
            "serviceID": "xyz789",
            "std": "14:00",
            "etd": "Cancelled",
            "isCancelled": true,
            "filterLocationCancelled": true,
            "cancelReason": "A fault with the signalling system"
        }"#;

        let service: ServiceItemWithCallingPoints = serde_json::from_str(json).unwrap();

        assert!(service.is_cancelled);
        assert!(service.filter_location_cancelled);
        assert!(service.cancel_reason.is_some());
    }

    #[test]
    fn annotate_current_format_ids_only() {
        let mut content = BoardContent {
            train_services: Some(vec![
                ServiceItemWithCallingPoints {
                    service_id: "4611018PADTON__".into(),
                    ..Default::default()
                },
                ServiceItemWithCallingPoints {
                    service_id: "x7Xk4dz/Ui/rOqwXnpTYIw==".into(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };

        content.annotate_service_ids();

        let services = content.train_services.unwrap();
        assert_eq!(
            services[0].service_id_guid.as_deref(),
            Some("46110180-0000-0000-5041-44544f4e5f5f")
        );
        assert_eq!(
            services[0].service_id_url_safe.as_deref(),
            Some("RhEBgAAAAABQQURUT05fXw")
        );
        assert!(services[1].service_id_guid.is_none());
    }

    #[test]
    fn deserialize_service_type() {
        assert_eq!(
            serde_json::from_str::<ServiceType>(r#""train""#).unwrap(),
            ServiceType::Train
        );
        assert_eq!(
            serde_json::from_str::<ServiceType>(r#""bus""#).unwrap(),
            ServiceType::Bus
        );
    }

    #[test]
    fn deserialize_service_details() {
        let json = r#"{
            "generatedAt": "2024-03-15T10:30:00Z",
            "locationName": "Reading",
            "crs": "RDG",
            "operator": "Great Western Railway",
            "operatorCode": "GW",
            "platform": "7",
            "std": "10:27",
            "etd": "On time",
            "previousCallingPoints": [
                {
                    "callingPoint": [
                        {"locationName": "London Paddington", "crs": "PAD", "st": "10:00", "at": "10:00"}
                    ]
                }
            ]
        }"#;

        let details: ServiceDetails = serde_json::from_str(json).unwrap();

        assert_eq!(details.content.location_name.as_deref(), Some("Reading"));
        assert_eq!(
            details.content.operator.as_deref(),
            Some("Great Western Railway")
        );
        let prev = details.content.previous_calling_points.as_ref().unwrap();
        assert_eq!(prev[0].calling_point[0].crs, "PAD");
    }

    #[test]
    fn null_flags_read_as_false() {
        let json = r#"{
            "serviceID": "4611018PADTON__",
            "std": "10:45",
            "etd": "On time",
            "isCancelled": null,
            "filterLocationCancelled": null,
            "subsequentCallingPoints": [
                {"callingPoint": [{"locationName": "Reading", "crs": null, "st": "11:10"}]}
            ]
        }"#;

        let service: ServiceItemWithCallingPoints = serde_json::from_str(json).unwrap();
        assert!(!service.is_cancelled);
        assert!(!service.filter_location_cancelled);
        assert_eq!(service.subsequent_calls().next().unwrap().crs, "");

        let details: ServiceDetails = serde_json::from_str(
            r#"{"generatedAt": "2024-03-15T10:30:00Z", "isCancelled": null}"#,
        )
        .unwrap();
        assert!(!details.content.is_cancelled);
    }

    #[test]
    fn null_flag_does_not_sink_the_board() {
        let json = r#"{
            "generatedAt": "2024-03-15T10:30:00Z",
            "locationName": "Brighton",
            "crs": "BTN",
            "trainServices": [
                {"serviceID": "a", "std": "07:29", "etd": "On time", "isCancelled": null},
                {"serviceID": "b", "std": "07:44", "etd": "Cancelled", "isCancelled": true}
            ]
        }"#;

        let board: StationBoard = serde_json::from_str(json).unwrap();
        let services = board.content.train_services.unwrap();
        assert!(!services[0].is_cancelled);
        assert!(services[1].is_cancelled);
    }

    #[test]
    fn deserialize_departures_board() {
        let json = r#"{
            "generatedAt": "2024-03-15T07:20:00Z",
            "locationName": "Brighton",
            "crs": "BTN",
            "departures": [
                {"crs": "VIC", "service": {"serviceID": "4611018PADTON__", "std": "07:29", "etd": "On time"}},
                {"crs": "LBG", "service": null}
            ]
        }"#;

        let mut board: DeparturesBoard = serde_json::from_str(json).unwrap();
        board.content.annotate_service_ids();

        let departures = board.content.departures.unwrap();
        assert_eq!(departures[0].crs, "VIC");
        assert_eq!(
            departures[0].service.as_ref().unwrap().service_id_url_safe.as_deref(),
            Some("RhEBgAAAAABQQURUT05fXw")
        );
        assert!(departures[1].service.is_none());
    }
}
