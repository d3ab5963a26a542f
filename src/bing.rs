//! Bing Maps Distance Matrix adapter.
//!
//! Fetching and decoding are separate steps: [`BingClient`] only turns a
//! request into a parsed [`MatrixResponse`], and [`decode`] maps that response
//! into [`CellResult`]s, dropping any cell it cannot make sense of.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::coords::{Coordinate, CoordinateIndex};
use crate::error::ProviderError;
use crate::traits::{DistanceMatrixProvider, MatrixRequest};

pub const DEFAULT_BASE_URL: &str = "https://dev.virtualearth.net/REST/v1/Routes/DistanceMatrix";

/// The only status code treated as success.
pub const STATUS_OK: u16 = 200;

#[derive(Debug, Clone)]
pub struct BingConfig {
    pub base_url: String,
    pub distance_unit: String,
    pub travel_mode: String,
    pub timeout_secs: u64,
}

impl Default for BingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            distance_unit: "mi".to_string(),
            travel_mode: "driving".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BingClient {
    config: BingConfig,
    client: reqwest::blocking::Client,
}

impl BingClient {
    /// The client timeout doubles as the per-call timeout; a timed out call
    /// fails like any other and rotates the key.
    pub fn new(config: BingConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn query_params(&self, request: &MatrixRequest<'_>, key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("origins", join_pairs(request.origins)),
            ("destinations", join_pairs(request.destinations)),
            ("distanceUnit", self.config.distance_unit.clone()),
            ("travelMode", self.config.travel_mode.clone()),
            ("startTime", request.start_time.to_string()),
            ("key", key.to_string()),
        ]
    }
}

impl DistanceMatrixProvider for BingClient {
    fn fetch(&self, request: &MatrixRequest<'_>, key: &str) -> Result<MatrixResponse, ProviderError> {
        // Error statuses still carry a JSON body with `statusCode`, so the
        // HTTP status is not checked here.
        let body = self
            .client
            .get(&self.config.base_url)
            .query(&self.query_params(request, key))
            .send()?
            .json::<MatrixResponse>()?;
        Ok(body)
    }
}

fn join_pairs(coords: &[Coordinate]) -> String {
    coords
        .iter()
        .map(Coordinate::pair)
        .collect::<Vec<_>>()
        .join(";")
}

/// Raw provider response. Nested entries stay as JSON values so a single
/// malformed cell or location cannot fail the whole response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixResponse {
    pub status_code: u16,
    #[serde(default)]
    pub resource_sets: Vec<ResourceSet>,
}

impl MatrixResponse {
    /// Success is exactly [`STATUS_OK`] with a matrix resource present;
    /// anything else is a key failure. Only individual cells are allowed to
    /// be missing or malformed.
    pub fn into_success(self) -> Result<Self, ProviderError> {
        if self.status_code != STATUS_OK {
            return Err(ProviderError::Status(self.status_code));
        }
        if self.matrix().is_none() {
            return Err(ProviderError::Decode(
                "response carried no matrix resource".to_string(),
            ));
        }
        Ok(self)
    }

    fn matrix(&self) -> Option<&MatrixResource> {
        self.resource_sets.first()?.resources.first()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSet {
    #[serde(default)]
    pub resources: Vec<MatrixResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixResource {
    #[serde(default)]
    pub origins: Vec<Value>,
    #[serde(default)]
    pub destinations: Vec<Value>,
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatrixCell {
    origin_index: usize,
    destination_index: usize,
    travel_duration: f64,
    #[serde(default)]
    total_walk_duration: f64,
    travel_distance: f64,
}

/// One decoded origin -> destination measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct CellResult {
    pub origin: String,
    pub destination: String,
    pub travel_duration: f64,
    pub walk_duration: f64,
    pub travel_distance: f64,
}

impl CellResult {
    pub fn is_self_pair(&self) -> bool {
        self.origin == self.destination
    }
}

/// Map a response into per-cell results, skipping cells that are malformed,
/// point outside the origin/destination lists, or name a location that is
/// not in `index`.
pub fn decode(response: &MatrixResponse, index: &CoordinateIndex) -> Vec<CellResult> {
    let Some(matrix) = response.matrix() else {
        debug!("response carried no matrix resource");
        return Vec::new();
    };

    let mut cells = Vec::with_capacity(matrix.results.len());
    for raw in &matrix.results {
        match decode_cell(raw, matrix, index) {
            Some(cell) => cells.push(cell),
            None => debug!(cell = %raw, "dropping undecodable cell"),
        }
    }
    cells
}

fn decode_cell(raw: &Value, matrix: &MatrixResource, index: &CoordinateIndex) -> Option<CellResult> {
    let cell = MatrixCell::deserialize(raw).ok()?;
    let origin = lookup(matrix.origins.get(cell.origin_index)?, index)?;
    let destination = lookup(matrix.destinations.get(cell.destination_index)?, index)?;

    Some(CellResult {
        origin,
        destination,
        travel_duration: cell.travel_duration,
        walk_duration: cell.total_walk_duration,
        travel_distance: cell.travel_distance,
    })
}

fn lookup(raw: &Value, index: &CoordinateIndex) -> Option<String> {
    let location = Location::deserialize(raw).ok()?;
    index
        .identifier_at(location.latitude, location.longitude)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> CoordinateIndex {
        CoordinateIndex::parse("a 47.6 -122.3\nb 47.7 -122.4\nc 47.8 -122.5\n").unwrap()
    }

    fn response(results: Value) -> MatrixResponse {
        serde_json::from_value(json!({
            "statusCode": 200,
            "resourceSets": [{
                "resources": [{
                    "origins": [{ "latitude": 47.6, "longitude": -122.3 }],
                    "destinations": [
                        { "latitude": 47.7, "longitude": -122.4 },
                        { "latitude": 47.8, "longitude": -122.5 }
                    ],
                    "results": results
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_maps_coordinates_to_identifiers() {
        let resp = response(json!([
            { "originIndex": 0, "destinationIndex": 1, "travelDuration": 12.5,
              "totalWalkDuration": 0, "travelDistance": 8.1 }
        ]));
        let cells = decode(&resp, &index());
        assert_eq!(
            cells,
            vec![CellResult {
                origin: "a".to_string(),
                destination: "c".to_string(),
                travel_duration: 12.5,
                walk_duration: 0.0,
                travel_distance: 8.1,
            }]
        );
    }

    #[test]
    fn test_decode_skips_out_of_range_destination() {
        let resp = response(json!([
            { "originIndex": 0, "destinationIndex": 0, "travelDuration": 3.0,
              "totalWalkDuration": 0, "travelDistance": 1.0 },
            { "originIndex": 0, "destinationIndex": 7, "travelDuration": 3.0,
              "totalWalkDuration": 0, "travelDistance": 1.0 }
        ]));
        let cells = decode(&resp, &index());
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].destination, "b");
    }

    #[test]
    fn test_decode_skips_malformed_cell() {
        let resp = response(json!([
            { "originIndex": 0, "destinationIndex": 0, "travelDuration": "soon",
              "travelDistance": 1.0 },
            { "originIndex": 0, "destinationIndex": 1, "travelDuration": 4.0,
              "travelDistance": 2.0 }
        ]));
        let cells = decode(&resp, &index());
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].walk_duration, 0.0);
    }

    #[test]
    fn test_decode_drops_unknown_location() {
        let resp: MatrixResponse = serde_json::from_value(json!({
            "statusCode": 200,
            "resourceSets": [{ "resources": [{
                "origins": [{ "latitude": 1.0, "longitude": 1.0 }],
                "destinations": [{ "latitude": 47.7, "longitude": -122.4 }],
                "results": [{ "originIndex": 0, "destinationIndex": 0,
                              "travelDuration": 1.0, "travelDistance": 1.0 }]
            }]}]
        }))
        .unwrap();
        assert!(decode(&resp, &index()).is_empty());
    }

    #[test]
    fn test_decode_tolerates_missing_resources() {
        let resp: MatrixResponse = serde_json::from_value(json!({ "statusCode": 200 })).unwrap();
        assert!(decode(&resp, &index()).is_empty());
    }

    #[test]
    fn test_non_200_status_is_failure() {
        let resp: MatrixResponse = serde_json::from_value(json!({ "statusCode": 401 })).unwrap();
        assert!(matches!(resp.into_success(), Err(ProviderError::Status(401))));
        assert!(response(json!([])).into_success().is_ok());
    }

    #[test]
    fn test_ok_status_without_matrix_is_failure() {
        let bare: MatrixResponse = serde_json::from_value(json!({ "statusCode": 200 })).unwrap();
        assert!(matches!(bare.into_success(), Err(ProviderError::Decode(_))));
        let empty_set: MatrixResponse =
            serde_json::from_value(json!({ "statusCode": 200, "resourceSets": [{ "resources": [] }] }))
                .unwrap();
        assert!(matches!(empty_set.into_success(), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn test_query_params_follow_request() {
        let client = BingClient::new(BingConfig::default()).unwrap();
        let idx = index();
        let request = MatrixRequest {
            origins: idx.slice(0, 1),
            destinations: idx.slice(1, 2),
            start_time: "2019-08-05T08:00:00-07:00",
        };
        let params = client.query_params(&request, "secret");
        assert_eq!(
            params,
            vec![
                ("origins", "47.6,-122.3".to_string()),
                ("destinations", "47.7,-122.4;47.8,-122.5".to_string()),
                ("distanceUnit", "mi".to_string()),
                ("travelMode", "driving".to_string()),
                ("startTime", "2019-08-05T08:00:00-07:00".to_string()),
                ("key", "secret".to_string()),
            ]
        );
    }

    #[test]
    fn test_self_pair_detection() {
        let cell = CellResult {
            origin: "a".to_string(),
            destination: "a".to_string(),
            travel_duration: 0.0,
            walk_duration: 0.0,
            travel_distance: 0.0,
        };
        assert!(cell.is_self_pair());
    }
}
