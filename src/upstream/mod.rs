use std::time::Instant;

use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::location::PollingPlace;
use crate::observability::metrics::Metrics;

/// Client for the external geocoding and civic-data HTTP APIs.
pub struct CivicClient {
    http: reqwest::Client,
    geocoding_api_key: String,
    civic_api_key: String,
    geocoding_base_url: String,
    civic_base_url: String,
    metrics: Metrics,
}

#[derive(Debug, Clone)]
pub struct Geocoded {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLatLng,
}

#[derive(Debug, Deserialize)]
struct GeocodeLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoterInfoResponse {
    #[serde(default)]
    polling_locations: Vec<CivicPollingLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CivicPollingLocation {
    address: CivicAddress,
    latitude: Option<f64>,
    longitude: Option<f64>,
    polling_hours: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CivicAddress {
    location_name: Option<String>,
    line1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
}

impl CivicClient {
    pub fn new(config: &Config, metrics: Metrics) -> Self {
        Self {
            http: reqwest::Client::new(),
            geocoding_api_key: config.geocoding_api_key.clone(),
            civic_api_key: config.civic_api_key.clone(),
            geocoding_base_url: config.geocoding_base_url.clone(),
            civic_base_url: config.civic_base_url.clone(),
            metrics,
        }
    }

    /// Resolve a street address to coordinates. Zero results from the
    /// geocoder are reported as NotFound, everything else as Upstream.
    pub async fn geocode(&self, address: &str) -> Result<Geocoded, AppError> {
        let start = Instant::now();
        let result = self.geocode_inner(address).await;
        self.observe("geocoding", start, result.is_ok());
        result
    }

    async fn geocode_inner(&self, address: &str) -> Result<Geocoded, AppError> {
        let response = self
            .http
            .get(&self.geocoding_base_url)
            .query(&[("address", address), ("key", self.geocoding_api_key.as_str())])
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("geocoding request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "geocoder answered {}",
                response.status()
            )));
        }

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("geocoding response malformed: {err}")))?;

        let first = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("address not found".to_string()))?;

        Ok(Geocoded {
            lat: first.geometry.location.lat,
            lng: first.geometry.location.lng,
            formatted_address: first.formatted_address,
        })
    }

    /// Look up polling places near the given coordinates via the
    /// civic-data API. An upstream 404 or an empty result set maps to
    /// NotFound per the REST contract.
    pub async fn polling_places(&self, lat: f64, lng: f64) -> Result<Vec<PollingPlace>, AppError> {
        let start = Instant::now();
        let result = self.polling_places_inner(lat, lng).await;
        self.observe("civic", start, result.is_ok());
        result
    }

    async fn polling_places_inner(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Vec<PollingPlace>, AppError> {
        let address = format!("{lat},{lng}");
        let response = self
            .http
            .get(&self.civic_base_url)
            .query(&[
                ("key", self.civic_api_key.as_str()),
                ("address", address.as_str()),
                // -1 selects the next upcoming election.
                ("electionId", "-1"),
                ("returnAllAvailableData", "true"),
            ])
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("civic request failed: {err}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(
                "no polling locations found for this address".to_string(),
            ));
        }

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "civic api answered {}",
                response.status()
            )));
        }

        let parsed: VoterInfoResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("civic response malformed: {err}")))?;

        let places = map_polling_places(parsed);
        if places.is_empty() {
            return Err(AppError::NotFound(
                "no polling locations found for this address".to_string(),
            ));
        }

        Ok(places)
    }

    fn observe(&self, service: &str, start: Instant, ok: bool) {
        let outcome = if ok { "success" } else { "error" };
        self.metrics
            .upstream_request_seconds
            .with_label_values(&[service, outcome])
            .observe(start.elapsed().as_secs_f64());
    }
}

fn map_polling_places(response: VoterInfoResponse) -> Vec<PollingPlace> {
    response
        .polling_locations
        .into_iter()
        .filter_map(|location| {
            // Entries without coordinates cannot be distance-ranked.
            let lat = location.latitude?;
            let lng = location.longitude?;

            let address = &location.address;
            let formatted = format!(
                "{}, {}, {} {}",
                address.line1.clone().unwrap_or_default(),
                address.city.clone().unwrap_or_default(),
                address.state.clone().unwrap_or_default(),
                address.zip.clone().unwrap_or_default()
            );

            Some(PollingPlace {
                location_name: address.location_name.clone().unwrap_or_default(),
                address: formatted,
                lat,
                lng,
                polling_hours: location.polling_hours,
                start_date: location.start_date,
                end_date: location.end_date,
                notes: location.notes,
            })
        })
        .collect()
}
