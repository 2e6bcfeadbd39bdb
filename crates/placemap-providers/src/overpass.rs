//! Overpass (OpenStreetMap) binding.
//!
//! Sends an Overpass QL query around the map center and turns the returned
//! elements' free-form tag maps into candidates. Amenity filtering is left to
//! the client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use placemap_core::error::ProviderError;
use placemap_core::traits::SearchProvider;
use placemap_core::types::{LatLng, PlaceCandidate, ProviderPolicy, SearchRequest, Tag};

pub const ADDRESS_PLACEHOLDER: &str = "Address not available";
pub const PHONE_PLACEHOLDER: &str = "Not available";
pub const UNNAMED_PLACE: &str = "Unnamed place";

const ADDRESS_PREFIX: &str = "addr:";
const CHECKED_NAMESPACES: [&str; 2] = ["checked", "check_date"];
const SOURCE_SEPARATOR: char = ';';
const SOURCE_DISPLAY_SEPARATOR: &str = ", ";
/// Prefix of the `remark` Overpass sends, with HTTP 200, when a query was aborted.
const RUNTIME_ERROR: &str = "runtime error";

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
    /// Set when the server aborted the query (timeout, memory limit).
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<OverpassCenter>,
    #[serde(default)]
    pub tags: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassCenter {
    pub lat: f64,
    pub lon: f64,
}

impl OverpassElement {
    fn location(&self) -> Option<LatLng> {
        match self.kind.as_str() {
            "node" => Some(LatLng::new(self.lat?, self.lon?)),
            _ => self.center.as_ref().map(|c| LatLng::new(c.lat, c.lon)),
        }
    }
}

pub struct OverpassProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    max_results: u32,
}

impl OverpassProvider {
    pub fn new(endpoint: &str, timeout: Duration, max_results: u32) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.to_string(), timeout, max_results })
    }

    /// Overpass QL for nodes, ways and relations around the request center.
    pub fn build_query(&self, request: &SearchRequest) -> String {
        build_query(request, self.timeout.as_secs().max(1), self.max_results)
    }
}

pub fn build_query(request: &SearchRequest, timeout_secs: u64, max_results: u32) -> String {
    let filter = match &request.name_pattern {
        Some(pattern) => format!("[\"name\"~\"{pattern}\",i]"),
        None => "[\"amenity\"]".to_string(),
    };
    let around = format!("(around:{},{},{})", request.radius_m, request.center.lat, request.center.lng);
    let mut query = format!("[out:json][timeout:{timeout_secs}];\n(\n");
    for kind in ["node", "way", "relation"] {
        query.push_str(&format!("  {kind}{filter}{around};\n"));
    }
    query.push_str(&format!(");\nout center {max_results};\n"));
    query
}

/// Like [`normalize`], but a response the server aborted is a failure even
/// though it arrived with HTTP 200 and possibly no elements.
pub fn into_candidates(response: OverpassResponse) -> Result<Vec<PlaceCandidate>, ProviderError> {
    match response.remark.as_deref() {
        Some(remark) if remark.contains(RUNTIME_ERROR) => Err(ProviderError::Status(remark.to_string())),
        _ => Ok(normalize(response)),
    }
}

/// Candidates in response order; elements without coordinates are skipped.
pub fn normalize(response: OverpassResponse) -> Vec<PlaceCandidate> {
    response.elements.into_iter().filter_map(normalize_element).collect()
}

fn normalize_element(element: OverpassElement) -> Option<PlaceCandidate> {
    let location = element.location()?;
    let tags = &element.tags;
    let text = |key: &str| tags.get(key).map(value_text);

    let mut rest: Vec<Tag> = Vec::new();
    for (key, value) in tags {
        if matches!(key.as_str(), "name" | "amenity" | "phone") || key.starts_with(ADDRESS_PREFIX) || is_checked(key) {
            continue;
        }
        let value = value_text(value);
        let value = if key == "source" { display_source(&value) } else { value };
        rest.push((key.clone(), value));
    }

    Some(PlaceCandidate {
        id: format!("{}/{}", element.kind, element.id),
        name: text("name").unwrap_or_else(|| UNNAMED_PLACE.to_string()),
        location,
        address: format_address(tags),
        category: text("amenity"),
        phone: Some(text("phone").unwrap_or_else(|| PHONE_PLACEHOLDER.to_string())),
        tags: rest,
        icon: None,
        photos: Vec::new(),
    })
}

/// `"<housenumber> <street> <postcode>, <city>"` from whichever parts exist.
pub fn format_address(tags: &Map<String, Value>) -> String {
    let part = |key: &str| tags.get(key).map(value_text).filter(|s| !s.trim().is_empty());
    let line = ["addr:housenumber", "addr:street", "addr:postcode"]
        .iter()
        .filter_map(|k| part(*k))
        .collect::<Vec<_>>()
        .join(" ");
    let address = match (line.is_empty(), part("addr:city")) {
        (false, Some(city)) => format!("{line}, {city}"),
        (true, Some(city)) => city,
        (_, None) => line,
    };
    if address.is_empty() { ADDRESS_PLACEHOLDER.to_string() } else { address }
}

fn display_source(value: &str) -> String {
    value.split(SOURCE_SEPARATOR).map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(SOURCE_DISPLAY_SEPARATOR)
}

fn is_checked(key: &str) -> bool {
    CHECKED_NAMESPACES
        .iter()
        .any(|ns| key == *ns || key.strip_prefix(*ns).is_some_and(|rest| rest.starts_with(':')))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SearchProvider for OverpassProvider {
    fn name(&self) -> &str { "overpass" }

    fn policy(&self) -> ProviderPolicy { ProviderPolicy::OVERPASS }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<PlaceCandidate>, ProviderError> {
        let query = self.build_query(request);
        debug!(endpoint = %self.endpoint, radius_m = request.radius_m, "querying overpass");
        let res = self
            .client
            .post(&self.endpoint)
            .body(query)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            return Err(ProviderError::Status(res.status().to_string()));
        }

        let data: OverpassResponse = res.json().await.map_err(|e| ProviderError::Decode(e.to_string()))?;
        into_candidates(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_namespace_matches_whole_segments() {
        assert!(is_checked("checked"));
        assert!(is_checked("check_date:opening_hours"));
        assert!(!is_checked("checkout"));
        assert!(!is_checked("check_dates"));
    }

    #[test]
    fn source_separators_become_list_separators() {
        assert_eq!(display_source("survey;bing; local_knowledge"), "survey, bing, local_knowledge");
    }
}
