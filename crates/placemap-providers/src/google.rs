//! Google Places Nearby Search binding.
//!
//! Results are already structured, so normalization is a field projection.
//! The amenity filter is sent as the `type` parameter.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use placemap_core::error::ProviderError;
use placemap_core::traits::SearchProvider;
use placemap_core::types::{LatLng, PlaceCandidate, PlacePhoto, ProviderPolicy, SearchRequest};

use crate::overpass::ADDRESS_PLACEHOLDER;

/// Photos kept per place.
pub const MAX_PHOTOS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct NearbySearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GooglePlace>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GooglePlace {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    pub vicinity: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub icon: Option<String>,
    pub geometry: GoogleGeometry,
    #[serde(default)]
    pub photos: Vec<GooglePhoto>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleGeometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct GooglePhoto {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub html_attributions: Vec<String>,
    pub photo_reference: String,
}

pub struct GooglePlacesProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    photo_max_px: u32,
}

impl GooglePlacesProvider {
    pub fn new(base_url: &str, api_key: &str, photo_max_px: u32, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            photo_max_px,
        })
    }

    pub fn query_params(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("location", format!("{},{}", request.center.lat, request.center.lng)),
            ("radius", request.radius_m.to_string()),
        ];
        if let Some(keyword) = &request.keyword { params.push(("keyword", keyword.clone())); }
        if let Some(amenity) = &request.amenity { params.push(("type", amenity.clone())); }
        params.push(("key", self.api_key.clone()));
        params
    }

    /// `amenity` is the `type` the request was filtered by, if any.
    pub fn normalize(
        &self,
        response: NearbySearchResponse,
        amenity: Option<&str>,
    ) -> Result<Vec<PlaceCandidate>, ProviderError> {
        match response.status.as_str() {
            "OK" => Ok(response.results.into_iter().map(|p| self.project(p, amenity)).collect()),
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => {
                let detail = response.error_message.map(|m| format!("{other}: {m}")).unwrap_or_else(|| other.to_string());
                Err(ProviderError::Status(detail))
            }
        }
    }

    /// The category is the requested `type` when the place carries it, so a
    /// server-side match survives the engine's category filter; otherwise the
    /// first listed type.
    fn project(&self, place: GooglePlace, amenity: Option<&str>) -> PlaceCandidate {
        let photos = place.photos.into_iter().take(MAX_PHOTOS).map(|p| self.photo(p)).collect();
        let category = amenity
            .filter(|a| place.types.iter().any(|t| t == a))
            .map(str::to_string)
            .or_else(|| place.types.first().cloned());
        PlaceCandidate {
            id: place.place_id,
            name: place.name,
            location: place.geometry.location,
            address: place.vicinity.unwrap_or_else(|| ADDRESS_PLACEHOLDER.to_string()),
            category,
            phone: None,
            tags: place.types.into_iter().map(|t| ("type".to_string(), t)).collect(),
            icon: place.icon,
            photos,
        }
    }

    fn photo(&self, photo: GooglePhoto) -> PlacePhoto {
        let px = self.photo_max_px;
        PlacePhoto {
            width: photo.width,
            height: photo.height,
            attributions: photo.html_attributions,
            url: format!(
                "{}/photo?maxwidth={px}&maxheight={px}&photo_reference={}&key={}",
                self.base_url, photo.photo_reference, self.api_key
            ),
        }
    }
}

#[async_trait]
impl SearchProvider for GooglePlacesProvider {
    fn name(&self) -> &str { "google" }

    fn policy(&self) -> ProviderPolicy { ProviderPolicy::GOOGLE }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<PlaceCandidate>, ProviderError> {
        let url = format!("{}/nearbysearch/json", self.base_url);
        debug!(radius_m = request.radius_m, amenity = ?request.amenity, "querying google places");
        let res = self
            .client
            .get(&url)
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            return Err(ProviderError::Status(res.status().to_string()));
        }

        let data: NearbySearchResponse = res.json().await.map_err(|e| ProviderError::Decode(e.to_string()))?;
        self.normalize(data, request.amenity.as_deref())
    }
}
