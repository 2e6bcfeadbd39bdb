//! Domain types shared by the map, the providers and the engine.

use serde::{Deserialize, Serialize};

/// Opaque provider-assigned identifier, unique within one result set.
pub type PlaceId = String;

/// Identifier of a marker on one map surface.
pub type MarkerId = u64;

/// A `(name, value)` descriptive attribute of a place.
pub type Tag = (String, String);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }

    /// Finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Visible viewport rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }
}

/// A photo reference with a URL bounded to a maximum rendered size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePhoto {
    pub width: u32,
    pub height: u32,
    pub attributions: Vec<String>,
    pub url: String,
}

/// A normalized search result before it is bound to a marker.
///
/// - `address`: display string, a fixed placeholder when the provider has none
/// - `category`: single amenity classification, may be absent
/// - `tags`: every remaining descriptive attribute, in provider order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub id: PlaceId,
    pub name: String,
    pub location: LatLng,
    pub address: String,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub tags: Vec<Tag>,
    pub icon: Option<String>,
    pub photos: Vec<PlacePhoto>,
}

/// Provider-neutral nearby search request built by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub center: LatLng,
    pub zoom: u8,
    pub bounds: Option<Bounds>,
    pub radius_m: u32,
    /// Trimmed free text, `None` when blank.
    pub keyword: Option<String>,
    /// `keyword` with separators collapsed to wildcards for name matching.
    pub name_pattern: Option<String>,
    /// Only set when the provider filters by amenity server-side.
    pub amenity: Option<String>,
}

/// How the engine treats a given provider binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPolicy {
    /// Amenity filter is sent with the request.
    pub server_side_amenity: bool,
    /// A transport failure tears down the current results.
    pub clear_on_failure: bool,
}

impl ProviderPolicy {
    pub const GOOGLE: Self = Self { server_side_amenity: true, clear_on_failure: true };
    pub const OVERPASS: Self = Self { server_side_amenity: false, clear_on_failure: false };
}

/// A click delivered by the map; marker handlers flag it as handled so the
/// map-level handler does not also react to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickEvent {
    pub marker: Option<MarkerId>,
    pub handled: bool,
}

impl ClickEvent {
    pub fn on_map() -> Self { Self::default() }
    pub fn on_marker(id: MarkerId) -> Self { Self { marker: Some(id), handled: false } }
    pub fn mark_handled(&mut self) { self.handled = true; }
}

/// Visual state of a marker as rendered by the map provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerIcon {
    Default,
    Focused,
}
