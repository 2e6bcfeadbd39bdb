use placemap_core::traits::MarkerHandle;
use placemap_core::types::{LatLng, PlaceCandidate, PlaceId, PlacePhoto, Tag};

use crate::state::PlaceSummary;

/// A search result bound to the marker that shows it.
///
/// The record owns its marker exclusively; dropping the record removes the
/// marker from the map.
pub struct PlaceRecord {
    pub id: PlaceId,
    pub name: String,
    pub location: LatLng,
    pub address: String,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub tags: Vec<Tag>,
    pub icon: Option<String>,
    pub photos: Vec<PlacePhoto>,
    marker: Box<dyn MarkerHandle>,
}

impl PlaceRecord {
    pub fn new(candidate: PlaceCandidate, marker: Box<dyn MarkerHandle>) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name,
            location: candidate.location,
            address: candidate.address,
            category: candidate.category,
            phone: candidate.phone,
            tags: candidate.tags,
            icon: candidate.icon,
            photos: candidate.photos,
            marker,
        }
    }

    pub fn marker(&self) -> &dyn MarkerHandle { self.marker.as_ref() }

    pub(crate) fn marker_mut(&mut self) -> &mut dyn MarkerHandle { self.marker.as_mut() }

    /// Visibility predicate for an amenity filter; empty matches everything.
    pub fn matches(&self, amenity: &str) -> bool {
        amenity.is_empty() || self.category.as_deref() == Some(amenity)
    }

    pub fn summary(&self) -> PlaceSummary {
        PlaceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            location: self.location,
            address: self.address.clone(),
            category: self.category.clone(),
            phone: self.phone.clone(),
            tags: self.tags.clone(),
            icon: self.icon.clone(),
            photos: self.photos.clone(),
            marker: self.marker.id(),
            visible: self.marker.is_visible(),
        }
    }
}

impl Drop for PlaceRecord {
    fn drop(&mut self) { self.marker.remove(); }
}

impl std::fmt::Debug for PlaceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("marker", &self.marker.id())
            .finish()
    }
}
