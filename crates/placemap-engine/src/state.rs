use serde::Serialize;

use placemap_core::types::{LatLng, MarkerId, PlaceId, PlacePhoto, Tag};

/// Amenity filter value meaning "show every category".
pub const NO_FILTER: &str = "";

/// Read-only row describing one result for a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceSummary {
    pub id: PlaceId,
    pub name: String,
    pub location: LatLng,
    pub address: String,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub tags: Vec<Tag>,
    pub icon: Option<String>,
    pub photos: Vec<PlacePhoto>,
    pub marker: MarkerId,
    pub visible: bool,
}

/// Snapshot of the engine published after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub revision: u64,
    pub query: String,
    pub amenity_filter: String,
    pub results: Vec<PlaceSummary>,
    /// Sorted; starts with [`NO_FILTER`].
    pub known_amenities: Vec<String>,
    pub selected: Option<PlaceId>,
    pub pending: bool,
    pub error: Option<String>,
}

impl ViewState {
    /// Results passing the current amenity filter.
    pub fn visible(&self) -> impl Iterator<Item = &PlaceSummary> {
        self.results.iter().filter(|p| p.visible)
    }

    pub fn selected_place(&self) -> Option<&PlaceSummary> {
        let id = self.selected.as_ref()?;
        self.results.iter().find(|p| &p.id == id)
    }
}
