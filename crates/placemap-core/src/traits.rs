use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{Bounds, ClickEvent, LatLng, MarkerId, PlaceCandidate, ProviderPolicy, SearchRequest};

/// Single subscription slot for click events.
pub type ClickListener = Box<dyn FnMut(&mut ClickEvent) + Send>;

/// One marker on a map surface.
pub trait MarkerHandle: Send {
    fn id(&self) -> MarkerId;
    fn position(&self) -> LatLng;
    /// Elevate, switch to the focused icon, play the drop animation and pan the map to it.
    fn focus(&mut self);
    /// Restore default elevation and icon.
    fn blur(&mut self);
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    /// Replaces any previous click listener.
    fn on_click(&mut self, listener: ClickListener);
    /// Detach from the map and drop listeners. Calling it again is a no-op.
    fn remove(&mut self);
}

/// Map canvas owning the viewport and the live marker collection.
pub trait MapSurface: Send {
    /// `None` until the map has a usable viewport.
    fn center(&self) -> Option<LatLng>;
    fn zoom(&self) -> u8;
    fn bounds(&self) -> Option<Bounds>;
    fn add_marker(&mut self, at: LatLng) -> Box<dyn MarkerHandle>;
    /// Remove every live marker and its listeners. Idempotent.
    fn clear_markers(&mut self);
    /// Map-level click subscription (empty-area clicks).
    fn on_click(&mut self, listener: ClickListener);
    /// Open the single detail surface anchored at a marker.
    fn open_info(&mut self, marker: MarkerId);
    fn close_info(&mut self);
}

/// Remote nearby-place search binding.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;
    fn policy(&self) -> ProviderPolicy;
    /// Issue one request and normalize the response into candidates.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<PlaceCandidate>, ProviderError>;
}
