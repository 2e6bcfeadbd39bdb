use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use placemap_core::traits::{ClickListener, MapSurface, MarkerHandle};
use placemap_core::types::{Bounds, ClickEvent, LatLng, MarkerId};

use crate::marker::{HeadlessMarker, MarkerSnapshot, MarkerState};

const TILE_PX: f64 = 256.0;

pub(crate) type Shared = Arc<Mutex<MapState>>;

pub(crate) fn lock(shared: &Shared) -> MutexGuard<'_, MapState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Canvas size in pixels, used to derive the visible bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSize {
    fn default() -> Self { Self { width: 1024, height: 768 } }
}

pub(crate) struct MapState {
    pub(crate) center: Option<LatLng>,
    pub(crate) zoom: u8,
    pub(crate) size: ViewportSize,
    pub(crate) next_marker: MarkerId,
    pub(crate) markers: BTreeMap<MarkerId, MarkerState>,
    pub(crate) listener: Option<ClickListener>,
    pub(crate) info_anchor: Option<MarkerId>,
}

/// A map canvas without pixels.
///
/// Cloning yields another handle onto the same canvas, so the engine can own
/// one while the front-end keeps another to forward clicks and read state.
#[derive(Clone)]
pub struct HeadlessMap {
    inner: Shared,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self::with_center(Some(center), zoom)
    }

    /// A canvas that has not reported a viewport yet.
    pub fn uninitialized(zoom: u8) -> Self { Self::with_center(None, zoom) }

    fn with_center(center: Option<LatLng>, zoom: u8) -> Self {
        let state = MapState {
            center,
            zoom,
            size: ViewportSize::default(),
            next_marker: 1,
            markers: BTreeMap::new(),
            listener: None,
            info_anchor: None,
        };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    pub fn set_view(&self, center: LatLng, zoom: u8) {
        let mut state = lock(&self.inner);
        state.center = Some(center);
        state.zoom = zoom;
    }

    pub fn set_size(&self, size: ViewportSize) { lock(&self.inner).size = size; }

    pub fn marker(&self, id: MarkerId) -> Option<MarkerSnapshot> {
        lock(&self.inner).markers.get(&id).map(|m| m.snapshot(id))
    }

    /// Every attached marker, in creation order.
    pub fn live_markers(&self) -> Vec<MarkerSnapshot> {
        lock(&self.inner).markers.iter().map(|(id, m)| m.snapshot(*id)).collect()
    }

    /// Marker the detail surface is anchored at, if open.
    pub fn info_anchor(&self) -> Option<MarkerId> { lock(&self.inner).info_anchor }

    /// Click on an empty area of the map.
    pub fn click_map(&self) -> ClickEvent {
        let mut event = ClickEvent::on_map();
        self.dispatch_map(&mut event);
        event
    }

    /// Click on a marker: its own listener runs first, then the map-level one.
    /// Returns `None` when the marker is not attached.
    pub fn click_marker(&self, id: MarkerId) -> Option<ClickEvent> {
        let mut state = lock(&self.inner);
        let taken = state.markers.get_mut(&id)?.listener.take();
        drop(state);
        let mut event = ClickEvent::on_marker(id);
        if let Some(mut listener) = taken {
            listener(&mut event);
            let mut state = lock(&self.inner);
            if let Some(marker) = state.markers.get_mut(&id) {
                marker.listener.get_or_insert(listener);
            }
        }
        self.dispatch_map(&mut event);
        Some(event)
    }

    fn dispatch_map(&self, event: &mut ClickEvent) {
        let taken = lock(&self.inner).listener.take();
        if let Some(mut listener) = taken {
            listener(event);
            lock(&self.inner).listener.get_or_insert(listener);
        }
    }
}

impl MapSurface for HeadlessMap {
    fn center(&self) -> Option<LatLng> { lock(&self.inner).center.filter(LatLng::is_valid) }

    fn zoom(&self) -> u8 { lock(&self.inner).zoom }

    fn bounds(&self) -> Option<Bounds> {
        let state = lock(&self.inner);
        let center = state.center.filter(LatLng::is_valid)?;
        let world_px = TILE_PX * 2f64.powi(i32::from(state.zoom));
        let deg_per_px = 360.0 / world_px;
        let half_lng = deg_per_px * f64::from(state.size.width) / 2.0;
        let half_lat = deg_per_px * center.lat.to_radians().cos() * f64::from(state.size.height) / 2.0;
        Some(Bounds {
            south_west: LatLng::new((center.lat - half_lat).max(-90.0), (center.lng - half_lng).max(-180.0)),
            north_east: LatLng::new((center.lat + half_lat).min(90.0), (center.lng + half_lng).min(180.0)),
        })
    }

    fn add_marker(&mut self, at: LatLng) -> Box<dyn MarkerHandle> {
        let mut state = lock(&self.inner);
        let id = state.next_marker;
        state.next_marker += 1;
        state.markers.insert(id, MarkerState::new(at));
        Box::new(HeadlessMarker::new(id, at, Arc::clone(&self.inner)))
    }

    fn clear_markers(&mut self) {
        let mut state = lock(&self.inner);
        let removed = state.markers.len();
        state.markers.clear();
        state.info_anchor = None;
        if removed > 0 { debug!(removed, "cleared markers"); }
    }

    fn on_click(&mut self, listener: ClickListener) { lock(&self.inner).listener = Some(listener); }

    fn open_info(&mut self, marker: MarkerId) {
        let mut state = lock(&self.inner);
        if state.markers.contains_key(&marker) { state.info_anchor = Some(marker); }
    }

    fn close_info(&mut self) { lock(&self.inner).info_anchor = None; }
}
