use placemap_core::traits::{ClickListener, MarkerHandle};
use placemap_core::types::{LatLng, MarkerIcon, MarkerId};

use crate::surface::{lock, Shared};

/// Z-index given to the focused marker so it renders above its neighbours.
pub const FOCUSED_Z_INDEX: i32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAnimation {
    Drop,
}

pub(crate) struct MarkerState {
    pub(crate) position: LatLng,
    pub(crate) visible: bool,
    pub(crate) icon: MarkerIcon,
    pub(crate) z_index: i32,
    pub(crate) animation: Option<MarkerAnimation>,
    pub(crate) listener: Option<ClickListener>,
}

impl MarkerState {
    pub(crate) fn new(position: LatLng) -> Self {
        Self { position, visible: true, icon: MarkerIcon::Default, z_index: 0, animation: None, listener: None }
    }

    pub(crate) fn snapshot(&self, id: MarkerId) -> MarkerSnapshot {
        MarkerSnapshot {
            id,
            position: self.position,
            visible: self.visible,
            icon: self.icon,
            z_index: self.z_index,
            animation: self.animation,
            has_listener: self.listener.is_some(),
        }
    }
}

/// What the map currently renders for one marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSnapshot {
    pub id: MarkerId,
    pub position: LatLng,
    pub visible: bool,
    pub icon: MarkerIcon,
    pub z_index: i32,
    pub animation: Option<MarkerAnimation>,
    pub has_listener: bool,
}

impl MarkerSnapshot {
    pub fn is_focused(&self) -> bool { self.icon == MarkerIcon::Focused }
}

/// Handle to one marker living in a `HeadlessMap`.
///
/// Every operation after removal (by `remove` or by the map's
/// `clear_markers`) is a no-op.
pub struct HeadlessMarker {
    id: MarkerId,
    position: LatLng,
    map: Shared,
}

impl HeadlessMarker {
    pub(crate) fn new(id: MarkerId, position: LatLng, map: Shared) -> Self { Self { id, position, map } }

    pub fn is_attached(&self) -> bool { lock(&self.map).markers.contains_key(&self.id) }

    fn with_state(&self, f: impl FnOnce(&mut MarkerState)) {
        if let Some(state) = lock(&self.map).markers.get_mut(&self.id) { f(state); }
    }
}

impl MarkerHandle for HeadlessMarker {
    fn id(&self) -> MarkerId { self.id }

    fn position(&self) -> LatLng { self.position }

    fn focus(&mut self) {
        let mut map = lock(&self.map);
        let Some(state) = map.markers.get_mut(&self.id) else { return };
        state.icon = MarkerIcon::Focused;
        state.z_index = FOCUSED_Z_INDEX;
        state.animation = Some(MarkerAnimation::Drop);
        map.center = Some(self.position);
    }

    fn blur(&mut self) {
        self.with_state(|state| {
            state.icon = MarkerIcon::Default;
            state.z_index = 0;
            state.animation = None;
        });
    }

    fn set_visible(&mut self, visible: bool) { self.with_state(|state| state.visible = visible); }

    fn is_visible(&self) -> bool { lock(&self.map).markers.get(&self.id).is_some_and(|s| s.visible) }

    fn on_click(&mut self, listener: ClickListener) {
        self.with_state(|state| state.listener = Some(listener));
    }

    fn remove(&mut self) {
        let mut map = lock(&self.map);
        if map.markers.remove(&self.id).is_some() && map.info_anchor == Some(self.id) {
            map.info_anchor = None;
        }
    }
}
