//! In-process map provider adapter.
//!
//! `HeadlessMap` keeps the viewport, the live markers and the detail surface
//! in shared state so a front-end (or a test) can drive clicks and inspect
//! what a rendered map would show.

mod marker;
mod surface;

pub use marker::{HeadlessMarker, MarkerAnimation, MarkerSnapshot, FOCUSED_Z_INDEX};
pub use surface::{HeadlessMap, ViewportSize};
