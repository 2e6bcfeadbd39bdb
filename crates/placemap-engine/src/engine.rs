use std::collections::BTreeSet;

use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use placemap_core::error::{ProviderError, SearchError};
use placemap_core::query::{self, RadiusRule};
use placemap_core::traits::MapSurface;
use placemap_core::types::{ClickEvent, PlaceCandidate, PlaceId, ProviderPolicy, SearchRequest};

use crate::driver::{Command, Event};
use crate::record::PlaceRecord;
use crate::state::{ViewState, NO_FILTER};

/// A search that was handed to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    pub seq: u64,
    pub request: SearchRequest,
}

/// What a provider completion did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A newer search was issued; the result was dropped untouched.
    Stale,
    Replaced(usize),
    Empty,
    Failed { cleared: bool },
}

/// Owner of the search, filter and selection state and of every marker it
/// puts on the map.
pub struct SyncEngine<M: MapSurface> {
    map: M,
    policy: ProviderPolicy,
    radius: RadiusRule,
    inbox: WeakUnboundedSender<Event>,
    view: watch::Sender<ViewState>,
    query: String,
    amenity_filter: String,
    results: Vec<PlaceRecord>,
    known_amenities: BTreeSet<String>,
    selected: Option<PlaceId>,
    pending: bool,
    error: Option<String>,
    issued: u64,
    revision: u64,
}

impl<M: MapSurface> SyncEngine<M> {
    /// `inbox` receives marker and empty-map clicks as `Select` commands.
    pub fn new(mut map: M, policy: ProviderPolicy, radius: RadiusRule, inbox: WeakUnboundedSender<Event>) -> Self {
        let map_inbox = inbox.clone();
        map.on_click(Box::new(move |event: &mut ClickEvent| {
            if event.handled { return; }
            if let Some(tx) = map_inbox.upgrade() {
                let _ = tx.send(Event::Command(Command::Select(None)));
            }
        }));
        let (view, _) = watch::channel(ViewState::default());
        let mut engine = Self {
            map,
            policy,
            radius,
            inbox,
            view,
            query: String::new(),
            amenity_filter: NO_FILTER.to_string(),
            results: Vec::new(),
            known_amenities: BTreeSet::from([NO_FILTER.to_string()]),
            selected: None,
            pending: false,
            error: None,
            issued: 0,
            revision: 0,
        };
        engine.publish();
        engine
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> { self.view.subscribe() }

    pub fn map(&self) -> &M { &self.map }

    pub fn query(&self) -> &str { &self.query }

    pub fn amenity_filter(&self) -> &str { &self.amenity_filter }

    pub fn results(&self) -> &[PlaceRecord] { &self.results }

    pub fn known_amenities(&self) -> &BTreeSet<String> { &self.known_amenities }

    pub fn selected(&self) -> Option<&PlaceRecord> {
        let id = self.selected.as_ref()?;
        self.results.iter().find(|r| &r.id == id)
    }

    pub fn is_pending(&self) -> bool { self.pending }

    pub fn error(&self) -> Option<&str> { self.error.as_deref() }

    /// Returns whether the text changed, i.e. whether a search is due.
    pub fn set_query(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.query { return false; }
        self.query = text;
        self.publish();
        true
    }

    /// Store the filter and apply it to the current markers right away.
    /// Returns whether it changed.
    pub fn set_amenity_filter(&mut self, amenity: impl Into<String>) -> bool {
        let amenity = amenity.into();
        if amenity == self.amenity_filter { return false; }
        self.amenity_filter = amenity;
        self.apply_filter_inner();
        self.publish();
        true
    }

    /// Show or hide every marker by category without touching the provider.
    /// Returns the number of visible records.
    pub fn apply_filter(&mut self, amenity: &str) -> usize {
        let visible = self.filter_markers(amenity);
        self.publish();
        visible
    }

    fn apply_filter_inner(&mut self) -> usize {
        let amenity = std::mem::take(&mut self.amenity_filter);
        let visible = self.filter_markers(&amenity);
        self.amenity_filter = amenity;
        visible
    }

    fn filter_markers(&mut self, amenity: &str) -> usize {
        let mut visible = 0;
        for record in &mut self.results {
            let show = record.matches(amenity);
            record.marker_mut().set_visible(show);
            visible += usize::from(show);
        }
        debug!(amenity, visible, total = self.results.len(), "applied filter");
        visible
    }

    /// Build the request for the current state and mark it in flight.
    ///
    /// Returns `None` without issuing anything when the map has no usable center.
    pub fn begin_search(&mut self) -> Option<SearchTicket> {
        let Some(center) = self.map.center() else {
            warn!("map has no center, search not issued");
            self.error = Some(SearchError::ProviderUnavailable.to_string());
            self.publish();
            return None;
        };
        let zoom = self.map.zoom();
        let amenity = (self.policy.server_side_amenity && !self.amenity_filter.is_empty())
            .then(|| self.amenity_filter.clone());
        let request = SearchRequest {
            center,
            zoom,
            bounds: self.map.bounds(),
            radius_m: self.radius.radius_for_zoom(zoom),
            keyword: query::keyword(&self.query),
            name_pattern: query::fuzzy_pattern(&self.query),
            amenity,
        };
        self.issued += 1;
        self.pending = true;
        self.error = None;
        info!(seq = self.issued, query = %self.query, amenity = %self.amenity_filter, radius_m = request.radius_m, "search issued");
        self.publish();
        Some(SearchTicket { seq: self.issued, request })
    }

    /// Apply a provider outcome. Only the most recently issued search may
    /// change state.
    pub fn complete_search(
        &mut self,
        seq: u64,
        outcome: Result<Vec<PlaceCandidate>, ProviderError>,
    ) -> Completion {
        if seq != self.issued {
            debug!(seq, latest = self.issued, "discarding stale search result");
            return Completion::Stale;
        }
        self.pending = false;
        let completion = match outcome {
            Ok(candidates) if candidates.is_empty() => {
                self.clear_results();
                self.error = Some(SearchError::NoPlacesFound.to_string());
                info!(seq, "search returned no places");
                Completion::Empty
            }
            Ok(candidates) => {
                let count = self.replace_results(candidates);
                self.error = None;
                info!(seq, count, "search results applied");
                Completion::Replaced(count)
            }
            Err(err) => {
                let cleared = self.policy.clear_on_failure;
                if cleared { self.clear_results(); }
                warn!(seq, error = %err, cleared, "search failed");
                self.error = Some(SearchError::Failed.to_string());
                Completion::Failed { cleared }
            }
        };
        self.publish();
        completion
    }

    /// Tear down every record and marker and drop the selection.
    pub fn clear_results(&mut self) {
        self.selected = None;
        self.map.close_info();
        let removed = self.results.len();
        self.results.clear();
        self.map.clear_markers();
        if removed > 0 { debug!(removed, "removed previous results"); }
    }

    fn replace_results(&mut self, candidates: Vec<PlaceCandidate>) -> usize {
        self.clear_results();
        for candidate in candidates {
            if let Some(category) = &candidate.category {
                self.known_amenities.insert(category.clone());
            }
            let mut marker = self.map.add_marker(candidate.location);
            let inbox = self.inbox.clone();
            let id = candidate.id.clone();
            marker.on_click(Box::new(move |event: &mut ClickEvent| {
                event.mark_handled();
                if let Some(tx) = inbox.upgrade() {
                    let _ = tx.send(Event::Command(Command::Select(Some(id.clone()))));
                }
            }));
            self.results.push(PlaceRecord::new(candidate, marker));
        }
        self.apply_filter_inner();
        self.results.len()
    }

    /// Blur the previous selection, focus the new one and move the detail
    /// surface. `None` closes it. Unknown ids leave the state untouched.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        let target = match id {
            Some(id) => match self.results.iter().position(|r| r.id == id) {
                Some(index) => Some(index),
                None => {
                    debug!(id, "ignoring selection of a place that is no longer listed");
                    return false;
                }
            },
            None => None,
        };
        if let Some(previous) = self.selected.take() {
            if let Some(record) = self.results.iter_mut().find(|r| r.id == previous) {
                record.marker_mut().blur();
            }
        }
        match target {
            Some(index) => {
                let record = &mut self.results[index];
                record.marker_mut().focus();
                let marker = record.marker().id();
                self.selected = Some(record.id.clone());
                self.map.open_info(marker);
                debug!(id = %record.id, marker, "selected place");
            }
            None => self.map.close_info(),
        }
        self.publish();
        true
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            revision: self.revision,
            query: self.query.clone(),
            amenity_filter: self.amenity_filter.clone(),
            results: self.results.iter().map(PlaceRecord::summary).collect(),
            known_amenities: self.known_amenities.iter().cloned().collect(),
            selected: self.selected.clone(),
            pending: self.pending,
            error: self.error.clone(),
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        let view = self.view();
        self.view.send_replace(view);
    }
}
