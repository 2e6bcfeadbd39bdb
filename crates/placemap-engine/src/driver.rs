use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use placemap_core::config::SearchSettings;
use placemap_core::error::ProviderError;
use placemap_core::traits::{MapSurface, SearchProvider};
use placemap_core::types::{PlaceCandidate, PlaceId};

use crate::debounce::{Debouncer, Due};
use crate::engine::SyncEngine;
use crate::state::ViewState;

/// User actions forwarded by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetQuery(String),
    SetAmenity(String),
    /// List click, marker click or empty-map click (`None`).
    Select(Option<PlaceId>),
    /// Search again with the unchanged query and filter, e.g. after the map moved.
    Refresh,
    Shutdown,
}

/// Everything the driver reacts to, in arrival order.
#[derive(Debug)]
pub enum Event {
    Command(Command),
    SearchDue(Due),
    SelectDue(Due),
    SearchDone { seq: u64, outcome: Result<Vec<PlaceCandidate>, ProviderError> },
}

/// Runs a `SyncEngine` on a single task.
///
/// Internal senders (timers, in-flight searches, map listeners) are weak, so
/// the loop also ends once every `EngineHandle` is gone.
pub struct EngineDriver<M: MapSurface> {
    engine: SyncEngine<M>,
    provider: Arc<dyn SearchProvider>,
    inbox: mpsc::UnboundedReceiver<Event>,
    outbox: mpsc::WeakUnboundedSender<Event>,
    search: Debouncer<(), Event>,
    select: Debouncer<Option<PlaceId>, Event>,
    search_on_start: bool,
}

impl<M: MapSurface + 'static> EngineDriver<M> {
    pub fn new(map: M, provider: Arc<dyn SearchProvider>, settings: &SearchSettings) -> (Self, EngineHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let outbox = tx.downgrade();
        let engine = SyncEngine::new(map, provider.policy(), settings.radius_rule(), outbox.clone());
        let handle = EngineHandle { tx, view: engine.subscribe() };
        let driver = Self {
            engine,
            provider,
            inbox,
            search: Debouncer::new(Duration::from_millis(settings.debounce_ms), outbox.clone(), Event::SearchDue),
            select: Debouncer::new(Duration::from_millis(settings.select_debounce_ms), outbox.clone(), Event::SelectDue),
            outbox,
            search_on_start: settings.search_on_start,
        };
        (driver, handle)
    }

    pub fn engine(&self) -> &SyncEngine<M> { &self.engine }

    pub async fn run(mut self) {
        info!(provider = self.provider.name(), "engine started");
        if self.search_on_start { self.search.schedule(()); }
        while let Some(event) = self.inbox.recv().await {
            if !self.handle(event) { break; }
        }
        self.search.cancel();
        self.select.cancel();
        info!("engine stopped");
    }

    /// Returns `false` once the driver should stop.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Command(command) => return self.handle_command(command),
            Event::SearchDue(due) => {
                if self.search.fire(due).is_some() { self.issue_search(); }
            }
            Event::SelectDue(due) => {
                if let Some(target) = self.select.fire(due) { self.engine.select(target.as_deref()); }
            }
            Event::SearchDone { seq, outcome } => {
                self.engine.complete_search(seq, outcome);
            }
        }
        true
    }

    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::SetQuery(text) => {
                if self.engine.set_query(text) { self.search.schedule(()); }
            }
            Command::SetAmenity(amenity) => {
                if self.engine.set_amenity_filter(amenity) { self.search.schedule(()); }
            }
            Command::Select(target) => self.select.schedule(target),
            Command::Refresh => self.search.schedule(()),
            Command::Shutdown => return false,
        }
        true
    }

    fn issue_search(&mut self) {
        let Some(ticket) = self.engine.begin_search() else { return };
        let provider = Arc::clone(&self.provider);
        let outbox = self.outbox.clone();
        tokio::spawn(async move {
            let outcome = provider.search(&ticket.request).await;
            match outbox.upgrade() {
                Some(tx) => {
                    let _ = tx.send(Event::SearchDone { seq: ticket.seq, outcome });
                }
                None => debug!(seq = ticket.seq, "engine gone before search completed"),
            }
        });
    }
}

/// Cloneable front door to a running `EngineDriver`.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Event>,
    view: watch::Receiver<ViewState>,
}

impl EngineHandle {
    pub fn send(&self, command: Command) -> anyhow::Result<()> {
        self.tx.send(Event::Command(command)).map_err(|_| anyhow!("engine is not running"))
    }

    pub fn set_query(&self, text: impl Into<String>) -> anyhow::Result<()> { self.send(Command::SetQuery(text.into())) }

    pub fn set_amenity(&self, amenity: impl Into<String>) -> anyhow::Result<()> {
        self.send(Command::SetAmenity(amenity.into()))
    }

    pub fn select(&self, id: Option<PlaceId>) -> anyhow::Result<()> { self.send(Command::Select(id)) }

    pub fn refresh(&self) -> anyhow::Result<()> { self.send(Command::Refresh) }

    pub fn shutdown(&self) -> anyhow::Result<()> { self.send(Command::Shutdown) }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> { self.view.clone() }

    pub fn snapshot(&self) -> ViewState { self.view.borrow().clone() }

    /// Wait for the first published state satisfying `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&ViewState) -> bool) -> anyhow::Result<ViewState> {
        let mut view = self.view.clone();
        let state = view.wait_for(predicate).await.map_err(|_| anyhow!("engine stopped"))?;
        Ok(state.clone())
    }
}
