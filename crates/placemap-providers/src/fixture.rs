use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use placemap_core::error::ProviderError;
use placemap_core::traits::SearchProvider;
use placemap_core::types::{LatLng, PlaceCandidate, ProviderPolicy, SearchRequest};

use crate::overpass::{ADDRESS_PLACEHOLDER, PHONE_PLACEHOLDER};

/// One scripted reply: wait `delay`, then return `outcome`.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub delay: Duration,
    pub outcome: Result<Vec<PlaceCandidate>, ProviderError>,
}

impl Scripted {
    pub fn ok(candidates: Vec<PlaceCandidate>) -> Self { Self { delay: Duration::ZERO, outcome: Ok(candidates) } }
    pub fn err(error: ProviderError) -> Self { Self { delay: Duration::ZERO, outcome: Err(error) } }
    pub fn after(mut self, delay: Duration) -> Self { self.delay = delay; self }
}

/// Offline provider replaying queued replies and recording every request.
///
/// Once the queue is drained it answers from a small built-in neighbourhood
/// laid out around the request center, filtered by the request keyword.
pub struct ScriptedProvider {
    policy: ProviderPolicy,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self { Self::new(ProviderPolicy::OVERPASS) }
}

impl ScriptedProvider {
    pub fn new(policy: ProviderPolicy) -> Self {
        Self { policy, script: Mutex::new(VecDeque::new()), requests: Mutex::new(Vec::new()) }
    }

    pub fn push(&self, reply: Scripted) -> &Self {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(reply);
        self
    }

    /// Requests received so far, in issue order.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next_reply(&self, request: &SearchRequest) -> Scripted {
        let queued = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        queued.unwrap_or_else(|| Scripted::ok(neighbourhood(request)))
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str { "fixture" }

    fn policy(&self) -> ProviderPolicy { self.policy }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<PlaceCandidate>, ProviderError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        let reply = self.next_reply(request);
        if !reply.delay.is_zero() { tokio::time::sleep(reply.delay).await; }
        reply.outcome
    }
}

/// Minimal candidate for tests and scripted replies.
pub fn candidate(id: &str, name: &str, category: Option<&str>, location: LatLng) -> PlaceCandidate {
    PlaceCandidate {
        id: id.to_string(),
        name: name.to_string(),
        location,
        address: ADDRESS_PLACEHOLDER.to_string(),
        category: category.map(str::to_string),
        phone: Some(PHONE_PLACEHOLDER.to_string()),
        tags: Vec::new(),
        icon: None,
        photos: Vec::new(),
    }
}

const NEIGHBOURHOOD: [(&str, &str, f64, f64); 6] = [
    ("Corner Coffee", "cafe", 0.002, 0.001),
    ("Harbor Cafe", "cafe", -0.003, 0.004),
    ("Noodle House", "restaurant", 0.004, -0.002),
    ("Pike Street Pizza", "restaurant", -0.001, -0.005),
    ("Central Library", "library", 0.006, 0.003),
    ("Night Owl Pharmacy", "pharmacy", -0.005, 0.002),
];

fn neighbourhood(request: &SearchRequest) -> Vec<PlaceCandidate> {
    let words: Vec<String> = request
        .keyword
        .as_deref()
        .unwrap_or_default()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    NEIGHBOURHOOD
        .iter()
        .enumerate()
        .filter(|(_, (name, category, _, _))| {
            let haystack = format!("{} {}", name.to_lowercase(), category);
            words.iter().all(|w| haystack.contains(w.as_str()))
        })
        .filter(|(_, (_, category, _, _))| request.amenity.as_deref().map_or(true, |a| a == *category))
        .map(|(i, (name, category, dlat, dlng))| {
            let at = LatLng::new(request.center.lat + dlat, request.center.lng + dlng);
            candidate(&format!("fixture/{i}"), name, Some(*category), at)
        })
        .collect()
}
