use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use placemap_core::config::SearchSettings;
use placemap_core::error::ProviderError;
use placemap_core::types::{LatLng, PlaceCandidate, ProviderPolicy};
use placemap_engine::{EngineDriver, EngineHandle};
use placemap_map::HeadlessMap;
use placemap_providers::fixture::{candidate, Scripted, ScriptedProvider};

fn settings(search_on_start: bool) -> SearchSettings {
    SearchSettings { search_on_start, ..SearchSettings::default() }
}

fn seattle() -> HeadlessMap { HeadlessMap::new(LatLng::new(47.608013, -122.335167), 12) }

fn start(map: HeadlessMap, provider: Arc<ScriptedProvider>, settings: SearchSettings) -> (EngineHandle, tokio::task::JoinHandle<()>) {
    let (driver, handle) = EngineDriver::new(map, provider, &settings);
    (handle, tokio::spawn(driver.run()))
}

fn places(prefix: &str, n: usize) -> Vec<PlaceCandidate> {
    (0..n)
        .map(|i| candidate(&format!("{prefix}/{i}"), &format!("{prefix} {i}"), Some("cafe"), LatLng::new(47.6, -122.3)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn typing_burst_issues_one_search_with_final_text() {
    let provider = Arc::new(ScriptedProvider::default());
    provider.push(Scripted::ok(places("node", 3)));
    let (handle, _task) = start(seattle(), provider.clone(), settings(false));

    handle.set_query("c").unwrap();
    sleep(Duration::from_millis(100)).await;
    handle.set_query("co").unwrap();
    sleep(Duration::from_millis(100)).await;
    handle.set_query("coffee").unwrap();
    sleep(Duration::from_millis(300)).await;
    assert!(provider.requests().is_empty(), "quiet window not elapsed yet");

    let view = handle.wait_for(|v| v.results.len() == 3).await.unwrap();
    assert!(!view.pending);
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].keyword.as_deref(), Some("coffee"));
}

#[tokio::test(start_paused = true)]
async fn mixed_query_and_filter_burst_issues_one_search() {
    let provider = Arc::new(ScriptedProvider::new(ProviderPolicy::GOOGLE));
    let (handle, _task) = start(seattle(), provider.clone(), settings(false));

    handle.set_query("c").unwrap();
    sleep(Duration::from_millis(100)).await;
    handle.set_amenity("pharmacy").unwrap();
    sleep(Duration::from_millis(100)).await;
    handle.set_query("corner").unwrap();
    sleep(Duration::from_millis(100)).await;
    handle.set_amenity("cafe").unwrap();
    sleep(Duration::from_millis(300)).await;
    assert!(provider.requests().is_empty(), "every change restarted the window");

    let view = handle.wait_for(|v| !v.results.is_empty()).await.unwrap();
    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].name, "Corner Coffee");
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].keyword.as_deref(), Some("corner"));
    assert_eq!(requests[0].amenity.as_deref(), Some("cafe"));
}

#[tokio::test(start_paused = true)]
async fn initial_search_runs_on_start() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handle, _task) = start(seattle(), provider.clone(), settings(true));

    let view = handle.wait_for(|v| !v.results.is_empty()).await.unwrap();
    assert_eq!(view.results.len(), 6, "whole built-in neighbourhood");
    assert_eq!(view.known_amenities, vec!["", "cafe", "library", "pharmacy", "restaurant"]);
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].keyword, None);
}

#[tokio::test(start_paused = true)]
async fn slow_superseded_search_cannot_overwrite_newer_results() {
    let provider = Arc::new(ScriptedProvider::default());
    provider.push(Scripted::ok(places("slow", 5)).after(Duration::from_secs(2)));
    provider.push(Scripted::ok(places("fast", 2)));
    let (handle, _task) = start(seattle(), provider.clone(), settings(false));

    handle.set_query("a").unwrap();
    sleep(Duration::from_millis(600)).await;
    handle.set_query("b").unwrap();
    handle.wait_for(|v| v.results.len() == 2).await.unwrap();

    // let the slow reply land
    sleep(Duration::from_secs(3)).await;
    let view = handle.snapshot();
    assert_eq!(provider.requests().len(), 2);
    assert_eq!(view.query, "b");
    assert!(view.results.iter().all(|p| p.id.starts_with("fast/")));
    assert!(!view.pending);
}

#[tokio::test(start_paused = true)]
async fn failure_surfaces_fixed_message() {
    let provider = Arc::new(ScriptedProvider::default());
    provider.push(Scripted::ok(places("node", 2)));
    provider.push(Scripted::err(ProviderError::Transport("timed out".into())));
    let map = seattle();
    let (handle, _task) = start(map.clone(), provider, settings(true));
    handle.wait_for(|v| v.results.len() == 2).await.unwrap();

    handle.refresh().unwrap();
    let view = handle.wait_for(|v| v.error.is_some()).await.unwrap();
    assert_eq!(view.error.as_deref(), Some("search failed, please try again"));
    assert_eq!(view.results.len(), 2, "overpass keeps what it had");
    assert_eq!(map.live_markers().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn list_and_marker_clicks_select_after_short_delay() {
    let provider = Arc::new(ScriptedProvider::default());
    provider.push(Scripted::ok(places("node", 3)));
    let map = seattle();
    let (handle, _task) = start(map.clone(), provider, settings(true));
    let view = handle.wait_for(|v| v.results.len() == 3).await.unwrap();

    handle.select(Some(view.results[0].id.clone())).unwrap();
    handle.select(Some(view.results[1].id.clone())).unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.snapshot().selected, None, "selection waits for its window");

    let view = handle.wait_for(|v| v.selected.is_some()).await.unwrap();
    assert_eq!(view.selected.as_deref(), Some("node/1"), "only the last click lands");
    assert!(!map.marker(view.results[0].marker).unwrap().is_focused());
    assert!(map.marker(view.results[1].marker).unwrap().is_focused());

    map.click_marker(view.results[2].marker).unwrap();
    let view = handle.wait_for(|v| v.selected.as_deref() == Some("node/2")).await.unwrap();
    assert_eq!(map.info_anchor(), Some(view.results[2].marker));

    map.click_map();
    handle.wait_for(|v| v.selected.is_none()).await.unwrap();
    assert_eq!(map.info_anchor(), None);
}

#[tokio::test(start_paused = true)]
async fn amenity_change_searches_server_side_for_google() {
    let provider = Arc::new(ScriptedProvider::new(ProviderPolicy::GOOGLE));
    let (handle, _task) = start(seattle(), provider.clone(), settings(false));

    handle.set_amenity("pharmacy").unwrap();
    let view = handle.wait_for(|v| !v.results.is_empty()).await.unwrap();

    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].name, "Night Owl Pharmacy");
    assert_eq!(provider.requests()[0].amenity.as_deref(), Some("pharmacy"));
}

#[tokio::test(start_paused = true)]
async fn refresh_uses_the_current_viewport() {
    let provider = Arc::new(ScriptedProvider::default());
    let map = seattle();
    let (handle, _task) = start(map.clone(), provider.clone(), settings(true));
    handle.wait_for(|v| !v.results.is_empty()).await.unwrap();

    let portland = LatLng::new(45.5152, -122.6784);
    map.set_view(portland, 14);
    handle.refresh().unwrap();
    handle.wait_for(|v| v.results.iter().all(|p| p.location.lat < 46.0)).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].center, portland);
    assert_eq!(requests[1].zoom, 14);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_loop_and_releases_markers() {
    let provider = Arc::new(ScriptedProvider::default());
    let map = seattle();
    let (handle, task) = start(map.clone(), provider, settings(true));
    handle.wait_for(|v| !v.results.is_empty()).await.unwrap();

    handle.shutdown().unwrap();
    task.await.unwrap();
    assert!(map.live_markers().is_empty());
    assert!(handle.set_query("late").is_err());
    assert!(handle.wait_for(|_| false).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_ends_the_driver() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handle, task) = start(seattle(), provider, settings(true));
    handle.wait_for(|v| !v.results.is_empty()).await.unwrap();

    drop(handle);
    task.await.unwrap();
}
