use std::time::Duration;

use anyhow::{anyhow, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use placemap_core::config::Config;
use placemap_core::traits::MapSurface;
use placemap_core::types::{LatLng, PlaceId};
use placemap_engine::{EngineDriver, EngineHandle, PlaceSummary, ViewState};
use placemap_map::HeadlessMap;
use placemap_providers::get_default_provider;

const USAGE: &str = "commands:
  q <text>              search by name (empty clears)
  a <amenity>           filter by amenity (empty shows all)
  s <n>                 select result n from the list
  click <n> | click     click marker n | click the empty map
  goto <lat> <lng> [z]  move the map and search again
  refresh | list | help | quit";

#[derive(Debug, PartialEq)]
enum Input {
    Query(String),
    Amenity(String),
    Select(usize),
    ClickMarker(usize),
    ClickMap,
    Goto(LatLng, Option<u8>),
    Refresh,
    List,
    Help,
    Quit,
}

fn parse(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(' ').map_or((line, ""), |(c, r)| (c, r.trim()));
    let index = |s: &str| s.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| format!("expected a result number, got {s:?}"));
    match cmd {
        "q" => Ok(Input::Query(rest.to_string())),
        "a" => Ok(Input::Amenity(rest.to_string())),
        "s" => index(rest).map(Input::Select),
        "click" if rest.is_empty() => Ok(Input::ClickMap),
        "click" => index(rest).map(Input::ClickMarker),
        "goto" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let coord = |i: usize| parts.get(i).and_then(|p| p.parse::<f64>().ok());
            let (Some(lat), Some(lng)) = (coord(0), coord(1)) else { return Err("usage: goto <lat> <lng> [zoom]".into()) };
            let center = LatLng::new(lat, lng);
            if !center.is_valid() { return Err(format!("{lat},{lng} is not a valid coordinate")); }
            let zoom = match parts.get(2) {
                Some(z) => Some(z.parse::<u8>().ok().filter(|z| (1..=22).contains(z)).ok_or("zoom must be 1..=22")?),
                None => None,
            };
            Ok(Input::Goto(center, zoom))
        }
        "refresh" => Ok(Input::Refresh),
        "list" | "" => Ok(Input::List),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command {other:?}, try help")),
    }
}

fn nth(handle: &EngineHandle, n: usize) -> anyhow::Result<PlaceSummary> {
    let view = handle.snapshot();
    n.checked_sub(1).and_then(|i| view.results.get(i).cloned()).ok_or_else(|| anyhow!("no result {n} ({} listed)", view.results.len()))
}

fn apply(input: Input, handle: &EngineHandle, map: &HeadlessMap) -> anyhow::Result<()> {
    match input {
        Input::Query(text) => handle.set_query(text),
        Input::Amenity(amenity) => handle.set_amenity(amenity),
        Input::Select(n) => handle.select(Some(nth(handle, n)?.id)),
        Input::ClickMarker(n) => {
            let place = nth(handle, n)?;
            map.click_marker(place.marker).map(|_| ()).ok_or_else(|| anyhow!("marker for {} is gone", place.id))
        }
        Input::ClickMap => { map.click_map(); Ok(()) }
        Input::Goto(center, zoom) => {
            map.set_view(center, zoom.unwrap_or_else(|| map.zoom()));
            handle.refresh()
        }
        Input::Refresh => handle.refresh(),
        Input::List => { print_view(&handle.snapshot()); Ok(()) }
        Input::Help => { println!("{USAGE}"); Ok(()) }
        Input::Quit => Ok(()),
    }
}

fn print_view(view: &ViewState) {
    if let Some(error) = &view.error { println!("! {error}"); }
    let filter = if view.amenity_filter.is_empty() { "all" } else { view.amenity_filter.as_str() };
    println!("{} places, {} shown (filter: {})", view.results.len(), view.visible().count(), filter);
    for (i, place) in view.results.iter().enumerate().filter(|(_, p)| p.visible) {
        let mark = if view.selected.as_ref() == Some(&place.id) { '*' } else { ' ' };
        println!("{mark}{:>3}. {} [{}] {}", i + 1, place.name, place.category.as_deref().unwrap_or("-"), place.address);
    }
    let amenities: Vec<&str> = view.known_amenities.iter().map(String::as_str).filter(|a| !a.is_empty()).collect();
    if !amenities.is_empty() { println!("amenities: {}", amenities.join(", ")); }
    if let Some(place) = view.selected_place() { print_details(place); }
}

/// The info window for the selected place.
fn print_details(place: &PlaceSummary) {
    println!("-- {} --", place.name);
    println!("   {}", place.address);
    if let Some(phone) = &place.phone { println!("   phone: {phone}"); }
    for (key, value) in &place.tags { println!("   {key}: {value}"); }
    if let Some(photo) = place.photos.first() { println!("   {} photos, first: {}", place.photos.len(), photo.url); }
}

type Shown = (Vec<(PlaceId, bool)>, Option<PlaceId>, Option<String>);

fn shown(view: &ViewState) -> Shown {
    (view.results.iter().map(|p| (p.id.clone(), p.visible)).collect(), view.selected.clone(), view.error.clone())
}

/// Print every settled state that differs from the last one printed; spin while a search is out.
async fn render(mut view: watch::Receiver<ViewState>) -> anyhow::Result<()> {
    let style = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?;
    let mut spinner: Option<ProgressBar> = None;
    let mut last: Option<Shown> = None;
    while view.changed().await.is_ok() {
        let state = view.borrow_and_update().clone();
        if state.pending {
            if spinner.is_none() {
                let pb = ProgressBar::new_spinner();
                pb.set_style(style.clone());
                pb.set_message(format!("searching {:?}", state.query));
                pb.enable_steady_tick(Duration::from_millis(100));
                spinner = Some(pb);
            }
            continue;
        }
        if let Some(pb) = spinner.take() { pb.finish_and_clear(); }
        let current = shown(&state);
        if last.as_ref() != Some(&current) {
            print_view(&state);
            last = Some(current);
        }
    }
    if let Some(pb) = spinner.take() { pb.finish_and_clear(); }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let map = HeadlessMap::new(settings.map.center, settings.map.zoom);
    let provider = get_default_provider(&settings.provider).context("creating search provider")?;
    let (driver, handle) = EngineDriver::new(map.clone(), provider, &settings.search);
    let engine = tokio::spawn(driver.run());
    let renderer = tokio::spawn(render(handle.subscribe()));
    info!(lat = settings.map.center.lat, lng = settings.map.center.lng, zoom = settings.map.zoom, "map ready");
    println!("{USAGE}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse(&line) {
            Ok(Input::Quit) => break,
            Ok(input) => if let Err(e) = apply(input, &handle, &map) { eprintln!("{e}"); },
            Err(msg) => eprintln!("{msg}"),
        }
    }
    // the engine may already be gone if stdin closed after a failure
    let _ = handle.shutdown();
    engine.await?;
    renderer.await??;
    Ok(())
}
