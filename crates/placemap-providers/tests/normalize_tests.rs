use std::time::Duration;

use serde_json::json;

use placemap_core::error::ProviderError;
use placemap_core::traits::SearchProvider;
use placemap_core::types::{LatLng, ProviderPolicy, SearchRequest};
use placemap_providers::fixture::candidate;
use placemap_providers::google::{GooglePlacesProvider, NearbySearchResponse, MAX_PHOTOS};
use placemap_providers::overpass::{self, OverpassResponse, ADDRESS_PLACEHOLDER, PHONE_PLACEHOLDER};
use placemap_providers::{Scripted, ScriptedProvider};

fn request(keyword: Option<&str>, amenity: Option<&str>) -> SearchRequest {
    SearchRequest {
        center: LatLng::new(47.6, -122.3),
        zoom: 12,
        bounds: None,
        radius_m: 5000,
        keyword: keyword.map(str::to_string),
        name_pattern: keyword.and_then(placemap_core::query::fuzzy_pattern),
        amenity: amenity.map(str::to_string),
    }
}

#[test]
fn overpass_query_uses_name_pattern_and_radius() {
    let q = overpass::build_query(&request(Some("joe's coffee"), None), 25, 200);
    assert!(q.starts_with("[out:json][timeout:25];"));
    assert!(q.contains("node[\"name\"~\"joe.*s.*coffee\",i](around:5000,47.6,-122.3);"));
    assert!(q.contains("way[\"name\"~"));
    assert!(q.contains("relation[\"name\"~"));
    assert!(q.trim_end().ends_with("out center 200;"), "result count is capped");

    let q = overpass::build_query(&request(None, Some("cafe")), 25, 50);
    assert!(q.contains("node[\"amenity\"](around:5000,47.6,-122.3);"), "amenity is filtered client-side");
    assert!(!q.contains("cafe"));
    assert!(q.contains("out center 50;"));
}

#[test]
fn overpass_runtime_remark_is_a_failure_not_an_empty_result() {
    let aborted: OverpassResponse = serde_json::from_value(json!({
        "elements": [],
        "remark": "runtime error: Query timed out in \"query\" at line 3 after 25 seconds."
    }))
    .unwrap();
    match overpass::into_candidates(aborted) {
        Err(ProviderError::Status(remark)) => assert!(remark.starts_with("runtime error")),
        other => panic!("expected a status failure, got {other:?}"),
    }

    let empty: OverpassResponse = serde_json::from_value(json!({ "elements": [] })).unwrap();
    assert_eq!(overpass::into_candidates(empty), Ok(vec![]));

    let noted: OverpassResponse = serde_json::from_value(json!({
        "elements": [{ "type": "node", "id": 7, "lat": 47.6, "lon": -122.3, "tags": { "amenity": "cafe" } }],
        "remark": "informational only"
    }))
    .unwrap();
    assert_eq!(overpass::into_candidates(noted).unwrap().len(), 1);
}

#[test]
fn overpass_normalization_follows_tag_rules() {
    let body = json!({
        "elements": [
            {
                "type": "node", "id": 1, "lat": 47.61, "lon": -122.33,
                "tags": {
                    "website": "https://example.org",
                    "addr:housenumber": "1912",
                    "name": "Pike Coffee",
                    "addr:street": "Pike Pl",
                    "source": "survey;bing",
                    "amenity": "cafe",
                    "addr:postcode": "98101",
                    "check_date": "2023-01-01",
                    "addr:city": "Seattle",
                    "cuisine": "coffee_shop"
                }
            },
            {
                "type": "way", "id": 1, "center": { "lat": 47.62, "lon": -122.34 },
                "tags": { "amenity": "restaurant", "phone": "+1 206 555 0100" }
            },
            { "type": "relation", "id": 9, "tags": { "amenity": "cafe" } }
        ]
    });
    let response: OverpassResponse = serde_json::from_value(body).unwrap();
    let places = overpass::normalize(response);

    assert_eq!(places.len(), 2, "element without coordinates is skipped");
    let cafe = &places[0];
    assert_eq!(cafe.id, "node/1");
    assert_eq!(cafe.name, "Pike Coffee");
    assert_eq!(cafe.address, "1912 Pike Pl 98101, Seattle");
    assert_eq!(cafe.category.as_deref(), Some("cafe"));
    assert_eq!(cafe.phone.as_deref(), Some(PHONE_PLACEHOLDER));
    let keys: Vec<&str> = cafe.tags.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["website", "source", "cuisine"], "provider order, address and checked tags dropped");
    assert_eq!(cafe.tags[1].1, "survey, bing");

    let restaurant = &places[1];
    assert_eq!(restaurant.id, "way/1", "ids stay unique across element types");
    assert_eq!(restaurant.location, LatLng::new(47.62, -122.34));
    assert_eq!(restaurant.address, ADDRESS_PLACEHOLDER);
    assert_eq!(restaurant.phone.as_deref(), Some("+1 206 555 0100"));
    assert!(restaurant.tags.is_empty());
}

#[test]
fn overpass_address_uses_available_parts() {
    let tags = json!({ "addr:city": "Seattle" });
    assert_eq!(overpass::format_address(tags.as_object().unwrap()), "Seattle");
    let tags = json!({ "addr:street": "Pine St", "addr:housenumber": "400" });
    assert_eq!(overpass::format_address(tags.as_object().unwrap()), "400 Pine St");
    let tags = json!({ "addr:country": "US" });
    assert_eq!(overpass::format_address(tags.as_object().unwrap()), ADDRESS_PLACEHOLDER);
}

fn google() -> GooglePlacesProvider {
    GooglePlacesProvider::new("https://maps.example.test/api/place/", "secret", 160, Duration::from_secs(5)).unwrap()
}

#[test]
fn google_projection_keeps_fields_and_bounds_photos() {
    let photos: Vec<_> = (0..12)
        .map(|i| json!({ "width": 800, "height": 600, "html_attributions": ["a"], "photo_reference": format!("ref{i}") }))
        .collect();
    let body = json!({
        "status": "OK",
        "results": [{
            "place_id": "abc",
            "name": "Harbor Cafe",
            "vicinity": "1 Harbor Ave",
            "types": ["cafe", "food", "point_of_interest"],
            "icon": "https://maps.example.test/icon.png",
            "geometry": { "location": { "lat": 47.6, "lng": -122.3 } },
            "photos": photos
        }]
    });
    let response: NearbySearchResponse = serde_json::from_value(body).unwrap();
    let places = google().normalize(response, None).unwrap();

    assert_eq!(places.len(), 1);
    let place = &places[0];
    assert_eq!(place.id, "abc");
    assert_eq!(place.address, "1 Harbor Ave");
    assert_eq!(place.category.as_deref(), Some("cafe"));
    assert_eq!(place.tags.len(), 3);
    assert_eq!(place.photos.len(), MAX_PHOTOS);
    assert_eq!(
        place.photos[0].url,
        "https://maps.example.test/api/place/photo?maxwidth=160&maxheight=160&photo_reference=ref0&key=secret"
    );
    assert_eq!(place.phone, None);
}

#[test]
fn google_status_mapping() {
    let zero: NearbySearchResponse = serde_json::from_value(json!({ "status": "ZERO_RESULTS" })).unwrap();
    assert!(google().normalize(zero, None).unwrap().is_empty());

    let denied: NearbySearchResponse =
        serde_json::from_value(json!({ "status": "REQUEST_DENIED", "error_message": "bad key" })).unwrap();
    assert_eq!(
        google().normalize(denied, None).unwrap_err(),
        ProviderError::Status("REQUEST_DENIED: bad key".to_string())
    );
}

#[test]
fn google_category_prefers_the_requested_type() {
    let body = json!({
        "status": "OK",
        "results": [
            {
                "place_id": "bakery-cafe",
                "name": "Morning Loaf",
                "types": ["bakery", "cafe", "food"],
                "geometry": { "location": { "lat": 47.6, "lng": -122.3 } }
            },
            {
                "place_id": "plain",
                "name": "No Types",
                "geometry": { "location": { "lat": 47.6, "lng": -122.3 } }
            }
        ]
    });
    let filtered: NearbySearchResponse = serde_json::from_value(body.clone()).unwrap();
    let places = google().normalize(filtered, Some("cafe")).unwrap();
    assert_eq!(places[0].category.as_deref(), Some("cafe"));
    assert_eq!(places[0].tags.len(), 3, "every type is still listed");
    assert_eq!(places[1].category, None);

    let unfiltered: NearbySearchResponse = serde_json::from_value(body).unwrap();
    let places = google().normalize(unfiltered, None).unwrap();
    assert_eq!(places[0].category.as_deref(), Some("bakery"));
}

#[test]
fn google_sends_amenity_as_type() {
    let params = google().query_params(&request(Some("espresso bar"), Some("cafe")));
    assert!(params.contains(&("keyword", "espresso bar".to_string())));
    assert!(params.contains(&("type", "cafe".to_string())));
    assert!(params.contains(&("radius", "5000".to_string())));
    assert_eq!(google().policy(), ProviderPolicy::GOOGLE);
}

#[tokio::test(start_paused = true)]
async fn scripted_provider_replays_in_order_and_records_requests() {
    let provider = ScriptedProvider::default();
    let here = LatLng::new(47.6, -122.3);
    provider
        .push(Scripted::ok(vec![candidate("a", "A", Some("cafe"), here)]).after(Duration::from_millis(50)))
        .push(Scripted::err(ProviderError::Transport("offline".into())));

    let first = provider.search(&request(Some("a"), None)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert!(provider.search(&request(Some("b"), None)).await.is_err());

    // drained queue falls back to the built-in neighbourhood
    let cafes = provider.search(&request(None, Some("cafe"))).await.unwrap();
    assert_eq!(cafes.len(), 2);
    assert!(cafes.iter().all(|c| c.category.as_deref() == Some("cafe")));

    let keywords: Vec<Option<String>> = provider.requests().into_iter().map(|r| r.keyword).collect();
    assert_eq!(keywords, vec![Some("a".to_string()), Some("b".to_string()), None]);
}
