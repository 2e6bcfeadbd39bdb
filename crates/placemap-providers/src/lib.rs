use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::info;

use placemap_core::config::{ProviderKind, ProviderSettings};
use placemap_core::traits::SearchProvider;

pub mod fixture;
pub mod google;
pub mod overpass;

pub use fixture::{Scripted, ScriptedProvider};
pub use google::GooglePlacesProvider;
pub use overpass::OverpassProvider;

/// Build the configured provider.
///
/// `APP_USE_FIXTURE_PROVIDER=1` forces the offline fixture regardless of
/// `provider.kind`.
pub fn get_default_provider(settings: &ProviderSettings) -> anyhow::Result<Arc<dyn SearchProvider>> {
    let use_fixture = std::env::var("APP_USE_FIXTURE_PROVIDER")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fixture || settings.kind == ProviderKind::Fixture {
        info!("using fixture provider");
        return Ok(Arc::new(ScriptedProvider::default()));
    }
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.kind {
        ProviderKind::Overpass => {
            info!(endpoint = %settings.overpass_url, "using overpass provider");
            Ok(Arc::new(OverpassProvider::new(&settings.overpass_url, timeout, settings.overpass_max_results)?))
        }
        ProviderKind::Google => {
            let key = settings
                .google_api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| anyhow!("provider.google_api_key is not set"))?;
            info!("using google places provider");
            Ok(Arc::new(GooglePlacesProvider::new(&settings.google_url, key, settings.photo_max_px, timeout)?))
        }
        ProviderKind::Fixture => Ok(Arc::new(ScriptedProvider::default())),
    }
}
