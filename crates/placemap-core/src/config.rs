//! Configuration loader.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys separated by `__`, e.g.
//! `APP_SEARCH__DEBOUNCE_MS=300`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};
use crate::query::RadiusRule;
use crate::types::LatLng;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match env {
            "prod" | "production" if settings.provider.kind == ProviderKind::Fixture => {
                Err(Error::InvalidConfig("the fixture provider cannot be used in production".into()).into())
            }
            _ => Ok(()),
        }
    }
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub map: MapSettings,
    pub search: SearchSettings,
    pub provider: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapSettings {
    fn default() -> Self {
        // Seattle
        Self { center: LatLng::new(47.608013, -122.335167), zoom: 12 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub select_debounce_ms: u64,
    pub radius_scale_m: f64,
    pub min_radius_m: u32,
    pub max_radius_m: u32,
    pub search_on_start: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let rule = RadiusRule::default();
        Self {
            debounce_ms: 500,
            select_debounce_ms: 200,
            radius_scale_m: rule.scale_m,
            min_radius_m: rule.min_m,
            max_radius_m: rule.max_m,
            search_on_start: true,
        }
    }
}

impl SearchSettings {
    pub fn radius_rule(&self) -> RadiusRule {
        RadiusRule { scale_m: self.radius_scale_m, min_m: self.min_radius_m, max_m: self.max_radius_m }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Overpass,
    Google,
    Fixture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub overpass_url: String,
    pub google_url: String,
    pub google_api_key: Option<String>,
    pub timeout_secs: u64,
    pub photo_max_px: u32,
    /// Cap on elements an Overpass query may return (`out center <n>;`).
    pub overpass_max_results: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Overpass,
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            google_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            google_api_key: None,
            timeout_secs: 25,
            photo_max_px: 160,
            overpass_max_results: 200,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.map.zoom) {
            return Err(Error::InvalidConfig(format!("map.zoom must be within 1..=22, got {}", self.map.zoom)));
        }
        if !self.map.center.is_valid() {
            return Err(Error::InvalidConfig(format!("map.center is not a valid coordinate: {:?}", self.map.center)));
        }
        if self.search.debounce_ms == 0 || self.search.select_debounce_ms == 0 {
            return Err(Error::InvalidConfig("debounce windows must be greater than zero".into()));
        }
        if self.search.radius_scale_m <= 0.0 || self.search.min_radius_m > self.search.max_radius_m {
            return Err(Error::InvalidConfig(format!(
                "invalid radius rule: scale={} min={} max={}",
                self.search.radius_scale_m, self.search.min_radius_m, self.search.max_radius_m
            )));
        }
        if self.provider.overpass_max_results == 0 {
            return Err(Error::InvalidConfig("provider.overpass_max_results must be greater than zero".into()));
        }
        if self.provider.kind == ProviderKind::Google
            && self.provider.google_api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(Error::InvalidConfig("provider.google_api_key is required for the google provider".into()));
        }
        Ok(())
    }
}
