//! Query text normalization and the zoom to radius rule.

use serde::{Deserialize, Serialize};

/// Separator inserted between words of a fuzzy name pattern.
pub const WILDCARD: &str = ".*";

/// Trimmed keyword, `None` when the text is blank.
pub fn keyword(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Collapse every run of non-alphanumeric characters into a single wildcard.
///
/// `"Joe's  coffee-shop"` becomes `"Joe.*s.*coffee.*shop"`. Leading and
/// trailing separators are dropped; text without any alphanumeric character
/// yields `None`.
pub fn fuzzy_pattern(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    if words.is_empty() { None } else { Some(words.join(WILDCARD)) }
}

/// Search radius inversely proportional to zoom: `scale_m / zoom`, clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusRule {
    pub scale_m: f64,
    pub min_m: u32,
    pub max_m: u32,
}

impl Default for RadiusRule {
    fn default() -> Self {
        Self { scale_m: 60_000.0, min_m: 250, max_m: 50_000 }
    }
}

impl RadiusRule {
    pub fn radius_for_zoom(&self, zoom: u8) -> u32 {
        let zoom = f64::from(zoom.max(1));
        let raw = (self.scale_m / zoom).round();
        // an inverted range collapses to `min_m` instead of panicking in `clamp`
        let max = self.max_m.max(self.min_m);
        let clamped = raw.clamp(f64::from(self.min_m), f64::from(max));
        clamped as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_pattern_collapses_separators() {
        assert_eq!(fuzzy_pattern("Joe's  coffee-shop").as_deref(), Some("Joe.*s.*coffee.*shop"));
        assert_eq!(fuzzy_pattern("  --  "), None);
        assert_eq!(fuzzy_pattern("café"), Some("café".to_string()));
    }

    #[test]
    fn radius_shrinks_as_zoom_grows() {
        let rule = RadiusRule::default();
        assert_eq!(rule.radius_for_zoom(12), 5_000);
        assert!(rule.radius_for_zoom(16) < rule.radius_for_zoom(12));
        assert_eq!(rule.radius_for_zoom(0), 50_000);
        assert_eq!(rule.radius_for_zoom(255), 250);
    }

    #[test]
    fn inverted_clamp_range_pins_to_minimum() {
        let rule = RadiusRule { scale_m: 60_000.0, min_m: 2_000, max_m: 500 };
        assert_eq!(rule.radius_for_zoom(12), 2_000);
        assert_eq!(rule.radius_for_zoom(1), 2_000);
    }
}
