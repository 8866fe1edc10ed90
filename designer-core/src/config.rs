//! Top-level configuration for a design session.
//!
//! Every section is optional in the JSON form; missing fields take their
//! defaults, so `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentOptions;
use crate::error::DesignerResult;
use crate::history::HistoryConfig;
use crate::layout::{LayoutCacheConfig, LayoutConfig};

/// Configuration of every engine in a [`crate::DesignSession`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignerConfig {
    /// Layout algorithm settings.
    pub layout: LayoutConfig,
    /// Layout cache and debounce settings.
    pub cache: LayoutCacheConfig,
    /// Drag-time alignment settings.
    pub alignment: AlignmentOptions,
    /// Undo/redo settings.
    pub history: HistoryConfig,
}

impl DesignerConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or a present
    /// field has the wrong type.
    pub fn from_json(json: &str) -> DesignerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the layout section.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Set the cache section.
    #[must_use]
    pub fn with_cache(mut self, cache: LayoutCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the alignment section.
    #[must_use]
    pub fn with_alignment(mut self, alignment: AlignmentOptions) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the history section.
    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }
}

/// Serde adapter storing a [`Duration`](std::time::Duration) as fractional
/// milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as milliseconds.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::cast_precision_loss)] // Sub-nanosecond precision is irrelevant here
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
    }

    /// Deserialize from milliseconds. Negative or non-finite values are zero.
    ///
    /// # Errors
    ///
    /// Fails if the value is not a number.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Checked positive and finite
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if millis.is_finite() && millis > 0.0 {
            Ok(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
        } else {
            Ok(Duration::ZERO)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_document_is_default() {
        let config = DesignerConfig::from_json("{}").expect("empty config parses");
        assert_eq!(config, DesignerConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let json = r#"{
            "layout": {"enableGridSnapping": true},
            "cache": {"ttl": 250, "debounceInterval": 32},
            "alignment": {"snapThreshold": 8},
            "history": {"maxHistorySize": 10}
        }"#;
        let config = DesignerConfig::from_json(json).expect("parses");
        assert!(config.layout.enable_grid_snapping);
        assert_eq!(config.layout.columns, 12);
        assert_eq!(config.cache.ttl, Duration::from_millis(250));
        assert_eq!(config.cache.debounce_interval, Duration::from_millis(32));
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.alignment.snap_threshold, 8.0);
        assert_eq!(config.history.max_history_size, 10);
        assert_eq!(config.history.compression_threshold, 20);
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        assert!(DesignerConfig::from_json(r#"{"cache": {"capacity": "lots"}}"#).is_err());
    }

    #[test]
    fn test_duration_round_trip_in_milliseconds() {
        let json = serde_json::to_value(DesignerConfig::default()).expect("serialize");
        assert_eq!(json["cache"]["ttl"], serde_json::json!(5000.0));
        assert_eq!(json["cache"]["debounceInterval"], serde_json::json!(16.0));
    }
}
