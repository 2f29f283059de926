//! Engine configuration.
//!
//! All values are plain data with defaults tuned for an A4 page rendered at 96 dpi. Hosts can
//! load overrides from JSON; missing fields keep their defaults.
//!
//! ```rust
//! use folio_core::EditorConfig;
//!
//! let config = EditorConfig::from_json_str(r#"{ "page": { "content_height": 800.0 } }"#).unwrap();
//! assert_eq!(config.page.content_height, 800.0);
//! assert_eq!(config.history.capacity, 50);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::CommandError;

/// A4 page height at 96 dpi minus 20 mm top and bottom margins, in layout units.
pub const DEFAULT_PAGE_CONTENT_HEIGHT: f64 = 971.0;
/// Vertical gap accounted after every block.
pub const DEFAULT_BLOCK_MARGIN: f64 = 12.0;
/// Space kept free before content is pulled back from the next page.
pub const DEFAULT_OVERFLOW_BUFFER: f64 = 20.0;
/// Default number of undo levels.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Page geometry and reflow tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Maximum content height of one page (`H_max`).
    pub content_height: f64,
    /// Margin added below every block.
    pub block_margin: f64,
    /// Hysteresis band: underflow only pulls content while this much space stays free.
    pub overflow_buffer: f64,
    /// Minimum height that must remain above a heading for it to be carried to the next page.
    pub min_content_above_heading: f64,
    /// Minimum interval between an overflow on a page and a later underflow into it.
    pub reflow_cooldown_ms: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            content_height: DEFAULT_PAGE_CONTENT_HEIGHT,
            block_margin: DEFAULT_BLOCK_MARGIN,
            overflow_buffer: DEFAULT_OVERFLOW_BUFFER,
            min_content_above_heading: 1.0,
            reflow_cooldown_ms: 400,
        }
    }
}

impl PageConfig {
    /// Cooldown as a [`Duration`].
    pub fn reflow_cooldown(&self) -> Duration {
        Duration::from_millis(self.reflow_cooldown_ms)
    }
}

/// Undo history settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo snapshots kept; the oldest is dropped first.
    pub capacity: usize,
    /// Inactivity period after which a typing burst is committed as one snapshot.
    pub snapshot_debounce_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            snapshot_debounce_ms: 300,
        }
    }
}

/// Deferred-work settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Debounce applied to reflow requests caused by text edits.
    pub reflow_debounce_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reflow_debounce_ms: 250,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Page geometry.
    pub page: PageConfig,
    /// Undo history.
    pub history: HistoryConfig,
    /// Debounce timers.
    pub scheduler: SchedulerConfig,
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, CommandError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pagination and history math cannot work with.
    pub fn validate(&self) -> Result<(), CommandError> {
        if !(self.page.content_height.is_finite() && self.page.content_height > 0.0) {
            return Err(CommandError::Config(format!(
                "page.content_height must be positive, got {}",
                self.page.content_height
            )));
        }
        if self.page.block_margin < 0.0 || self.page.overflow_buffer < 0.0 {
            return Err(CommandError::Config(
                "page.block_margin and page.overflow_buffer must not be negative".to_string(),
            ));
        }
        if self.page.overflow_buffer >= self.page.content_height {
            return Err(CommandError::Config(
                "page.overflow_buffer must be smaller than page.content_height".to_string(),
            ));
        }
        if self.history.capacity == 0 {
            return Err(CommandError::Config(
                "history.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.page.content_height, DEFAULT_PAGE_CONTENT_HEIGHT);
        assert_eq!(config.history.capacity, 50);
        assert_eq!(config.history.snapshot_debounce_ms, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EditorConfig::from_json_str(r#"{"scheduler": {"reflow_debounce_ms": 10}}"#).unwrap();
        assert_eq!(config.scheduler.reflow_debounce_ms, 10);
        assert_eq!(config.page, PageConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let result = EditorConfig::from_json_str(r#"{"page": {"content_height": -1.0}}"#);
        assert!(matches!(result, Err(CommandError::Config(_))));

        let result = EditorConfig::from_json_str(r#"{"history": {"capacity": 0}}"#);
        assert!(matches!(result, Err(CommandError::Config(_))));

        let result = EditorConfig::from_json_str("not json");
        assert!(matches!(result, Err(CommandError::Serialization(_))));
    }
}
