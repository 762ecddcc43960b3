//! Optional TOML configuration. Every field has a default, and command-line
//! flags override whatever the file sets.
//!
//! ```toml
//! window_days = 100
//! gap_tolerance = 3
//! prefix = "solutions/"
//! theme = "light"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calendar::DEFAULT_WINDOW_DAYS;
use crate::error::{ExplorerError, Result};
use crate::state::Theme;
use crate::statistics::StatsOptions;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Trailing heatmap window in days.
    pub window_days: u32,
    /// Inactive days tolerated inside a streak.
    pub gap_tolerance: u32,
    /// How far back the streak may reach.
    pub streak_lookback_days: u32,
    /// Weeks in the weekly performance chart.
    pub weekly_weeks: usize,
    /// Path prefix of the solutions folder.
    pub prefix: String,
    pub theme: Theme,
    /// Sidebar width in columns.
    pub sidebar_width: u16,
    /// Debounce interval for reloads, in seconds.
    pub refresh_interval: f64,
    /// Include hidden files when scanning a plain directory.
    pub show_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            gap_tolerance: 3,
            streak_lookback_days: 180,
            weekly_weeks: 8,
            prefix: "solutions/".to_string(),
            theme: Theme::Dark,
            sidebar_width: 40,
            refresh_interval: 0.5,
            show_hidden: false,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ExplorerError::io(path, e))?;
        toml::from_str(&content).map_err(|e| ExplorerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn stats_options(&self) -> StatsOptions {
        StatsOptions {
            prefix: self.prefix.clone(),
            gap_tolerance: self.gap_tolerance,
            lookback_days: self.streak_lookback_days,
            weekly_weeks: self.weekly_weeks,
            ..StatsOptions::default()
        }
    }
}
