use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::state::Theme;

/// Default config file looked up in the repository when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "dsa-explorer.toml";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpKind {
    /// The (filtered) nested tree
    Tree,
    /// The calendar heatmap layout
    Heatmap,
    /// The statistics dashboard
    Stats,
}

/// Browse a DSA solutions repository with an activity heatmap
#[derive(Parser, Debug)]
#[command(name = "dsa-explorer")]
#[command(version)]
#[command(about = "Browse a DSA solutions repository with an activity heatmap")]
pub struct Cli {
    /// Git repository or directory to explore
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Read the listing from a saved `{"tree": [...]}` payload instead
    #[arg(long = "tree-json", value_name = "FILE")]
    pub tree_json: Option<PathBuf>,

    /// Saved stats payload with an `activity` array (with --tree-json)
    #[arg(long = "stats-json", value_name = "FILE", requires = "tree_json")]
    pub stats_json: Option<PathBuf>,

    /// Scan PATH as a plain directory even if it is a git checkout
    #[arg(long = "dir", conflicts_with = "tree_json")]
    pub dir: bool,

    /// Show hidden files and directories (directory source)
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Path prefix of the solutions folder
    #[arg(long, env = "DSA_PREFIX")]
    pub prefix: Option<String>,

    /// Days covered by the heatmap, ending today
    #[arg(short = 'w', long = "window-days")]
    pub window_days: Option<u32>,

    /// Inactive days tolerated inside a streak
    #[arg(long = "gap-tolerance")]
    pub gap_tolerance: Option<u32>,

    /// Color theme
    #[arg(long, value_enum, env = "DSA_THEME")]
    pub theme: Option<Theme>,

    /// Initial sidebar width in columns
    #[arg(long = "sidebar-width")]
    pub sidebar_width: Option<u16>,

    /// Reload debounce interval in seconds
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<f64>,

    /// TOML config file (default: dsa-explorer.toml in PATH, if present)
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "DSA_EXPLORER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print JSON and exit instead of starting the interface
    #[arg(long, value_enum)]
    pub dump: Option<DumpKind>,

    /// Filter the tree by a case-insensitive name query
    #[arg(short = 's', long)]
    pub search: Option<String>,

    /// Write logs to this file (the interface otherwise logs nowhere)
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Load the config file and apply command-line overrides on top.
    pub fn resolve_config(&self) -> Result<Config> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| self.path.join(DEFAULT_CONFIG_FILE));
        let mut config = Config::load_from(&path)?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(days) = self.window_days {
            config.window_days = days;
        }
        if let Some(gap) = self.gap_tolerance {
            config.gap_tolerance = gap;
        }
        if let Some(theme) = self.theme {
            config.theme = theme;
        }
        if let Some(width) = self.sidebar_width {
            config.sidebar_width = width;
        }
        if let Some(interval) = self.interval {
            config.refresh_interval = interval;
        }
        if self.all {
            config.show_hidden = true;
        }
    }
}
