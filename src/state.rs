use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::ExpansionState;

/// Narrowest and widest the sidebar may be resized to.
pub const MIN_SIDEBAR_WIDTH: u16 = 20;
pub const MAX_SIDEBAR_WIDTH: u16 = 100;

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Everything the interactive view remembers between frames. Owned by the
/// app loop and handed to the renderer by reference.
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub theme: Theme,
    pub sidebar_width: u16,
    /// Whether the search input bar is actively accepting keystrokes.
    pub search_active: bool,
    /// The current search/filter query string.
    pub search_query: String,
    pub expansion: ExpansionState,
    /// Index into the visible sidebar rows.
    pub selected: usize,
    pub scroll_offset: usize,
}

impl ViewState {
    pub fn new(theme: Theme, sidebar_width: u16) -> Self {
        Self {
            theme,
            sidebar_width: sidebar_width.clamp(MIN_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH),
            ..Self::default()
        }
    }

    pub fn is_filtering(&self) -> bool {
        !self.search_query.trim().is_empty()
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    pub fn resize_sidebar(&mut self, delta: i32) {
        let width = (i32::from(self.sidebar_width) + delta)
            .clamp(i32::from(MIN_SIDEBAR_WIDTH), i32::from(MAX_SIDEBAR_WIDTH));
        self.sidebar_width = width as u16;
    }

    /// Move the selection by `delta` rows, staying inside `row_count`.
    pub fn move_selection(&mut self, delta: isize, row_count: usize) {
        if row_count == 0 {
            self.selected = 0;
            return;
        }
        let max = row_count - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(max);
    }

    pub fn select_last(&mut self, row_count: usize) {
        self.selected = row_count.saturating_sub(1);
    }

    /// Clamp the selection after the row list shrank.
    pub fn clamp_selection(&mut self, row_count: usize) {
        self.selected = self.selected.min(row_count.saturating_sub(1));
    }

    /// Adjust the scroll offset so the selected row is inside a viewport of
    /// `height` rows.
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    pub fn clear_search(&mut self) {
        self.search_active = false;
        self.search_query.clear();
        self.selected = 0;
        self.scroll_offset = 0;
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Return an emoji representing the file type based on its extension.
pub fn get_file_emoji(filename: &str, is_dir: bool, expanded: bool) -> &'static str {
    if is_dir {
        return if expanded { "\u{1F4C2}" } else { "\u{1F4C1}" }; // 📂 / 📁
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "py" => "\u{1F40D}",                              // 🐍
        "js" | "ts" => "\u{1F4DC}",                       // 📜
        "rs" => "\u{1F980}",                              // 🦀
        "cpp" | "c" | "h" | "hpp" => "\u{2699}\u{FE0F} ", // ⚙️
        "java" | "kt" => "\u{2615}",                      // ☕
        "go" => "\u{1F439}",                              // 🐹
        "md" => "\u{1F4DD}",                              // 📝
        "json" | "yaml" | "yml" | "toml" => "\u{1F4CB}",  // 📋
        _ => "\u{1F4C4}",                                 // 📄
    }
}

/// Format a byte count as a human-readable string (e.g. "1.5 KB", "12 MB").
pub fn format_size(size_bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = size_bytes as f64;
    for &unit in UNITS {
        if size < 1024.0 {
            return if size < 10.0 && unit != "B" {
                format!("{:.1} {}", size, unit)
            } else {
                format!("{:.0} {}", size, unit)
            };
        }
        size /= 1024.0;
    }

    format!("{:.0} TB", size * 1024.0)
}

/// Return a color name appropriate for the given file size.
pub fn get_size_color(size_bytes: u64) -> &'static str {
    const KB: u64 = 1024;

    if size_bytes < KB {
        "dim"
    } else if size_bytes < 10 * KB {
        "cyan"
    } else if size_bytes < 100 * KB {
        "yellow"
    } else {
        "red"
    }
}

/// "1 problem" / "3 problems".
pub fn pluralize(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Coarse age of `then` relative to `now`: `just now`, `5m ago`, `3h ago`,
/// `12d ago`, `2mo ago`. Times in the future read as `just now`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = hours / 24;
    if days < 30 {
        format!("{}d ago", days)
    } else {
        format!("{}mo ago", days / 30)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_serialization() {
        assert_eq!(serde_json::to_string(&Theme::Light).unwrap(), "\"light\"");
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::default(), Theme::Dark);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10240), "10 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(1_073_741_824), "1.0 GB");
    }

    #[test]
    fn test_get_size_color() {
        assert_eq!(get_size_color(500), "dim");
        assert_eq!(get_size_color(2048), "cyan");
        assert_eq!(get_size_color(50 * 1024), "yellow");
        assert_eq!(get_size_color(200 * 1024), "red");
    }

    #[test]
    fn test_get_file_emoji() {
        assert_eq!(get_file_emoji("dir", true, false), "\u{1F4C1}");
        assert_eq!(get_file_emoji("dir", true, true), "\u{1F4C2}");
        assert_eq!(get_file_emoji("two_sum.py", false, false), "\u{1F40D}");
        assert_eq!(get_file_emoji("unknown.xyz", false, false), "\u{1F4C4}");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "problem"), "1 problem");
        assert_eq!(pluralize(0, "problem"), "0 problems");
    }

    #[test]
    fn test_time_ago() {
        let now = DateTime::parse_from_rfc3339("2024-11-20T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ago = |secs: i64| time_ago(now - chrono::Duration::seconds(secs), now);

        assert_eq!(ago(-30), "just now");
        assert_eq!(ago(59), "just now");
        assert_eq!(ago(60), "1m ago");
        assert_eq!(ago(3599), "59m ago");
        assert_eq!(ago(3600), "1h ago");
        assert_eq!(ago(86_400 * 2 + 5), "2d ago");
        assert_eq!(ago(86_400 * 29), "29d ago");
        assert_eq!(ago(86_400 * 65), "2mo ago");
    }

    #[test]
    fn test_selection_and_scroll() {
        let mut view = ViewState::new(Theme::Dark, 40);
        view.move_selection(5, 3);
        assert_eq!(view.selected, 2);
        view.move_selection(-10, 3);
        assert_eq!(view.selected, 0);
        view.move_selection(1, 0);
        assert_eq!(view.selected, 0);

        view.select_last(30);
        view.ensure_visible(10);
        assert_eq!(view.scroll_offset, 20);
        view.move_selection(-25, 30);
        view.ensure_visible(10);
        assert_eq!(view.scroll_offset, 4);

        view.clamp_selection(2);
        assert_eq!(view.selected, 1);
    }

    #[test]
    fn test_sidebar_width_bounds() {
        let mut view = ViewState::new(Theme::Light, 5);
        assert_eq!(view.sidebar_width, MIN_SIDEBAR_WIDTH);
        view.resize_sidebar(1000);
        assert_eq!(view.sidebar_width, MAX_SIDEBAR_WIDTH);
        view.resize_sidebar(-4);
        assert_eq!(view.sidebar_width, MAX_SIDEBAR_WIDTH - 4);
    }

    #[test]
    fn test_search_state() {
        let mut view = ViewState::new(Theme::Dark, 40);
        assert!(!view.is_filtering());
        view.search_query.push_str("  ");
        assert!(!view.is_filtering());
        view.search_query.push_str("sum");
        assert!(view.is_filtering());
        view.selected = 4;
        view.clear_search();
        assert!(!view.is_filtering());
        assert_eq!(view.selected, 0);
    }
}
