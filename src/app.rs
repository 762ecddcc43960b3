use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, info, warn};

use crate::calendar::{layout_calendar, CalendarLayout};
use crate::config::Config;
use crate::metadata::FileDetail;
use crate::renderer::{self, RenderData};
use crate::source::{file_detail, RepoSource, Snapshot};
use crate::state::ViewState;
use crate::statistics::Dashboard;
use crate::tree::{filter_tree, visible_rows, ExpansionState, TreeNode, VisibleRow};
use crate::watcher::{SourceWatcher, WatchEvent};

/// Columns the sidebar grows or shrinks per `[` / `]`.
const RESIZE_STEP: i32 = 2;

/// Decides when watcher events turn into reloads. A change is never
/// dropped: one that lands within `interval` of the previous reload stays
/// pending until the interval has passed.
#[derive(Debug)]
struct ReloadSchedule {
    interval: Duration,
    last_reload: Option<Instant>,
    pending: bool,
}

impl ReloadSchedule {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_reload: None,
            pending: false,
        }
    }

    fn mark_changed(&mut self) {
        self.pending = true;
    }

    /// Whether to reload at `now`. A `true` answer consumes the pending change.
    fn take_due(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        if let Some(last) = self.last_reload {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.pending = false;
        self.last_reload = Some(now);
        true
    }
}

/// Main application state and run loop.
pub struct App {
    source: Box<dyn RepoSource>,
    config: Config,
    snapshot: Snapshot,
    dashboard: Dashboard,
    calendar: CalendarLayout,
    pub view: ViewState,
    /// The tree after the search filter; equal to the full tree without one.
    filtered: Vec<TreeNode>,
    rows: Vec<VisibleRow>,
    detail: Option<FileDetail>,
    detail_path: Option<String>,
    last_error: Option<String>,
    running: bool,
    /// Sidebar rows that fit on screen, as reported by the last draw.
    tree_height: u16,
}

impl App {
    /// Load the source once and build the initial view.
    pub fn new(source: Box<dyn RepoSource>, config: Config, search: Option<String>) -> Result<Self> {
        let snapshot = Snapshot::load(source.as_ref(), &config.prefix)
            .with_context(|| format!("Failed to load {}", source.describe()))?;

        let mut view = ViewState::new(config.theme, config.sidebar_width);
        view.expansion = ExpansionState::with_top_level(&snapshot.tree);
        if let Some(query) = search {
            view.search_query = query;
        }

        let mut app = Self {
            source,
            config,
            snapshot,
            dashboard: Dashboard::default(),
            calendar: CalendarLayout::default(),
            view,
            filtered: Vec::new(),
            rows: Vec::new(),
            detail: None,
            detail_path: None,
            last_error: None,
            running: true,
            tree_height: 0,
        };
        app.recompute();
        app.refresh_rows();
        Ok(app)
    }

    pub fn rows(&self) -> &[VisibleRow] {
        &self.rows
    }

    pub fn selected_row(&self) -> Option<&VisibleRow> {
        self.rows.get(self.view.selected)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ------------------------------------------------------------------
    // Derived data
    // ------------------------------------------------------------------

    /// Rebuild the dashboard and heatmap from the current snapshot.
    fn recompute(&mut self) {
        let today = Local::now().date_naive();
        self.dashboard = Dashboard::compute(
            &self.snapshot.items,
            &self.snapshot.activity,
            self.snapshot.difficulty,
            &self.snapshot.changes,
            &self.config.stats_options(),
            today,
        );
        self.calendar = layout_calendar(&self.snapshot.activity, self.config.window_days, today);
    }

    /// Re-filter the tree and flatten it into sidebar rows.
    fn refresh_rows(&mut self) {
        self.filtered = filter_tree(&self.snapshot.tree, &self.view.search_query);
        let expansion = self
            .view
            .expansion
            .effective(&self.filtered, &self.view.search_query);
        self.rows = visible_rows(&self.filtered, &expansion);
        self.view.clamp_selection(self.rows.len());
        self.view
            .ensure_visible(usize::from(self.tree_height).max(1));
        self.load_detail();
    }

    /// Load the detail pane for the selected file, once per selection.
    fn load_detail(&mut self) {
        let Some(row) = self.selected_row() else {
            self.detail = None;
            self.detail_path = None;
            return;
        };
        if row.kind.is_folder() {
            self.detail = None;
            self.detail_path = None;
            return;
        }
        if self.detail_path.as_deref() == Some(row.path.as_str()) {
            return;
        }

        let path = row.path.clone();
        match file_detail(self.source.as_ref(), &path) {
            Ok(detail) => self.detail = detail,
            Err(e) => {
                warn!(path = %path, error = %e, "failed to read file");
                self.detail = None;
                self.last_error = Some(e.to_string());
            }
        }
        self.detail_path = Some(path);
    }

    /// Reload the source. On failure the previous snapshot stays on screen.
    pub fn reload(&mut self) {
        match Snapshot::load(self.source.as_ref(), &self.config.prefix) {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.last_error = None;
                self.detail_path = None;
                self.recompute();
                self.refresh_rows();
            }
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.last_error = Some(e.to_string());
            }
        }
    }

    // ------------------------------------------------------------------
    // Key handling
    // ------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits, regardless of search state.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }

        if self.view.search_active {
            self.handle_search_key(key);
        } else {
            self.handle_normal_key(key);
        }
    }

    /// Search input mode: typing into the search bar.
    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.view.clear_search(),
            KeyCode::Enter => self.view.search_active = false,
            KeyCode::Backspace => {
                self.view.search_query.pop();
                self.view.selected = 0;
            }
            KeyCode::Char(c) => {
                self.view.search_query.push(c);
                self.view.selected = 0;
            }
            _ => return,
        }
        self.view.scroll_offset = 0;
        self.refresh_rows();
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let count = self.rows.len();
        let half_page = (usize::from(self.tree_height) / 2).max(1) as isize;

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.running = false;
                return;
            }
            KeyCode::Char('/') => {
                self.view.search_active = true;
                return;
            }
            KeyCode::Esc if self.view.is_filtering() => self.view.clear_search(),
            KeyCode::Char('j') | KeyCode::Down => self.view.move_selection(1, count),
            KeyCode::Char('k') | KeyCode::Up => self.view.move_selection(-1, count),
            KeyCode::PageDown => self.view.move_selection(half_page, count),
            KeyCode::PageUp => self.view.move_selection(-half_page, count),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.view.move_selection(half_page, count)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.view.move_selection(-half_page, count)
            }
            KeyCode::Char('g') | KeyCode::Home => self.view.selected = 0,
            KeyCode::Char('G') | KeyCode::End => self.view.select_last(count),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('l') | KeyCode::Right => self.expand_selected(),
            KeyCode::Char('h') | KeyCode::Left => self.collapse_selected(),
            KeyCode::Char('c') => {
                self.view.expansion.collapse_all();
                self.view.selected = 0;
            }
            KeyCode::Char('t') => self.view.toggle_theme(),
            KeyCode::Char('[') => self.view.resize_sidebar(-RESIZE_STEP),
            KeyCode::Char(']') => self.view.resize_sidebar(RESIZE_STEP),
            KeyCode::Char('r') => {
                info!("manual reload");
                self.reload();
                return;
            }
            _ => return,
        }
        self.refresh_rows();
    }

    /// Selected folder path, unless a search is showing every folder open.
    fn selected_folder(&self) -> Option<String> {
        if self.view.is_filtering() {
            return None;
        }
        self.selected_row()
            .filter(|r| r.kind.is_folder())
            .map(|r| r.path.clone())
    }

    fn toggle_selected(&mut self) {
        if let Some(path) = self.selected_folder() {
            let expanded = self.view.expansion.toggle(&path);
            debug!(path = %path, expanded, "toggled folder");
        }
    }

    fn expand_selected(&mut self) {
        if let Some(path) = self.selected_folder() {
            if !self.view.expansion.is_expanded(&path) {
                self.view.expansion.toggle(&path);
            }
        }
    }

    /// Collapse the selected folder, or jump to the parent row.
    fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if row.kind.is_folder() && row.expanded && !self.view.is_filtering() {
            let path = row.path.clone();
            self.view.expansion.toggle(&path);
            return;
        }
        if let Some((parent, _)) = row.path.rsplit_once('/') {
            if let Some(index) = self.rows.iter().position(|r| r.path == parent) {
                self.view.selected = index;
            }
        }
    }

    // ------------------------------------------------------------------
    // Main loop
    // ------------------------------------------------------------------

    /// Run the main TUI event loop.
    pub fn run(&mut self) -> Result<()> {
        // 1. Watch the source for changes.
        let debounce = Duration::from_secs_f64(self.config.refresh_interval.max(0.05));
        let (_watcher, watch_rx) = SourceWatcher::new(&self.source.watch_paths(), debounce)?;

        // 2. Set up the terminal.
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(out);
        let mut terminal = Terminal::new(backend)?;

        // 3. Main loop.
        let mut schedule = ReloadSchedule::new(debounce);
        let result: Result<()> = loop {
            let data = RenderData {
                now: Utc::now(),
                source: &self.source.describe(),
                rows: &self.rows,
                calendar: &self.calendar,
                dashboard: &self.dashboard,
                detail: self.detail.as_ref(),
                last_error: self.last_error.as_deref(),
            };
            let mut tree_height = self.tree_height;
            if let Err(e) = terminal.draw(|frame| {
                tree_height = renderer::render_ui(frame, &data, &self.view);
            }) {
                break Err(e.into());
            }
            if tree_height != self.tree_height {
                self.tree_height = tree_height;
                self.view.ensure_visible(usize::from(tree_height));
            }

            // --- Handle keyboard events ---
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    Ok(_) => {}
                    Err(e) => break Err(e.into()),
                },
                Ok(false) => {}
                Err(e) => break Err(e.into()),
            }
            if !self.running {
                break Ok(());
            }

            // --- Check for source changes (non-blocking) ---
            while let Ok(event) = watch_rx.try_recv() {
                match event {
                    WatchEvent::Changed => schedule.mark_changed(),
                    WatchEvent::Error(e) => {
                        warn!(error = %e, "watcher error");
                        self.last_error = Some(e);
                    }
                }
            }
            if schedule.take_due(Instant::now()) {
                debug!("source changed, reloading");
                self.reload();
            }
        };

        // 4. Cleanup: restore the terminal.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::JsonSource;
    use crate::state::Theme;
    use crate::tree::EntryKind;
    use std::fs;

    const TREE_JSON: &str = r#"{"tree": [
        {"path": "solutions", "type": "tree"},
        {"path": "solutions/arrays", "type": "tree"},
        {"path": "solutions/arrays/two_sum.py", "type": "blob", "size": 300},
        {"path": "solutions/graphs", "type": "tree"},
        {"path": "solutions/graphs/bfs.cpp", "type": "blob", "size": 900},
        {"path": "README.md", "type": "blob", "size": 20}
    ]}"#;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(search: Option<String>) -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let tree_path = dir.path().join("tree.json");
        fs::write(&tree_path, TREE_JSON).unwrap();
        let source = JsonSource::new(tree_path, None);
        let app = App::new(Box::new(source), Config::default(), search).unwrap();
        (dir, app)
    }

    fn paths(app: &App) -> Vec<&str> {
        app.rows().iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_initial_rows_expand_top_level() {
        let (_dir, app) = app_with(None);
        assert_eq!(
            paths(&app),
            vec!["solutions", "solutions/arrays", "solutions/graphs", "README.md"]
        );
        assert_eq!(app.dashboard.total_problems, 2);
        assert_eq!(app.calendar.max_count, 1);
    }

    #[test]
    fn test_navigation_and_toggle() {
        let (_dir, mut app) = app_with(None);

        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_row().unwrap().path, "solutions/arrays");

        app.handle_key(key(KeyCode::Enter));
        assert!(paths(&app).contains(&"solutions/arrays/two_sum.py"));

        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_row().unwrap().kind, EntryKind::File);

        // h on a file jumps to its folder, then collapses it.
        app.handle_key(key(KeyCode::Char('h')));
        assert_eq!(app.selected_row().unwrap().path, "solutions/arrays");
        app.handle_key(key(KeyCode::Char('h')));
        assert!(!paths(&app).contains(&"solutions/arrays/two_sum.py"));

        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(app.selected_row().unwrap().path, "README.md");
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.view.selected, 0);

        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(paths(&app), vec!["solutions", "README.md"]);
    }

    #[test]
    fn test_search_filters_and_expands() {
        let (_dir, mut app) = app_with(None);

        app.handle_key(key(KeyCode::Char('/')));
        for c in "BFS".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(
            paths(&app),
            vec!["solutions", "solutions/graphs", "solutions/graphs/bfs.cpp"]
        );

        // Keys type into the query while the bar is active.
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.is_running());
        assert!(app.rows().is_empty());
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.view.search_active);
        assert_eq!(app.rows().len(), 3);

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.view.is_filtering());
        assert_eq!(app.rows().len(), 4);
    }

    #[test]
    fn test_initial_search_and_view_keys() {
        let (_dir, mut app) = app_with(Some("two".to_string()));
        assert_eq!(app.rows().last().unwrap().path, "solutions/arrays/two_sum.py");

        let width = app.view.sidebar_width;
        app.handle_key(key(KeyCode::Char(']')));
        assert_eq!(app.view.sidebar_width, width + 2);
        app.handle_key(key(KeyCode::Char('t')));
        assert_eq!(app.view.theme, Theme::Light);
    }

    #[test]
    fn test_file_selection_without_contents() {
        let (_dir, mut app) = app_with(None);
        app.handle_key(key(KeyCode::Char('G')));
        assert!(app.detail.is_none());
        assert_eq!(app.detail_path.as_deref(), Some("README.md"));
        assert!(app.last_error.is_none());
    }

    #[test]
    fn test_reload_failure_keeps_snapshot() {
        let (dir, mut app) = app_with(None);
        fs::write(dir.path().join("tree.json"), "not json").unwrap();
        app.reload();
        assert!(app.last_error.is_some());
        assert_eq!(app.rows().len(), 4);

        fs::write(dir.path().join("tree.json"), TREE_JSON).unwrap();
        app.reload();
        assert!(app.last_error.is_none());
    }

    #[test]
    fn test_quit_keys() {
        let (_dir, mut app) = app_with(None);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.is_running());

        let (_dir, mut app) = app_with(None);
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.is_running());
    }

    #[test]
    fn test_reload_schedule_keeps_late_changes() {
        let interval = Duration::from_millis(500);
        let mut schedule = ReloadSchedule::new(interval);
        let start = Instant::now();

        assert!(!schedule.take_due(start));

        // First change reloads at once, even right after startup.
        schedule.mark_changed();
        assert!(schedule.take_due(start));
        assert!(!schedule.take_due(start + interval));

        // A change inside the interval waits instead of being dropped.
        schedule.mark_changed();
        assert!(!schedule.take_due(start + Duration::from_millis(450)));
        assert!(schedule.take_due(start + interval));
        assert!(!schedule.take_due(start + interval * 3));
    }

    #[test]
    fn test_reload_schedule_collapses_bursts() {
        let interval = Duration::from_millis(100);
        let mut schedule = ReloadSchedule::new(interval);
        let start = Instant::now();

        schedule.mark_changed();
        schedule.mark_changed();
        schedule.mark_changed();
        assert!(schedule.take_due(start));
        assert!(!schedule.take_due(start + interval * 2));
    }
}
