//! Calendar heatmap layout.
//!
//! Turns a sparse date -> count series into a Monday-start week grid (the
//! GitHub contribution graph shape), places month labels above the grid and
//! buckets each day into an intensity level 0..=4.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default trailing window, in days, ending today.
pub const DEFAULT_WINDOW_DAYS: u32 = 100;

/// Highest intensity level.
pub const MAX_INTENSITY: u8 = 4;

/// Minimum number of week columns between two month labels. A short month
/// name is wider than one column, so adjacent labels would overlap.
const MIN_LABEL_GAP: usize = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Activity count for one calendar day.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub count: u32,
}

/// One square of the heatmap. `day` is the Monday-based weekday (0=Mon..6=Sun).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekCell {
    pub date: NaiveDate,
    pub count: u32,
    pub day: u8,
}

/// Up to seven consecutive cells, closed after a Sunday.
pub type Week = Vec<WeekCell>;

/// The laid-out heatmap grid.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CalendarLayout {
    /// Chronological weeks; only the last one may be shorter than seven days.
    pub weeks: Vec<Week>,
    /// Week index -> short month name.
    pub month_labels: BTreeMap<usize, String>,
    /// Largest count in the grid, never below 1.
    pub max_count: u32,
    /// First day of the requested window; earlier cells only pad the first week.
    pub window_start: NaiveDate,
    /// Length of the requested window in days.
    pub window_days: u32,
}

impl CalendarLayout {
    /// The cell for `day` (0=Mon..6=Sun) in week `week`, if the grid has one.
    pub fn cell(&self, week: usize, day: u8) -> Option<&WeekCell> {
        self.weeks.get(week)?.iter().find(|c| c.day == day)
    }

    pub fn cells(&self) -> impl Iterator<Item = &WeekCell> {
        self.weeks.iter().flatten()
    }

    pub fn day_count(&self) -> usize {
        self.weeks.iter().map(Vec::len).sum()
    }

    pub fn total_count(&self) -> u64 {
        self.cells().map(|c| u64::from(c.count)).sum()
    }

    /// Activity inside the requested window, leaving out the padding days.
    pub fn window_total(&self) -> u64 {
        self.cells()
            .filter(|c| c.date >= self.window_start)
            .map(|c| u64::from(c.count))
            .sum()
    }

    /// Days in the grid with any activity.
    pub fn active_days(&self) -> usize {
        self.cells().filter(|c| c.count > 0).count()
    }

    pub fn intensity_of(&self, cell: &WeekCell) -> u8 {
        intensity(cell.count, self.max_count)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Monday-based weekday index: 0=Mon .. 6=Sun.
pub fn monday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(monday_index(date)))
}

/// Short English month name ("Jan" .. "Dec").
pub fn month_name(date: NaiveDate) -> String {
    date.format("%b").to_string()
}

/// Lay out `window_days` days ending at `today` as a Monday-start week grid.
///
/// The grid begins on the Monday on or before the window start, so it may
/// include up to six days before the nominal window. Days missing from
/// `activity` count as zero; when a date appears more than once the last entry
/// wins. A window of 0 is treated as 1.
pub fn layout_calendar(activity: &[ActivityDay], window_days: u32, today: NaiveDate) -> CalendarLayout {
    let counts: HashMap<NaiveDate, u32> = activity.iter().map(|a| (a.date, a.count)).collect();

    let window_days = window_days.max(1);
    let window_start = today - Days::new(u64::from(window_days - 1));
    let grid_start = week_start(window_start);

    let mut weeks: Vec<Week> = Vec::new();
    let mut current: Week = Vec::with_capacity(7);
    let mut max_count: u32 = 1;

    for date in grid_start.iter_days().take_while(|d| *d <= today) {
        let count = counts.get(&date).copied().unwrap_or(0);
        max_count = max_count.max(count);

        let day = monday_index(date);
        current.push(WeekCell { date, count, day });

        if day == 6 {
            weeks.push(std::mem::replace(&mut current, Vec::with_capacity(7)));
        }
    }

    if !current.is_empty() {
        weeks.push(current);
    }

    let month_labels = month_labels(&weeks);

    CalendarLayout {
        weeks,
        month_labels,
        max_count,
        window_start,
        window_days,
    }
}

/// [`layout_calendar`] anchored at the local current date.
pub fn layout_calendar_today(activity: &[ActivityDay], window_days: u32) -> CalendarLayout {
    layout_calendar(activity, window_days, Local::now().date_naive())
}

/// Label each week that contains the 1st of a month with that month's name.
/// The opening week is labelled with its own month as well, unless the first
/// month boundary is too close for both labels to fit.
fn month_labels(weeks: &[Week]) -> BTreeMap<usize, String> {
    let mut labels = BTreeMap::new();

    for (idx, week) in weeks.iter().enumerate() {
        if let Some(first) = week.iter().find(|c| c.date.day() == 1) {
            labels.insert(idx, month_name(first.date));
        }
    }

    if let Some(opening) = weeks.first().and_then(|w| w.first()) {
        let first_boundary = labels.keys().next().copied();
        if first_boundary.map_or(true, |idx| idx >= MIN_LABEL_GAP) {
            labels.insert(0, month_name(opening.date));
        }
    }

    labels
}

// ---------------------------------------------------------------------------
// Intensity
// ---------------------------------------------------------------------------

/// Bucket `count` relative to `max_count` into 0..=4.
///
/// Zero-count days are always 0; otherwise the ratio falls into
/// `<= 0.25 -> 1`, `<= 0.5 -> 2`, `<= 0.75 -> 3`, else 4.
pub fn intensity(count: u32, max_count: u32) -> u8 {
    if count == 0 || max_count == 0 {
        return 0;
    }

    let ratio = f64::from(count) / f64::from(max_count);
    if ratio <= 0.25 {
        1
    } else if ratio <= 0.5 {
        2
    } else if ratio <= 0.75 {
        3
    } else {
        MAX_INTENSITY
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
