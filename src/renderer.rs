//! Ratatui-based sidebar tree, activity heatmap and dashboard.
//!
//! This module is purely presentational -- it takes references to application
//! data and renders into a Ratatui `Frame`.  It does **not** own any state.

use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarLayout, MAX_INTENSITY};
use crate::metadata::FileDetail;
use crate::state::{
    format_size, get_file_emoji, get_size_color, pluralize, time_ago, Theme, ViewState,
};
use crate::statistics::Dashboard;
use crate::tree::VisibleRow;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Row labels of the heatmap, Monday first.
const DAY_LABELS: [&str; 7] = ["Mon", "", "Wed", "", "Fri", "", ""];
/// Columns taken by the day labels in front of the grid.
const DAY_LABEL_WIDTH: usize = 4;
/// Columns per week in the grid: the cell plus a gap.
const CELL_WIDTH: usize = 2;
const CELL: &str = "■";
const SIZE_WIDTH: usize = 9;
const TOPIC_LIMIT: usize = 8;
const RECENT_LIMIT: usize = 3;

// ---------------------------------------------------------------------------
// Color mapping
// ---------------------------------------------------------------------------

/// Map a color name (as returned by helpers such as `get_size_color`) to a
/// Ratatui `Color`.
fn color_from_name(name: &str) -> Color {
    match name {
        "dim" => Color::DarkGray,
        "cyan" => Color::Cyan,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "green" => Color::Green,
        "white" => Color::White,
        _ => Color::Reset,
    }
}

/// Heatmap cell color for an intensity level (clamped to 0..=4).
pub fn intensity_color(level: u8, theme: Theme) -> Color {
    let (light, dark) = match level.min(MAX_INTENSITY) {
        0 => ((0xf0, 0xec, 0xe8), (0x2a, 0x25, 0x20)),
        1 => ((0xfd, 0xe6, 0xd0), (0x4a, 0x2f, 0x1a)),
        2 => ((0xfd, 0xba, 0x74), (0x9a, 0x4f, 0x1a)),
        3 => ((0xf9, 0x73, 0x16), (0xd4, 0x69, 0x1a)),
        _ => ((0xc2, 0x41, 0x0c), (0xf9, 0x73, 0x16)),
    };
    let (r, g, b) = match theme {
        Theme::Light => light,
        Theme::Dark => dark,
    };
    Color::Rgb(r, g, b)
}

/// Foreground / background colors of a theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Palette {
    bg: Color,
    fg: Color,
    dim: Color,
    accent: Color,
    border: Color,
    selected_bg: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            bg: Color::Rgb(0xfa, 0xf8, 0xf5),
            fg: Color::Rgb(0x28, 0x25, 0x20),
            dim: Color::Rgb(0x8a, 0x82, 0x78),
            accent: Color::Rgb(0xc2, 0x41, 0x0c),
            border: Color::Rgb(0xd6, 0xd0, 0xc8),
            selected_bg: Color::Rgb(0xfd, 0xe6, 0xd0),
        },
        Theme::Dark => Palette {
            bg: Color::Rgb(0x1a, 0x17, 0x14),
            fg: Color::Rgb(0xe8, 0xe2, 0xda),
            dim: Color::Rgb(0x80, 0x78, 0x6e),
            accent: Color::Rgb(0xf9, 0x73, 0x16),
            border: Color::Rgb(0x3a, 0x34, 0x2e),
            selected_bg: Color::Rgb(0x4a, 0x2f, 0x1a),
        },
    }
}

fn panel(title: &str, p: Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(p.border))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        ))
}

// ---------------------------------------------------------------------------
// Sidebar tree
// ---------------------------------------------------------------------------

/// Box-drawing prefix for a row: one column group per ancestor plus the
/// connector to the row itself.
fn tree_prefix(row: &VisibleRow) -> String {
    let mut prefix = String::new();
    for &more_below in &row.guides {
        prefix.push_str(if more_below { "│   " } else { "    " });
    }
    prefix.push_str(if row.is_last { "└── " } else { "├── " });
    prefix
}

/// Cut `text` so it occupies at most `max` display columns, marking the cut.
fn truncate_to_width(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Build the styled line for one sidebar row, `width` columns wide.
fn tree_row_line(row: &VisibleRow, selected: bool, width: usize, p: Palette) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut used_width: usize = 0;

    // 1. Guides + connector
    let prefix = tree_prefix(row);
    used_width += UnicodeWidthStr::width(prefix.as_str());
    spans.push(Span::styled(prefix, Style::default().fg(p.dim)));

    // 2. Emoji
    let emoji = format!(
        "{} ",
        get_file_emoji(&row.name, row.kind.is_folder(), row.expanded)
    );
    used_width += UnicodeWidthStr::width(emoji.as_str());
    spans.push(Span::raw(emoji));

    // 3. Size column for files
    let size = match (row.kind.is_folder(), row.size) {
        (false, Some(bytes)) => Some((format_size(bytes), get_size_color(bytes))),
        _ => None,
    };
    let size_width = if size.is_some() { SIZE_WIDTH } else { 0 };

    // 4. Name, truncated to what is left
    let name_room = width.saturating_sub(used_width + size_width);
    let name = truncate_to_width(&row.name, name_room);
    used_width += UnicodeWidthStr::width(name.as_str());
    let mut name_style = Style::default().fg(p.fg);
    if row.kind.is_folder() {
        name_style = name_style.add_modifier(Modifier::BOLD);
    }
    spans.push(Span::styled(name, name_style));

    if let Some((text, color)) = size {
        let pad = width.saturating_sub(used_width + size_width);
        spans.push(Span::raw(" ".repeat(pad)));
        spans.push(Span::styled(
            format!("{:>width$}", text, width = size_width),
            Style::default().fg(color_from_name(color)),
        ));
    }

    let line = Line::from(spans);
    if selected {
        line.style(Style::default().bg(p.selected_bg).add_modifier(Modifier::BOLD))
    } else {
        line
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, rows: &[VisibleRow], view: &ViewState, p: Palette) {
    let title = if view.is_filtering() {
        format!("Files ({} shown)", rows.len())
    } else {
        "Files".to_string()
    };
    let block = panel(&title, p);
    let inner = block.inner(area);
    let height = inner.height as usize;
    let width = inner.width as usize;

    let lines: Vec<Line<'static>> = if rows.is_empty() {
        let msg = if view.is_filtering() {
            "No files match"
        } else {
            "Repository is empty"
        };
        vec![Line::from(Span::styled(
            format!(" {}", msg),
            Style::default().fg(p.dim),
        ))]
    } else {
        rows.iter()
            .enumerate()
            .skip(view.scroll_offset)
            .take(height)
            .map(|(i, row)| tree_row_line(row, i == view.selected, width, p))
            .collect()
    };

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// The month label row: each label starts at its week's column.
fn month_label_row(layout: &CalendarLayout) -> String {
    let width = DAY_LABEL_WIDTH + layout.weeks.len() * CELL_WIDTH;
    let mut row: Vec<char> = vec![' '; width];
    for (&week, label) in &layout.month_labels {
        let start = DAY_LABEL_WIDTH + week * CELL_WIDTH;
        for (offset, ch) in label.chars().enumerate() {
            if let Some(slot) = row.get_mut(start + offset) {
                *slot = ch;
            }
        }
    }
    row.into_iter().collect::<String>().trim_end().to_string()
}

/// Month row, seven weekday rows, then the Less..More legend.
fn heatmap_lines(layout: &CalendarLayout, theme: Theme) -> Vec<Line<'static>> {
    let p = palette(theme);
    let label_style = Style::default().fg(p.dim);
    let mut lines = Vec::with_capacity(9);

    lines.push(Line::from(Span::styled(month_label_row(layout), label_style)));

    for (day, label) in DAY_LABELS.iter().enumerate() {
        let mut spans = vec![Span::styled(
            format!("{:<width$}", label, width = DAY_LABEL_WIDTH),
            label_style,
        )];
        for week in 0..layout.weeks.len() {
            match layout.cell(week, day as u8) {
                Some(cell) => {
                    let level = layout.intensity_of(cell);
                    spans.push(Span::styled(
                        CELL,
                        Style::default().fg(intensity_color(level, theme)),
                    ));
                    spans.push(Span::raw(" "));
                }
                // Days after today in the trailing week.
                None => spans.push(Span::raw(" ".repeat(CELL_WIDTH))),
            }
        }
        lines.push(Line::from(spans));
    }

    let mut legend = vec![Span::styled(
        format!("{:<width$}Less ", "", width = DAY_LABEL_WIDTH),
        label_style,
    )];
    for level in 0..=MAX_INTENSITY {
        legend.push(Span::styled(
            CELL,
            Style::default().fg(intensity_color(level, theme)),
        ));
        legend.push(Span::raw(" "));
    }
    legend.push(Span::styled("More", label_style));
    lines.push(Line::from(legend));

    lines
}

fn heatmap_title(layout: &CalendarLayout) -> String {
    format!(
        "Activity: {} in the last {} days",
        pluralize(layout.window_total(), "problem"),
        layout.window_days
    )
}

fn render_heatmap(frame: &mut Frame, area: Rect, layout: &CalendarLayout, theme: Theme) {
    let p = palette(theme);
    let paragraph = Paragraph::new(Text::from(heatmap_lines(layout, theme)))
        .block(panel(&heatmap_title(layout), p));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Map values to a sparkline string using Unicode block characters, one
/// character per value, scaled against the largest value.
fn build_sparkline(values: &[u32]) -> String {
    const BLOCKS: &[char] = &[' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|&v| {
            let level = if max == 0 {
                0
            } else {
                ((v as usize * 8) / max as usize).min(8)
            };
            // Keep non-zero weeks visible.
            if v > 0 && level == 0 {
                BLOCKS[1]
            } else {
                BLOCKS[level]
            }
        })
        .collect()
}

fn metric_card(frame: &mut Frame, area: Rect, label: &str, value: String, p: Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(p.border));
    let text = Text::from(vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(label.to_string(), Style::default().fg(p.dim))),
    ]);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(ratatui::layout::Alignment::Center)
            .block(block),
        area,
    );
}

fn render_metric_cards(frame: &mut Frame, area: Rect, dashboard: &Dashboard, p: Palette) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    metric_card(frame, cards[0], "Problems", dashboard.total_problems.to_string(), p);
    metric_card(frame, cards[1], "Today", dashboard.today.to_string(), p);
    metric_card(frame, cards[2], "This week", dashboard.this_week.to_string(), p);
    metric_card(
        frame,
        cards[3],
        "Streak",
        pluralize(u64::from(dashboard.current_streak), "day"),
        p,
    );
}

/// Difficulty, weekly sparkline, languages, topics and recent files as text
/// lines. Ages are measured against `now`.
fn dashboard_lines(dashboard: &Dashboard, now: DateTime<Utc>, p: Palette) -> Vec<Line<'static>> {
    let label = Style::default().fg(p.dim);
    let mut lines = Vec::new();

    if let Some(d) = dashboard.difficulty {
        lines.push(Line::from(vec![
            Span::styled(" Easy ", label),
            Span::styled(d.easy.to_string(), Style::default().fg(Color::Green)),
            Span::styled("  Medium ", label),
            Span::styled(d.medium.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("  Hard ", label),
            Span::styled(d.hard.to_string(), Style::default().fg(Color::Red)),
        ]));
    }

    let values: Vec<u32> = dashboard.weekly.iter().map(|w| w.total).collect();
    let mut weekly = vec![
        Span::styled(" Weekly: ", label),
        Span::styled(build_sparkline(&values), Style::default().fg(p.accent)),
    ];
    if let (Some(first), Some(last)) = (dashboard.weekly.first(), dashboard.weekly.last()) {
        weekly.push(Span::styled(
            format!("  {} → {}", first.label, last.label),
            label,
        ));
    }
    lines.push(Line::from(weekly));

    let mut langs = vec![Span::styled(" Languages: ", label)];
    if dashboard.languages.is_empty() {
        langs.push(Span::styled("(none)", label));
    } else {
        for (i, (lang, count)) in dashboard.languages.iter().enumerate() {
            if i > 0 {
                langs.push(Span::raw(" "));
            }
            langs.push(Span::styled(
                format!("{}({})", lang, count),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    lines.push(Line::from(langs));

    lines.push(Line::from(Span::styled(" Topics:", label)));
    let widest = dashboard
        .topics
        .iter()
        .take(TOPIC_LIMIT)
        .map(|t| UnicodeWidthStr::width(t.name.as_str()))
        .max()
        .unwrap_or(0);
    let top = dashboard.topics.first().map(|t| t.count).unwrap_or(0);
    for topic in dashboard.topics.iter().take(TOPIC_LIMIT) {
        let bar_len = if top == 0 { 0 } else { (topic.count * 20).div_ceil(top) };
        let mut spans = vec![
            Span::styled(
                format!("   {:<width$} ", topic.name, width = widest),
                Style::default().fg(p.fg),
            ),
            Span::styled(format!("{:>3} ", topic.count), label),
            Span::styled(format!("{:<20}", "▇".repeat(bar_len)), Style::default().fg(p.accent)),
        ];
        if let Some(at) = topic.last_updated {
            spans.push(Span::styled(format!(" {}", time_ago(at, now)), label));
        }
        lines.push(Line::from(spans));
    }
    if dashboard.topics.len() > TOPIC_LIMIT {
        lines.push(Line::from(Span::styled(
            format!("   ... and {} more", dashboard.topics.len() - TOPIC_LIMIT),
            label,
        )));
    }

    if !dashboard.recent.is_empty() {
        lines.push(Line::from(Span::styled(" Recent:", label)));
        for file in dashboard.recent.iter().take(RECENT_LIMIT) {
            let mut spans = vec![Span::styled(
                format!("   {}", file.name),
                Style::default().fg(p.fg).add_modifier(Modifier::BOLD),
            )];
            if let Some(topic) = &file.topic {
                spans.push(Span::styled(format!("  {}", topic), label));
            }
            spans.push(Span::styled(
                format!("  {}", time_ago(file.changed_at, now)),
                Style::default().fg(p.accent),
            ));
            lines.push(Line::from(spans));
        }
    }

    lines
}

// ---------------------------------------------------------------------------
// Detail pane
// ---------------------------------------------------------------------------

fn detail_lines(row: Option<&VisibleRow>, detail: Option<&FileDetail>, p: Palette) -> Vec<Line<'static>> {
    let label = Style::default().fg(p.dim);
    let value = Style::default().fg(p.fg);
    let field = |name: &str, text: String| {
        Line::from(vec![
            Span::styled(format!(" {:<11}", name), label),
            Span::styled(text, value),
        ])
    };

    let Some(row) = row else {
        return vec![Line::from(Span::styled(" Nothing selected", label))];
    };

    if row.kind.is_folder() {
        return vec![
            Line::from(Span::styled(
                format!(" {}/", row.name),
                Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
            )),
            field("Path", row.path.clone()),
        ];
    }

    let Some(detail) = detail else {
        let mut lines = vec![
            Line::from(Span::styled(
                format!(" {}", row.name),
                Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
            )),
            field("Path", row.path.clone()),
        ];
        if let Some(size) = row.size {
            lines.push(field("Size", format_size(size)));
        }
        lines.push(Line::from(Span::styled(
            " Contents are not available from this source",
            label,
        )));
        return lines;
    };

    let meta = &detail.metadata;
    let difficulty_color = match meta.difficulty.to_lowercase().as_str() {
        "easy" => Color::Green,
        "hard" => Color::Red,
        _ => Color::Yellow,
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", detail.name),
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        )),
        field("Path", detail.path.clone()),
        field("Language", detail.language.clone()),
        field(
            "Size",
            format!(
                "{}, {}",
                format_size(detail.size as u64),
                pluralize(detail.lines as u64, "line")
            ),
        ),
        Line::from(vec![
            Span::styled(format!(" {:<11}", "Difficulty"), label),
            Span::styled(meta.difficulty.clone(), Style::default().fg(difficulty_color)),
        ]),
    ];
    if !meta.tags.is_empty() {
        lines.push(field("Tags", meta.tags.join(", ")));
    }
    if let Some(time) = &meta.time_complexity {
        lines.push(field("Time", time.clone()));
    }
    if let Some(space) = &meta.space_complexity {
        lines.push(field("Space", space.clone()));
    }
    if let Some(link) = &meta.leetcode_link {
        lines.push(field("LeetCode", link.clone()));
    }
    lines
}

// ---------------------------------------------------------------------------
// Header and legend
// ---------------------------------------------------------------------------

/// Title, source, theme and the most recently changed problem.
fn header_line(data: &RenderData, theme: Theme, p: Palette) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            " DSA Explorer ",
            Style::default()
                .fg(p.bg)
                .bg(p.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", data.source), Style::default().fg(p.fg)),
        Span::styled(format!("  [{}]", theme.as_str()), Style::default().fg(p.dim)),
    ];
    if let Some(latest) = data.dashboard.latest() {
        spans.push(Span::styled("  latest: ", Style::default().fg(p.dim)));
        spans.push(Span::styled(latest.name.clone(), Style::default().fg(p.accent)));
        spans.push(Span::styled(
            format!(" ({})", time_ago(latest.changed_at, data.now)),
            Style::default().fg(p.dim),
        ));
    }
    Line::from(spans)
}

fn render_header(frame: &mut Frame, area: Rect, data: &RenderData, theme: Theme, p: Palette) {
    frame.render_widget(Paragraph::new(header_line(data, theme, p)), area);
}

/// Render the key-binding bar at the bottom of the screen.
/// Shows the search input while search is active, the filter while one is
/// applied, or the key legend otherwise.
fn render_legend(frame: &mut Frame, area: Rect, view: &ViewState, last_error: Option<&str>, p: Palette) {
    let mut spans: Vec<Span<'static>> = if view.search_active {
        vec![
            Span::styled(
                " / ",
                Style::default()
                    .fg(p.bg)
                    .bg(p.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {}", view.search_query), Style::default().fg(p.fg)),
            Span::styled(
                "_",
                Style::default().fg(p.fg).add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled("  (Enter to apply, Esc to cancel)", Style::default().fg(p.dim)),
        ]
    } else if view.is_filtering() {
        vec![
            Span::styled(" Filter: ", Style::default().fg(p.dim)),
            Span::styled(
                format!("\"{}\"", view.search_query),
                Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  (Esc to clear, / to edit)  |  j/k move",
                Style::default().fg(p.dim),
            ),
        ]
    } else {
        vec![Span::styled(
            " q quit  / search  j/k move  enter toggle  g/G top/bottom  [ ] resize  t theme  r reload",
            Style::default().fg(p.dim),
        )]
    };

    if let Some(err) = last_error {
        spans.push(Span::styled(
            format!("  [!] {}", err),
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ---------------------------------------------------------------------------
// Main render entry point
// ---------------------------------------------------------------------------

/// Everything the renderer draws, borrowed from the app for one frame.
pub struct RenderData<'a> {
    /// Reference point for "5m ago" style ages.
    pub now: DateTime<Utc>,
    pub source: &'a str,
    pub rows: &'a [VisibleRow],
    pub calendar: &'a CalendarLayout,
    pub dashboard: &'a Dashboard,
    pub detail: Option<&'a FileDetail>,
    pub last_error: Option<&'a str>,
}

/// Height in rows of the heatmap panel: borders, month row, seven days, legend.
const HEATMAP_HEIGHT: u16 = 11;
const CARD_HEIGHT: u16 = 4;

/// Top-level render function.  Returns the number of tree rows that fit in
/// the sidebar so the caller can keep the selection in view.
pub fn render_ui(frame: &mut Frame, data: &RenderData, view: &ViewState) -> u16 {
    let p = palette(view.theme);
    let size = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(p.bg).fg(p.fg)),
        size,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // body
            Constraint::Length(1), // legend
        ])
        .split(size);

    render_header(frame, chunks[0], data, view.theme, p);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(view.sidebar_width), Constraint::Min(1)])
        .split(chunks[1]);

    render_sidebar(frame, body[0], data.rows, view, p);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(CARD_HEIGHT),
            Constraint::Length(HEATMAP_HEIGHT),
            Constraint::Min(1),
        ])
        .split(body[1]);

    render_metric_cards(frame, main[0], data.dashboard, p);
    render_heatmap(frame, main[1], data.calendar, view.theme);

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main[2]);

    frame.render_widget(
        Paragraph::new(Text::from(dashboard_lines(data.dashboard, data.now, p))).block(panel("Progress", p)),
        lower[0],
    );
    frame.render_widget(
        Paragraph::new(Text::from(detail_lines(
            data.rows.get(view.selected),
            data.detail,
            p,
        )))
        .wrap(Wrap { trim: false })
        .block(panel("Details", p)),
        lower[1],
    );

    render_legend(frame, chunks[2], view, data.last_error, p);

    body[0].height.saturating_sub(2)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
