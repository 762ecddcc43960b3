use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar::{week_start, ActivityDay};
use crate::metadata::{display_name, language_for, DifficultyBreakdown};
use crate::source::FileChange;
use crate::tree::{EntryKind, TreeItem};

/// Problems solved per topic folder.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TopicCount {
    pub name: String,
    pub count: usize,
    /// File name of the most recently changed problem in the topic.
    pub last_file: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// A recently changed problem file.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RecentFile {
    pub path: String,
    /// Title derived from the file name, e.g. `Two Sum`.
    pub name: String,
    pub topic: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Total activity for one Monday-start week.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WeekTotal {
    pub week_start: NaiveDate,
    pub label: String,
    pub total: u32,
}

/// Tunables for [`Dashboard::compute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsOptions {
    /// Path prefix of the solutions folder, e.g. `solutions/`.
    pub prefix: String,
    /// Inactive days tolerated inside a streak.
    pub gap_tolerance: u32,
    /// How far back the streak walk may go.
    pub lookback_days: u32,
    /// Number of weeks in the weekly performance series.
    pub weekly_weeks: usize,
    pub top_languages: usize,
    /// Length of the recent files list.
    pub recent_limit: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            prefix: "solutions/".to_string(),
            gap_tolerance: 3,
            lookback_days: 180,
            weekly_weeks: 8,
            top_languages: 5,
            recent_limit: 10,
        }
    }
}

/// Aggregated numbers shown next to the heatmap.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Dashboard {
    pub total_problems: usize,
    pub today: u32,
    pub this_week: u32,
    pub current_streak: u32,
    pub difficulty: Option<DifficultyBreakdown>,
    pub topics: Vec<TopicCount>,
    /// Top languages by file count, e.g. [("Python", 10), ("C++", 3)].
    pub languages: Vec<(String, usize)>,
    pub weekly: Vec<WeekTotal>,
    /// Most recently changed problems, newest first.
    pub recent: Vec<RecentFile>,
}

impl Dashboard {
    /// The most recently changed problem, if any change is known.
    pub fn latest(&self) -> Option<&RecentFile> {
        self.recent.first()
    }

    pub fn compute(
        items: &[TreeItem],
        activity: &[ActivityDay],
        difficulty: Option<DifficultyBreakdown>,
        changes: &[FileChange],
        options: &StatsOptions,
        today: NaiveDate,
    ) -> Self {
        let counts = count_map(activity);
        let problems: Vec<&TreeItem> = problem_files(items, &options.prefix).collect();

        Self {
            total_problems: problems.len(),
            today: today_count(&counts, today),
            this_week: this_week_count(&counts, today),
            current_streak: current_streak(
                &counts,
                today,
                options.gap_tolerance,
                options.lookback_days,
            ),
            difficulty,
            topics: topic_counts(items, &options.prefix, changes),
            languages: top_languages(problems.iter().copied(), options.top_languages),
            weekly: weekly_performance(&counts, today, options.weekly_weeks),
            recent: recent_files(items, changes, &options.prefix, options.recent_limit),
        }
    }
}

// ---------------------------------------------------------------------------
// Activity aggregation
// ---------------------------------------------------------------------------

/// Collapse dated events (one date per event) into per-day counts, oldest first.
pub fn daily_activity(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<ActivityDay> {
    let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for date in dates {
        *per_day.entry(date).or_insert(0) += 1;
    }
    per_day
        .into_iter()
        .map(|(date, count)| ActivityDay { date, count })
        .collect()
}

/// Date -> count lookup. Later duplicates overwrite earlier ones.
pub fn count_map(activity: &[ActivityDay]) -> HashMap<NaiveDate, u32> {
    activity.iter().map(|a| (a.date, a.count)).collect()
}

pub fn today_count(counts: &HashMap<NaiveDate, u32>, today: NaiveDate) -> u32 {
    counts.get(&today).copied().unwrap_or(0)
}

/// Activity since the Monday of the current week, today included.
pub fn this_week_count(counts: &HashMap<NaiveDate, u32>, today: NaiveDate) -> u32 {
    let monday = week_start(today);
    counts
        .iter()
        .filter(|(date, _)| **date >= monday && **date <= today)
        .map(|(_, count)| *count)
        .sum()
}

/// Gap-tolerant streak ending today.
///
/// Walks backward from `today`, counting every active day. A run of more than
/// `gap_tolerance` consecutive inactive days ends the walk, as does reaching
/// `lookback_days` before today.
pub fn current_streak(
    counts: &HashMap<NaiveDate, u32>,
    today: NaiveDate,
    gap_tolerance: u32,
    lookback_days: u32,
) -> u32 {
    let earliest = today - Days::new(u64::from(lookback_days));
    let mut streak = 0;
    let mut misses = 0;
    let mut day = today;

    while day >= earliest {
        if counts.get(&day).copied().unwrap_or(0) > 0 {
            streak += 1;
            misses = 0;
        } else {
            misses += 1;
            if misses > gap_tolerance {
                break;
            }
        }
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }

    streak
}

/// Totals for the last `weeks` Monday-start weeks, oldest first. The current
/// (possibly partial) week is the last entry.
pub fn weekly_performance(
    counts: &HashMap<NaiveDate, u32>,
    today: NaiveDate,
    weeks: usize,
) -> Vec<WeekTotal> {
    let this_monday = week_start(today);

    (0..weeks)
        .rev()
        .map(|back| {
            let start = this_monday - Days::new(7 * back as u64);
            let end = start + Days::new(6);
            let total = counts
                .iter()
                .filter(|(date, _)| **date >= start && **date <= end)
                .map(|(_, count)| *count)
                .sum();
            WeekTotal {
                week_start: start,
                label: start.format("%b %-d").to_string(),
                total,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Listing statistics
// ---------------------------------------------------------------------------

/// Files under the solutions prefix (every file when the prefix is empty).
pub fn solution_files<'a>(
    items: &'a [TreeItem],
    prefix: &'a str,
) -> impl Iterator<Item = &'a TreeItem> + 'a {
    items
        .iter()
        .filter(move |i| i.kind == EntryKind::File && i.path.starts_with(prefix))
}

/// Solution files that sit inside a topic folder.
pub fn problem_files<'a>(
    items: &'a [TreeItem],
    prefix: &'a str,
) -> impl Iterator<Item = &'a TreeItem> + 'a {
    solution_files(items, prefix).filter(move |i| topic_of(&i.path, prefix).is_some())
}

/// Topic of a solution path: the first folder below the prefix.
/// `solutions/arrays/two_sum.py` -> `arrays`; files directly under the
/// prefix have no topic.
pub fn topic_of<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    let (topic, file) = rest.split_once('/')?;
    (!topic.is_empty() && !file.is_empty()).then_some(topic)
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, f)| f)
}

/// Path -> change time lookup.
fn change_map(changes: &[FileChange]) -> HashMap<&str, DateTime<Utc>> {
    let mut map: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for change in changes {
        let at = map.entry(change.path.as_str()).or_insert(change.changed_at);
        *at = (*at).max(change.changed_at);
    }
    map
}

/// Solution counts per topic, most problems first, ties by name. Each topic
/// also names its most recently changed file, when change times are known.
pub fn topic_counts(items: &[TreeItem], prefix: &str, changes: &[FileChange]) -> Vec<TopicCount> {
    let changed = change_map(changes);
    let mut counts: HashMap<&str, (usize, Option<(DateTime<Utc>, &str)>)> = HashMap::new();

    for item in problem_files(items, prefix) {
        let Some(topic) = topic_of(&item.path, prefix) else {
            continue;
        };
        let entry = counts.entry(topic).or_insert((0, None));
        entry.0 += 1;

        if let Some(&at) = changed.get(item.path.as_str()) {
            let newer = match entry.1 {
                None => true,
                Some((best, path)) => at > best || (at == best && item.path.as_str() < path),
            };
            if newer {
                entry.1 = Some((at, item.path.as_str()));
            }
        }
    }

    let mut topics: Vec<TopicCount> = counts
        .into_iter()
        .map(|(name, (count, last))| TopicCount {
            name: name.to_string(),
            count,
            last_file: last.map(|(_, path)| file_name(path).to_string()),
            last_updated: last.map(|(at, _)| at),
        })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    topics
}

/// Up to `limit` problem files with a known change time, newest first.
pub fn recent_files(
    items: &[TreeItem],
    changes: &[FileChange],
    prefix: &str,
    limit: usize,
) -> Vec<RecentFile> {
    let changed = change_map(changes);
    let mut recent: Vec<RecentFile> = problem_files(items, prefix)
        .filter_map(|item| {
            let changed_at = *changed.get(item.path.as_str())?;
            Some(RecentFile {
                path: item.path.clone(),
                name: display_name(file_name(&item.path)),
                topic: topic_of(&item.path, prefix).map(str::to_string),
                changed_at,
            })
        })
        .collect();

    recent.sort_by(|a, b| {
        b.changed_at
            .cmp(&a.changed_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    recent.truncate(limit);
    recent
}

/// Return the top `n` languages by file count.
pub fn top_languages<'a>(
    files: impl IntoIterator<Item = &'a TreeItem>,
    n: usize,
) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in files {
        *counts.entry(language_for(file_name(&item.path))).or_insert(0) += 1;
    }

    let mut langs: Vec<(String, usize)> = counts.into_iter().collect();
    langs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    langs.truncate(n);
    langs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn counts(days: &[(&str, u32)]) -> HashMap<NaiveDate, u32> {
        days.iter().map(|(d, c)| (date(d), *c)).collect()
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn change(path: &str, when: &str) -> FileChange {
        FileChange {
            path: path.to_string(),
            changed_at: at(when),
        }
    }

    fn listing() -> Vec<TreeItem> {
        vec![
            TreeItem::folder("solutions"),
            TreeItem::folder("solutions/arrays"),
            TreeItem::file("solutions/arrays/two_sum.py", 100),
            TreeItem::file("solutions/arrays/three_sum.py", 100),
            TreeItem::folder("solutions/graphs"),
            TreeItem::file("solutions/graphs/dijkstra.cpp", 100),
            TreeItem::folder("solutions/dp"),
            TreeItem::file("solutions/dp/knapsack.cpp", 100),
            TreeItem::file("solutions/README.md", 10),
            TreeItem::file("README.md", 10),
        ]
    }

    #[test]
    fn test_daily_activity() {
        let days = daily_activity([
            date("2024-11-20"),
            date("2024-11-18"),
            date("2024-11-20"),
            date("2024-11-20"),
        ]);
        assert_eq!(
            days,
            vec![
                ActivityDay {
                    date: date("2024-11-18"),
                    count: 1
                },
                ActivityDay {
                    date: date("2024-11-20"),
                    count: 3
                },
            ]
        );
        assert!(daily_activity(Vec::new()).is_empty());
    }

    #[test]
    fn test_this_week_count() {
        // Thursday 2024-11-21; the week opened Monday 2024-11-18.
        let c = counts(&[
            ("2024-11-17", 9),
            ("2024-11-18", 1),
            ("2024-11-21", 2),
            ("2024-11-22", 5),
        ]);
        assert_eq!(this_week_count(&c, date("2024-11-21")), 3);
        assert_eq!(today_count(&c, date("2024-11-21")), 2);
        assert_eq!(today_count(&c, date("2024-11-20")), 0);
    }

    #[test]
    fn test_current_streak_gap_tolerant() {
        let today = date("2024-11-24");
        let c = counts(&[
            ("2024-11-24", 1),
            ("2024-11-23", 2),
            // three missed days are tolerated
            ("2024-11-19", 1),
            ("2024-11-18", 1),
            // four missed days end the streak
            ("2024-11-13", 1),
        ]);
        assert_eq!(current_streak(&c, today, 3, 180), 4);
        assert_eq!(current_streak(&c, today, 0, 180), 2);
        assert_eq!(current_streak(&c, today, 10, 180), 5);
    }

    #[test]
    fn test_current_streak_inactive_today() {
        let today = date("2024-11-24");
        let c = counts(&[("2024-11-22", 1), ("2024-11-21", 1)]);
        assert_eq!(current_streak(&c, today, 3, 180), 2);
        assert_eq!(current_streak(&HashMap::new(), today, 3, 180), 0);
    }

    #[test]
    fn test_current_streak_respects_lookback() {
        let today = date("2024-11-24");
        let c: HashMap<NaiveDate, u32> =
            (0..30).map(|back| (today - Days::new(back), 1)).collect();
        assert_eq!(current_streak(&c, today, 3, 9), 10);
        assert_eq!(current_streak(&c, today, 3, 180), 30);
    }

    #[test]
    fn test_weekly_performance() {
        let today = date("2024-11-21");
        let c = counts(&[
            ("2024-11-04", 1),
            ("2024-11-10", 2),
            ("2024-11-11", 4),
            ("2024-11-21", 8),
        ]);
        let weeks = weekly_performance(&c, today, 3);

        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].week_start, date("2024-11-04"));
        assert_eq!(weeks[0].label, "Nov 4");
        assert_eq!(weeks[0].total, 3);
        assert_eq!(weeks[1].total, 4);
        assert_eq!(weeks[2].week_start, date("2024-11-18"));
        assert_eq!(weeks[2].total, 8);
        assert!(weekly_performance(&c, today, 0).is_empty());
    }

    #[test]
    fn test_topic_of() {
        assert_eq!(topic_of("solutions/arrays/two_sum.py", "solutions/"), Some("arrays"));
        assert_eq!(topic_of("solutions/a/b/c.py", "solutions/"), Some("a"));
        assert_eq!(topic_of("solutions/README.md", "solutions/"), None);
        assert_eq!(topic_of("docs/arrays/x.md", "solutions/"), None);
        assert_eq!(topic_of("arrays/x.py", ""), Some("arrays"));
    }

    #[test]
    fn test_topic_counts_sorted() {
        let topics = topic_counts(&listing(), "solutions/", &[]);
        let pairs: Vec<(&str, usize)> = topics.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(pairs, vec![("arrays", 2), ("dp", 1), ("graphs", 1)]);
        assert!(topics.iter().all(|t| t.last_file.is_none() && t.last_updated.is_none()));
    }

    #[test]
    fn test_topic_counts_last_updated() {
        let changes = vec![
            change("solutions/arrays/two_sum.py", "2024-11-18T10:00:00Z"),
            change("solutions/arrays/three_sum.py", "2024-11-20T08:00:00Z"),
            change("solutions/graphs/dijkstra.cpp", "2024-11-01T00:00:00Z"),
            // Not a problem file.
            change("solutions/README.md", "2024-11-25T00:00:00Z"),
        ];
        let topics = topic_counts(&listing(), "solutions/", &changes);

        let arrays = topics.iter().find(|t| t.name == "arrays").unwrap();
        assert_eq!(arrays.last_file.as_deref(), Some("three_sum.py"));
        assert_eq!(arrays.last_updated, Some(at("2024-11-20T08:00:00Z")));

        let graphs = topics.iter().find(|t| t.name == "graphs").unwrap();
        assert_eq!(graphs.last_file.as_deref(), Some("dijkstra.cpp"));

        let dp = topics.iter().find(|t| t.name == "dp").unwrap();
        assert_eq!(dp.last_file, None);
    }

    #[test]
    fn test_recent_files_newest_first() {
        let changes = vec![
            change("solutions/arrays/two_sum.py", "2024-11-18T10:00:00Z"),
            change("solutions/dp/knapsack.cpp", "2024-11-20T08:00:00Z"),
            change("solutions/graphs/dijkstra.cpp", "2024-11-20T08:00:00Z"),
            change("solutions/README.md", "2024-11-25T00:00:00Z"),
            change("solutions/arrays/gone.py", "2024-11-26T00:00:00Z"),
        ];
        let recent = recent_files(&listing(), &changes, "solutions/", 10);

        let paths: Vec<&str> = recent.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "solutions/dp/knapsack.cpp",
                "solutions/graphs/dijkstra.cpp",
                "solutions/arrays/two_sum.py",
            ]
        );
        assert_eq!(recent[2].name, "Two Sum");
        assert_eq!(recent[2].topic.as_deref(), Some("arrays"));

        assert_eq!(recent_files(&listing(), &changes, "solutions/", 1).len(), 1);
        assert!(recent_files(&listing(), &[], "solutions/", 10).is_empty());
    }

    #[test]
    fn test_top_languages() {
        let items = listing();
        let langs = top_languages(problem_files(&items, "solutions/"), 2);
        assert_eq!(
            langs,
            vec![("C++".to_string(), 2), ("Python".to_string(), 2)]
        );
    }

    #[test]
    fn test_dashboard_compute() {
        let today = date("2024-11-21");
        let activity = vec![
            ActivityDay {
                date: date("2024-11-20"),
                count: 2,
            },
            ActivityDay {
                date: today,
                count: 1,
            },
        ];
        let difficulty = Some(DifficultyBreakdown {
            easy: 2,
            medium: 1,
            hard: 1,
        });
        let changes = vec![change("solutions/graphs/dijkstra.cpp", "2024-11-21T07:00:00Z")];
        let dash = Dashboard::compute(
            &listing(),
            &activity,
            difficulty,
            &changes,
            &StatsOptions::default(),
            today,
        );

        assert_eq!(dash.total_problems, 4);
        assert_eq!(dash.today, 1);
        assert_eq!(dash.this_week, 3);
        assert_eq!(dash.current_streak, 2);
        assert_eq!(dash.difficulty, difficulty);
        assert_eq!(dash.topics.len(), 3);
        assert_eq!(dash.weekly.len(), 8);
        assert_eq!(dash.weekly.last().unwrap().total, 3);
        assert_eq!(dash.recent.len(), 1);
        assert_eq!(dash.latest().map(|r| r.name.as_str()), Some("Dijkstra"));
    }
}
