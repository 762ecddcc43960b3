//! Where listings and activity come from.
//!
//! A [`RepoSource`] hands back the flat listing and the per-day activity the
//! transforms consume. Three implementations exist: saved API payloads
//! ([`JsonSource`]), a local git checkout ([`crate::git::GitSource`]) and a
//! plain directory ([`crate::scanner::DirSource`]).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::ActivityDay;
use crate::error::{ExplorerError, Result};
use crate::metadata::{DifficultyBreakdown, FileDetail};
use crate::tree::{build_tree, TreeItem, TreeNode};

/// The most recent change to one file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub changed_at: DateTime<Utc>,
}

pub trait RepoSource {
    /// Short description for the header line.
    fn describe(&self) -> String;

    /// The flat repository listing.
    fn list_tree(&self) -> Result<Vec<TreeItem>>;

    /// Per-day activity counts. Days without activity may be omitted.
    fn activity(&self) -> Result<Vec<ActivityDay>>;

    /// Contents of a file, or `None` when the source cannot provide them.
    fn read_file(&self, path: &str) -> Result<Option<String>>;

    /// Difficulty counts for the solutions under `prefix`, when known.
    fn difficulty(&self, _items: &[TreeItem], _prefix: &str) -> Result<Option<DifficultyBreakdown>> {
        Ok(None)
    }

    /// Latest change per file, in any order. Files the source knows nothing
    /// about are simply absent.
    fn file_changes(&self) -> Result<Vec<FileChange>> {
        Ok(Vec::new())
    }

    /// Paths whose changes should trigger a reload.
    fn watch_paths(&self) -> Vec<PathBuf>;
}

/// One consistent load of a source: the inputs plus the built tree.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub items: Vec<TreeItem>,
    pub tree: Vec<TreeNode>,
    pub activity: Vec<ActivityDay>,
    pub difficulty: Option<DifficultyBreakdown>,
    pub changes: Vec<FileChange>,
}

impl Snapshot {
    pub fn load(source: &dyn RepoSource, prefix: &str) -> Result<Self> {
        let items = source.list_tree()?;
        let activity = source.activity()?;
        let difficulty = source.difficulty(&items, prefix)?;
        let changes = source.file_changes()?;
        let tree = build_tree(&items);

        info!(
            items = items.len(),
            active_days = activity.len(),
            changed_files = changes.len(),
            "loaded {}",
            source.describe()
        );

        Ok(Self {
            items,
            tree,
            activity,
            difficulty,
            changes,
        })
    }
}

/// Read a file and build its detail pane, if the source can provide it.
pub fn file_detail(source: &dyn RepoSource, path: &str) -> Result<Option<FileDetail>> {
    Ok(source
        .read_file(path)?
        .map(|content| FileDetail::from_content(path, &content)))
}

// ---------------------------------------------------------------------------
// JsonSource
// ---------------------------------------------------------------------------

/// `GET /github/dsa/tree` response body.
#[derive(Deserialize)]
struct TreePayload {
    tree: Vec<TreeItem>,
}

/// The parts of the `GET /github/dsa/stats` response body this crate uses.
#[derive(Deserialize, Default)]
struct StatsPayload {
    #[serde(default)]
    activity: Vec<ActivityDay>,
    #[serde(default)]
    difficulty: Option<DifficultyBreakdown>,
    #[serde(default)]
    recent: Vec<RecentPayload>,
}

/// One entry of the stats `recent` array.
#[derive(Deserialize)]
struct RecentPayload {
    path: String,
    #[serde(default)]
    committed_at: String,
}

/// Parse an API timestamp: RFC 3339, or a zone-less ISO timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// API responses saved to disk.
pub struct JsonSource {
    tree_path: PathBuf,
    stats_path: Option<PathBuf>,
}

impl JsonSource {
    pub fn new(tree_path: PathBuf, stats_path: Option<PathBuf>) -> Self {
        Self {
            tree_path,
            stats_path,
        }
    }

    fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
        let raw = fs::read_to_string(path).map_err(|e| ExplorerError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|source| ExplorerError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    fn stats(&self) -> Result<StatsPayload> {
        match &self.stats_path {
            Some(path) => Self::read_json(path),
            None => Ok(StatsPayload::default()),
        }
    }
}

impl RepoSource for JsonSource {
    fn describe(&self) -> String {
        format!("tree payload {}", self.tree_path.display())
    }

    fn list_tree(&self) -> Result<Vec<TreeItem>> {
        let payload: TreePayload = Self::read_json(&self.tree_path)?;
        Ok(payload.tree)
    }

    fn activity(&self) -> Result<Vec<ActivityDay>> {
        let stats = self.stats()?;
        debug!(days = stats.activity.len(), "activity from stats payload");
        Ok(stats.activity)
    }

    /// File bodies are only reachable through the live API.
    fn read_file(&self, _path: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn difficulty(&self, _items: &[TreeItem], _prefix: &str) -> Result<Option<DifficultyBreakdown>> {
        Ok(self.stats()?.difficulty)
    }

    /// Only the handful of files listed under `recent` carry dates.
    fn file_changes(&self) -> Result<Vec<FileChange>> {
        let mut changes = Vec::new();
        for entry in self.stats()?.recent {
            match parse_timestamp(&entry.committed_at) {
                Some(changed_at) => changes.push(FileChange {
                    path: entry.path,
                    changed_at,
                }),
                None if entry.committed_at.is_empty() => {}
                None => warn!(path = %entry.path, raw = %entry.committed_at, "unreadable timestamp"),
            }
        }
        Ok(changes)
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.tree_path.clone())
            .chain(self.stats_path.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::EntryKind;

    const TREE_JSON: &str = r#"{"tree": [
        {"path": "solutions", "type": "tree", "sha": "a1", "size": null},
        {"path": "solutions/arrays", "type": "tree", "sha": "a2", "size": null},
        {"path": "solutions/arrays/two_sum.py", "type": "blob", "sha": "a3", "size": 321}
    ]}"#;

    const STATS_JSON: &str = r#"{
        "total_problems": 1,
        "difficulty": {"easy": 1, "medium": 0, "hard": 0},
        "today": 0,
        "activity": [{"date": "2024-11-20", "count": 2}],
        "recent": [
            {"filename": "two_sum.py", "path": "solutions/arrays/two_sum.py",
             "difficulty": "Easy", "tags": [], "committed_at": "2024-11-20T09:30:00",
             "message": "", "folder": "arrays"},
            {"filename": "old.py", "path": "solutions/arrays/old.py",
             "difficulty": "Medium", "tags": [], "committed_at": "", "message": "", "folder": "arrays"}
        ]
    }"#;

    #[test]
    fn test_json_source_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let tree_path = dir.path().join("tree.json");
        let stats_path = dir.path().join("stats.json");
        fs::write(&tree_path, TREE_JSON).unwrap();
        fs::write(&stats_path, STATS_JSON).unwrap();

        let source = JsonSource::new(tree_path.clone(), Some(stats_path.clone()));
        let snapshot = Snapshot::load(&source, "solutions/").unwrap();

        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.tree.len(), 1);
        assert_eq!(snapshot.tree[0].kind, EntryKind::Folder);
        assert_eq!(snapshot.activity.len(), 1);
        assert_eq!(snapshot.activity[0].count, 2);
        assert_eq!(snapshot.difficulty.map(|d| d.easy), Some(1));
        assert_eq!(snapshot.changes.len(), 1);
        assert_eq!(snapshot.changes[0].path, "solutions/arrays/two_sum.py");
        assert_eq!(
            snapshot.changes[0].changed_at.to_rfc3339(),
            "2024-11-20T09:30:00+00:00"
        );
        assert_eq!(source.watch_paths(), vec![tree_path, stats_path]);
        assert!(file_detail(&source, "solutions/arrays/two_sum.py")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_json_source_without_stats() {
        let dir = tempfile::tempdir().unwrap();
        let tree_path = dir.path().join("tree.json");
        fs::write(&tree_path, TREE_JSON).unwrap();

        let source = JsonSource::new(tree_path, None);
        assert!(source.activity().unwrap().is_empty());
        assert!(source.difficulty(&[], "").unwrap().is_none());
        assert!(source.file_changes().unwrap().is_empty());
    }

    #[test]
    fn test_parse_timestamp() {
        let utc = parse_timestamp("2024-11-20T09:30:00.250").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-11-20T09:30:00.250+00:00");

        let offset = parse_timestamp("2024-11-20T11:30:00+02:00").unwrap();
        assert_eq!(offset, parse_timestamp("2024-11-20T09:30:00Z").unwrap());

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn test_json_source_malformed_date_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tree_path = dir.path().join("tree.json");
        let stats_path = dir.path().join("stats.json");
        fs::write(&tree_path, TREE_JSON).unwrap();
        fs::write(&stats_path, r#"{"activity": [{"date": "yesterday", "count": 1}]}"#).unwrap();

        let source = JsonSource::new(tree_path, Some(stats_path));
        assert!(matches!(
            source.activity().unwrap_err(),
            ExplorerError::Json { .. }
        ));
    }

    #[test]
    fn test_json_source_missing_file() {
        let source = JsonSource::new(PathBuf::from("/definitely/not/here.json"), None);
        assert!(matches!(
            source.list_tree().unwrap_err(),
            ExplorerError::Io { .. }
        ));
    }
}
