use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::calendar::ActivityDay;
use crate::error::{ExplorerError, Result};
use crate::metadata::{extract_metadata, DifficultyBreakdown};
use crate::source::{FileChange, RepoSource};
use crate::statistics::{daily_activity, problem_files};
use crate::tree::TreeItem;

/// Files larger than this are not read for the detail pane or metadata.
pub const MAX_CONTENT_SIZE: u64 = 100 * 1024;

/// A plain directory on disk. Activity and change times come from
/// modification times.
pub struct DirSource {
    root: PathBuf,
    show_hidden: bool,
}

/// One walked entry, relative to the root.
struct ScannedEntry {
    item: TreeItem,
    modified: Option<DateTime<Local>>,
}

impl DirSource {
    pub fn new(root: PathBuf, show_hidden: bool) -> Self {
        Self { root, show_hidden }
    }

    // ------------------------------------------------------------------
    // Path filtering helpers
    // ------------------------------------------------------------------

    /// Returns `true` if any component of `rel` starts with a dot.
    fn is_hidden(rel: &Path) -> bool {
        rel.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
        })
    }

    /// `/`-joined path relative to the root, or `None` for the root itself.
    fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    // ------------------------------------------------------------------
    // Directory scanning
    // ------------------------------------------------------------------

    fn scan(&self) -> Result<Vec<ScannedEntry>> {
        if !self.root.is_dir() {
            return Err(ExplorerError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let show_hidden = self.show_hidden;
        let root = self.root.clone();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |e| {
                show_hidden
                    || e.path()
                        .strip_prefix(&root)
                        .map(|rel| !Self::is_hidden(rel))
                        .unwrap_or(true)
            });

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.path_is_symlink() {
                continue;
            }
            let Some(path) = self.relative_path(entry.path()) else {
                continue;
            };
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };

            let modified = meta.modified().ok().map(DateTime::<Local>::from);

            let item = if meta.is_dir() {
                TreeItem::folder(path)
            } else if meta.is_file() {
                TreeItem::file(path, meta.len())
            } else {
                continue;
            };
            entries.push(ScannedEntry { item, modified });
        }

        debug!(root = %self.root.display(), entries = entries.len(), "scanned directory");
        Ok(entries)
    }

    /// Read a file relative to the root, skipping oversized or non-UTF-8 files.
    fn read_content(&self, rel: &str) -> Result<Option<String>> {
        let path = self.root.join(rel);
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ExplorerError::io(&path, e)),
        };
        if !meta.is_file() || meta.len() > MAX_CONTENT_SIZE {
            return Ok(None);
        }

        match fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8(bytes).ok()),
            Err(e) => Err(ExplorerError::io(&path, e)),
        }
    }
}

impl RepoSource for DirSource {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    fn list_tree(&self) -> Result<Vec<TreeItem>> {
        Ok(self.scan()?.into_iter().map(|e| e.item).collect())
    }

    /// One event per file, dated by its last modification.
    fn activity(&self) -> Result<Vec<ActivityDay>> {
        let dates = self
            .scan()?
            .into_iter()
            .filter(|e| !e.item.kind.is_folder())
            .filter_map(|e| e.modified.map(|t| t.date_naive()));
        Ok(daily_activity(dates))
    }

    fn file_changes(&self) -> Result<Vec<FileChange>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|e| !e.item.kind.is_folder())
            .filter_map(|e| {
                let changed_at = e.modified?.with_timezone(&Utc);
                Some(FileChange {
                    path: e.item.path,
                    changed_at,
                })
            })
            .collect())
    }

    fn read_file(&self, path: &str) -> Result<Option<String>> {
        self.read_content(path)
    }

    fn difficulty(&self, items: &[TreeItem], prefix: &str) -> Result<Option<DifficultyBreakdown>> {
        let mut breakdown = DifficultyBreakdown::default();
        for item in problem_files(items, prefix) {
            if let Some(content) = self.read_content(&item.path)? {
                breakdown.record(&extract_metadata(&content).difficulty);
            }
        }
        Ok(Some(breakdown))
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        vec![self.root.clone()]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
