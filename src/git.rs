//! Read the listing and activity of a local git checkout.
//!
//! Every command runs at the root of the work tree, so listing paths, the
//! solutions prefix and `HEAD:<path>` reads all share one frame of reference.
//!
//! - listing: `git ls-tree -r -t --long -z HEAD`
//! - activity: author dates from `git log`, limited to the solutions prefix
//! - change times: `git log --name-only`, newest commit per file
//! - contents: `git show HEAD:<path>`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, NaiveDate};
use tracing::{debug, warn};

use crate::calendar::ActivityDay;
use crate::error::{ExplorerError, Result};
use crate::metadata::{extract_metadata, DifficultyBreakdown};
use crate::scanner::MAX_CONTENT_SIZE;
use crate::source::{FileChange, RepoSource};
use crate::statistics::{daily_activity, problem_files};
use crate::tree::{EntryKind, TreeItem};

/// Revision every listing and file read is taken from.
const REV: &str = "HEAD";

/// Marks the timestamp line of each commit in `git log --name-only` output.
const COMMIT_MARK: char = '\0';

pub struct GitSource {
    /// Root of the work tree, even when opened from a subdirectory.
    repo_path: PathBuf,
    prefix: String,
}

impl GitSource {
    /// Open the work tree containing `path`, failing if there is none.
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let output = run_git(path, &["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Err(ExplorerError::NotGitRepo {
                path: path.to_path_buf(),
            });
        }

        let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(toplevel = %toplevel, "opened git work tree");
        Ok(Self {
            repo_path: PathBuf::from(toplevel),
            prefix: prefix.to_string(),
        })
    }

    /// Whether `path` is inside a git work tree.
    pub fn is_repo(path: &Path) -> bool {
        run_git(path, &["rev-parse", "--show-toplevel"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git_ok(&self, args: &[&str]) -> Result<String> {
        let output = run_git(&self.repo_path, args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExplorerError::git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `log` arguments followed by the prefix pathspec, if there is one.
    fn log_args<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut all = vec!["log"];
        all.extend_from_slice(args);
        all.push(REV);
        let pathspec = self.prefix.trim_end_matches('/');
        if !pathspec.is_empty() {
            all.push("--");
            all.push(pathspec);
        }
        all
    }
}

fn run_git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(["-c", "core.quotePath=false"])
        .args(args)
        .current_dir(repo_path)
        .output()
        .map_err(|e| ExplorerError::git(format!("failed to run git: {}", e)))
}

impl RepoSource for GitSource {
    fn describe(&self) -> String {
        format!("git repository {}", self.repo_path.display())
    }

    fn list_tree(&self) -> Result<Vec<TreeItem>> {
        let stdout = self.git_ok(&["ls-tree", "-r", "-t", "--long", "-z", REV])?;
        let items: Vec<TreeItem> = stdout
            .split('\0')
            .filter(|entry| !entry.is_empty())
            .filter_map(parse_ls_tree_entry)
            .collect();
        debug!(entries = items.len(), "git ls-tree");
        Ok(items)
    }

    fn activity(&self) -> Result<Vec<ActivityDay>> {
        let stdout = self.git_ok(&self.log_args(&["--format=%ad", "--date=short"]))?;
        let dates = parse_log_dates(&stdout)?;
        Ok(daily_activity(dates))
    }

    fn read_file(&self, path: &str) -> Result<Option<String>> {
        let spec = format!("{}:{}", REV, path);
        let output = run_git(&self.repo_path, &["show", &spec])?;
        if !output.status.success() {
            warn!(path, "git show failed");
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    /// Tally `@difficulty` headers of the committed problem files.
    fn difficulty(&self, items: &[TreeItem], prefix: &str) -> Result<Option<DifficultyBreakdown>> {
        let mut breakdown = DifficultyBreakdown::default();
        for item in problem_files(items, prefix) {
            if item.size.is_some_and(|size| size > MAX_CONTENT_SIZE) {
                continue;
            }
            if let Some(content) = self.read_file(&item.path)? {
                breakdown.record(&extract_metadata(&content).difficulty);
            }
        }
        Ok(Some(breakdown))
    }

    fn file_changes(&self) -> Result<Vec<FileChange>> {
        let stdout = self.git_ok(&self.log_args(&["--name-only", "--format=%x00%at"]))?;
        let changes = parse_log_changes(&stdout);
        debug!(files = changes.len(), "git log --name-only");
        Ok(changes)
    }

    /// Commits move refs under `.git`.
    fn watch_paths(&self) -> Vec<PathBuf> {
        vec![self.repo_path.join(".git")]
    }
}

/// Parse one `git ls-tree --long -z` record.
///
/// Format: `<mode> <type> <hash> <size>\t<path>`, where size is `-` for trees.
/// Submodule entries (`commit`) are skipped.
fn parse_ls_tree_entry(entry: &str) -> Option<TreeItem> {
    let (meta, path) = entry.split_once('\t')?;
    let parts: Vec<&str> = meta.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }

    let kind = match parts[1] {
        "tree" => EntryKind::Folder,
        "blob" => EntryKind::File,
        _ => return None,
    };
    let size = match kind {
        EntryKind::Folder => None,
        EntryKind::File => parts[3].trim().parse::<u64>().ok(),
    };

    Some(TreeItem {
        path: path.to_string(),
        kind,
        size,
        sha: Some(parts[2].to_string()),
    })
}

/// Parse `git log --date=short` output: one `YYYY-MM-DD` per line.
fn parse_log_dates(stdout: &str) -> Result<Vec<NaiveDate>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            NaiveDate::parse_from_str(l, "%Y-%m-%d")
                .map_err(|e| ExplorerError::git(format!("invalid commit date '{}': {}", l, e)))
        })
        .collect()
}

/// Parse `git log --name-only --format=%x00%at` output into the newest change
/// of every file. Commits arrive newest first, so the first sighting wins.
fn parse_log_changes(stdout: &str) -> Vec<FileChange> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut changes = Vec::new();
    let mut current = None;

    for line in stdout.lines() {
        if let Some(stamp) = line.strip_prefix(COMMIT_MARK) {
            current = stamp
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            continue;
        }
        let path = line.trim_end();
        let Some(changed_at) = current else {
            continue;
        };
        if path.is_empty() || !seen.insert(path) {
            continue;
        }
        changes.push(FileChange {
            path: path.to_string(),
            changed_at,
        });
    }

    changes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FIRST_COMMIT: &str = "1732096800 +0000"; // 2024-11-20T10:00:00Z
    const SECOND_COMMIT: &str = "1732262400 +0000"; // 2024-11-22T08:00:00Z

    fn git(dir: &Path, date: &str, args: &[&str]) -> bool {
        Command::new("git")
            .args([
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// A repository with two commits, or `None` when git is unavailable.
    fn fixture_repo() -> Option<tempfile::TempDir> {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        if !git(root, FIRST_COMMIT, &["init", "-q"]) {
            return None;
        }

        fs::create_dir_all(root.join("solutions/arrays")).unwrap();
        fs::create_dir_all(root.join("solutions/graphs")).unwrap();
        fs::write(root.join("solutions/arrays/two_sum.py"), "# @difficulty: Easy\n").unwrap();
        fs::write(
            root.join("solutions/graphs/dijkstra.rs"),
            "// @difficulty: Hard\nfn main() {}\n",
        )
        .unwrap();
        fs::write(root.join("solutions/arrays/café.py"), "pass\n").unwrap();
        fs::write(root.join("README.md"), "# notes\n").unwrap();
        assert!(git(root, FIRST_COMMIT, &["add", "."]));
        assert!(git(root, FIRST_COMMIT, &["commit", "-q", "-m", "first"]));

        fs::write(
            root.join("solutions/arrays/two_sum.py"),
            "# @difficulty: Easy\n# @tags: array\n",
        )
        .unwrap();
        assert!(git(root, SECOND_COMMIT, &["commit", "-q", "-am", "second"]));
        Some(dir)
    }

    #[test]
    fn test_parse_ls_tree_entry() {
        let blob = parse_ls_tree_entry(
            "100644 blob 3b18e512dba79e4c8300dd08aeb37f8e728b8dad     1234\tsolutions/arrays/two_sum.py",
        )
        .unwrap();
        assert_eq!(blob.path, "solutions/arrays/two_sum.py");
        assert_eq!(blob.kind, EntryKind::File);
        assert_eq!(blob.size, Some(1234));
        assert_eq!(
            blob.sha.as_deref(),
            Some("3b18e512dba79e4c8300dd08aeb37f8e728b8dad")
        );

        let tree = parse_ls_tree_entry(
            "040000 tree 9f2c1a0e2b3d4c5f6a7b8c9d0e1f2a3b4c5d6e7f       -\tsolutions",
        )
        .unwrap();
        assert_eq!(tree.kind, EntryKind::Folder);
        assert_eq!(tree.size, None);
    }

    #[test]
    fn test_parse_ls_tree_entry_skips_other_entries() {
        assert!(parse_ls_tree_entry(
            "160000 commit 9f2c1a0e2b3d4c5f6a7b8c9d0e1f2a3b4c5d6e7f       -\tvendor/lib"
        )
        .is_none());
        assert!(parse_ls_tree_entry("garbage").is_none());
        assert!(parse_ls_tree_entry("100644 blob\tshort").is_none());
    }

    #[test]
    fn test_parse_log_dates() {
        let dates = parse_log_dates("2024-11-20\n2024-11-20\n\n2024-11-18\n").unwrap();
        assert_eq!(dates.len(), 3);
        assert_eq!(daily_activity(dates).len(), 2);

        assert!(parse_log_dates("Wed Nov 20\n").is_err());
    }

    #[test]
    fn test_parse_log_changes_newest_wins() {
        let stdout = "\u{0}1732262400\n\nsolutions/a/x.py\n\
                      \u{0}1732096800\n\nsolutions/a/x.py\nsolutions/b/y.py\n";
        let changes = parse_log_changes(stdout);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "solutions/a/x.py");
        assert_eq!(changes[0].changed_at.to_rfc3339(), "2024-11-22T08:00:00+00:00");
        assert_eq!(changes[1].path, "solutions/b/y.py");
        assert_eq!(changes[1].changed_at.to_rfc3339(), "2024-11-20T10:00:00+00:00");

        assert!(parse_log_changes("orphan/path.py\n").is_empty());
    }

    #[test]
    fn test_open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        // Either git is missing (Git error) or the directory is no repository.
        assert!(GitSource::open(dir.path(), "solutions/").is_err());
        assert!(!GitSource::is_repo(dir.path()));
    }

    #[test]
    fn test_difficulty_from_committed_headers() {
        let Some(dir) = fixture_repo() else {
            return;
        };
        let source = GitSource::open(dir.path(), "solutions/").unwrap();
        let items = source.list_tree().unwrap();
        let breakdown = source.difficulty(&items, "solutions/").unwrap().unwrap();

        assert_eq!(breakdown.easy, 1);
        assert_eq!(breakdown.hard, 1);
        // No header: defaults to medium.
        assert_eq!(breakdown.medium, 1);
    }

    #[test]
    fn test_list_tree_keeps_non_ascii_paths() {
        let Some(dir) = fixture_repo() else {
            return;
        };
        let source = GitSource::open(dir.path(), "solutions/").unwrap();
        let items = source.list_tree().unwrap();

        assert!(items.iter().any(|i| i.path == "solutions/arrays/café.py"));
        assert!(items.iter().all(|i| !i.path.starts_with('"')));
    }

    #[test]
    fn test_open_from_subdirectory_uses_work_tree_root() {
        let Some(dir) = fixture_repo() else {
            return;
        };
        let source = GitSource::open(&dir.path().join("solutions/arrays"), "solutions/").unwrap();
        let items = source.list_tree().unwrap();

        assert!(items.iter().any(|i| i.path == "README.md"));
        let content = source.read_file("solutions/graphs/dijkstra.rs").unwrap();
        assert_eq!(content.as_deref(), Some("// @difficulty: Hard\nfn main() {}\n"));
        assert_eq!(source.activity().unwrap().len(), 2);
    }

    #[test]
    fn test_file_changes_from_history() {
        let Some(dir) = fixture_repo() else {
            return;
        };
        let source = GitSource::open(dir.path(), "solutions/").unwrap();
        let changes = source.file_changes().unwrap();

        let when = |path: &str| {
            changes
                .iter()
                .find(|c| c.path == path)
                .map(|c| c.changed_at.to_rfc3339())
        };
        assert_eq!(changes.len(), 3);
        assert_eq!(
            when("solutions/arrays/two_sum.py").as_deref(),
            Some("2024-11-22T08:00:00+00:00")
        );
        assert_eq!(
            when("solutions/graphs/dijkstra.rs").as_deref(),
            Some("2024-11-20T10:00:00+00:00")
        );
        // Outside the prefix.
        assert_eq!(when("README.md"), None);
    }
}
