//! Solution-file metadata.
//!
//! Solutions carry a small comment header, e.g.
//!
//! ```text
//! # @difficulty: Easy
//! # @tags: array, hash-map
//! # @time: O(n)
//! # @space: O(n)
//! # @leetcode: https://leetcode.com/problems/two-sum/
//! ```
//!
//! Only the first [`HEADER_LINES`] lines are scanned.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of leading lines searched for header tags.
pub const HEADER_LINES: usize = 20;

const DEFAULT_DIFFICULTY: &str = "Medium";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub difficulty: String,
    pub tags: Vec<String>,
    pub time_complexity: Option<String>,
    pub space_complexity: Option<String>,
    pub leetcode_link: Option<String>,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY.to_string(),
            tags: Vec::new(),
            time_complexity: None,
            space_complexity: None,
            leetcode_link: None,
        }
    }
}

struct HeaderPatterns {
    difficulty: Regex,
    tags: Regex,
    time: Regex,
    space: Regex,
    leetcode: Regex,
}

fn patterns() -> &'static HeaderPatterns {
    static PATTERNS: OnceLock<HeaderPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |p: &str| Regex::new(p).expect("header pattern is a valid regex");
        HeaderPatterns {
            difficulty: compile(r"(?i)@difficulty:\s*(\w+)"),
            tags: compile(r"(?i)@tags:\s*(.+)"),
            time: compile(r"(?i)@time:\s*(.+)"),
            space: compile(r"(?i)@space:\s*(.+)"),
            leetcode: compile(r"(?i)@leetcode:\s*(https?://\S+)"),
        }
    })
}

fn capture(re: &Regex, header: &str) -> Option<String> {
    re.captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Read the header tags of a solution file. Missing tags keep their defaults.
pub fn extract_metadata(content: &str) -> FileMetadata {
    let header: String = content
        .lines()
        .take(HEADER_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    let p = patterns();

    let mut meta = FileMetadata::default();
    if let Some(difficulty) = capture(&p.difficulty, &header) {
        meta.difficulty = difficulty;
    }
    if let Some(tags) = capture(&p.tags, &header) {
        meta.tags = tags
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    meta.time_complexity = capture(&p.time, &header);
    meta.space_complexity = capture(&p.space, &header);
    meta.leetcode_link = capture(&p.leetcode, &header);
    meta
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Extension of a file name without the dot, or "" when there is none.
pub fn extension(file_name: &str) -> &str {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

/// Human title for a solution file: `two_sum.py` -> `Two Sum`.
pub fn display_name(file_name: &str) -> String {
    let base = file_name
        .rsplit_once('.')
        .map_or(file_name, |(base, _)| base)
        .replace('_', " ");

    let mut out = String::with_capacity(base.len());
    let mut prev_alpha = false;
    for ch in base.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Display language for a file, by extension.
pub fn language_for(file_name: &str) -> String {
    let ext = extension(file_name);
    let known = match ext {
        "py" => "Python",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "cpp" => "C++",
        "java" => "Java",
        "go" => "Go",
        "rs" => "Rust",
        "c" => "C",
        "rb" => "Ruby",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "" => "Other",
        other => return other.to_uppercase(),
    };
    known.to_string()
}

// ---------------------------------------------------------------------------
// Difficulty tally
// ---------------------------------------------------------------------------

/// Solved problems per difficulty. Unknown labels are not counted.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DifficultyBreakdown {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyBreakdown {
    pub fn tally<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Self::default();
        for label in labels {
            out.record(label);
        }
        out
    }

    pub fn record(&mut self, label: &str) {
        match label.to_lowercase().as_str() {
            "easy" => self.easy += 1,
            "medium" => self.medium += 1,
            "hard" => self.hard += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}

// ---------------------------------------------------------------------------
// FileDetail
// ---------------------------------------------------------------------------

/// Everything the detail pane shows about one solution file.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FileDetail {
    pub path: String,
    pub name: String,
    pub file_name: String,
    pub language: String,
    pub size: usize,
    pub lines: usize,
    pub metadata: FileMetadata,
}

impl FileDetail {
    pub fn from_content(path: &str, content: &str) -> Self {
        let file_name = path.rsplit_once('/').map_or(path, |(_, f)| f).to_string();
        Self {
            path: path.to_string(),
            name: display_name(&file_name),
            language: language_for(&file_name),
            size: content.len(),
            lines: content.lines().count(),
            metadata: extract_metadata(content),
            file_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
