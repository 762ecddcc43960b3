//! Browse a repository of DSA solutions: a sorted, searchable file tree and
//! a calendar heatmap of solving activity, in the terminal or as JSON.

pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod metadata;
pub mod renderer;
pub mod scanner;
pub mod source;
pub mod state;
pub mod statistics;
pub mod tree;
pub mod watcher;

pub use error::{ExplorerError, Result};
