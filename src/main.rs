use std::fs::File;
use std::sync::Mutex;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dsa_explorer::app::App;
use dsa_explorer::calendar::layout_calendar_today;
use dsa_explorer::cli::{Cli, DumpKind};
use dsa_explorer::config::Config;
use dsa_explorer::git::GitSource;
use dsa_explorer::scanner::DirSource;
use dsa_explorer::source::{JsonSource, RepoSource, Snapshot};
use dsa_explorer::statistics::Dashboard;
use dsa_explorer::tree::filter_tree;

const DEFAULT_LOG_FILTER: &str = "dsa_explorer=info";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = cli.resolve_config().context("Failed to load configuration")?;
    debug!(?config, "resolved configuration");

    let source = open_source(&cli, &config)?;

    // Handle --dump mode
    if let Some(kind) = cli.dump {
        return handle_dump(kind, source.as_ref(), &config, cli.search.as_deref());
    }

    // Interactive mode
    let mut app = App::new(source, config, cli.search.clone())?;
    app.run()?;

    Ok(())
}

/// Dump mode logs to stderr; the interface logs only to `--log-file`.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else if cli.dump.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

fn open_source(cli: &Cli, config: &Config) -> anyhow::Result<Box<dyn RepoSource>> {
    if let Some(tree_json) = &cli.tree_json {
        return Ok(Box::new(JsonSource::new(
            tree_json.clone(),
            cli.stats_json.clone(),
        )));
    }

    if !cli.path.is_dir() {
        bail!("Path is not a directory: {}", cli.path.display());
    }
    let root = cli.path.canonicalize().unwrap_or_else(|_| cli.path.clone());

    if !cli.dir && GitSource::is_repo(&root) {
        info!(path = %root.display(), "using git source");
        return Ok(Box::new(GitSource::open(&root, &config.prefix)?));
    }

    info!(path = %root.display(), "using directory source");
    Ok(Box::new(DirSource::new(root, config.show_hidden)))
}

fn handle_dump(
    kind: DumpKind,
    source: &dyn RepoSource,
    config: &Config,
    search: Option<&str>,
) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(source, &config.prefix)
        .with_context(|| format!("Failed to load {}", source.describe()))?;

    let json = match kind {
        DumpKind::Tree => {
            let tree = filter_tree(&snapshot.tree, search.unwrap_or(""));
            serde_json::to_string_pretty(&tree)?
        }
        DumpKind::Heatmap => {
            let layout = layout_calendar_today(&snapshot.activity, config.window_days);
            serde_json::to_string_pretty(&layout)?
        }
        DumpKind::Stats => {
            let today = chrono::Local::now().date_naive();
            let dashboard = Dashboard::compute(
                &snapshot.items,
                &snapshot.activity,
                snapshot.difficulty,
                &snapshot.changes,
                &config.stats_options(),
                today,
            );
            serde_json::to_string_pretty(&dashboard)?
        }
    };

    println!("{}", json);
    Ok(())
}
