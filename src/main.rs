//! Trev CLI - inspect recorded NDJSON traces

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use regex::Regex;

use trev::config::CONFIG_FILE;
use trev::event::{list_traces, load_trace, TRACE_EXTENSION};
use trev::{EventStore, FixSuggestion, IndexedNode, NodeIndex, TrevConfig, TrevError, TrevKind};

#[derive(Parser)]
#[command(name = "trev")]
#[command(about = "Trev - execution trace recorder and query engine")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show event counts by kind, node and node type
    Facets {
        /// Trace file, or trace name inside the trace directory
        trace: String,

        /// Rows per table (defaults to config `facet_limit`)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Resolve every event reference and report inconsistencies
    Check {
        /// Trace file, or trace name inside the trace directory
        trace: String,
    },

    /// Print events indented by call depth
    Events {
        /// Trace file, or trace name inside the trace directory
        trace: String,

        /// Only events of this kind (expression, call_start, ...)
        #[arg(short, long)]
        kind: Option<TrevKind>,

        /// Only events in this unit
        #[arg(short, long)]
        unit: Option<String>,
    },

    /// Find nodes by code text, node type or regex over their code
    Scan {
        /// Trace file, or trace name inside the trace directory
        trace: String,

        /// Exact code text to match (repeatable)
        #[arg(short, long)]
        code: Vec<String>,

        /// Node type to match
        #[arg(short = 't', long = "type")]
        node_type: Option<String>,

        /// Regex matched against node code
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// List trace files in the trace directory
    Ls,
}

fn main() {
    let cli = Cli::parse();

    let config = match TrevConfig::load(&cli.config) {
        Ok(config) => config.with_env(),
        Err(e) => exit_with(&e.into()),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let result = match cli.command {
        Commands::Facets { trace, limit } => {
            show_facets(&config, &trace, limit.unwrap_or(config.facet_limit))
        }
        Commands::Check { trace } => check_trace(&config, &trace),
        Commands::Events { trace, kind, unit } => show_events(&config, &trace, kind, unit),
        Commands::Scan {
            trace,
            code,
            node_type,
            pattern,
        } => scan_nodes(&config, &trace, &code, node_type, pattern),
        Commands::Ls => list(&config),
    };

    if let Err(e) = result {
        exit_with(&e);
    }
}

fn exit_with(e: &anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), e);
    if let Some(suggestion) = e
        .downcast_ref::<TrevError>()
        .and_then(|err| err.fix_suggestion())
    {
        eprintln!("  {} {}", "Fix:".yellow(), suggestion);
    }
    std::process::exit(1);
}

/// A path that exists wins; otherwise a bare name is looked up in the trace dir
fn trace_path(config: &TrevConfig, trace: &str) -> PathBuf {
    let direct = Path::new(trace);
    if direct.exists() {
        return direct.to_path_buf();
    }
    config
        .trace_dir
        .join(format!("{}.{}", trace, TRACE_EXTENSION))
}

fn open(config: &TrevConfig, trace: &str) -> anyhow::Result<EventStore> {
    let path = trace_path(config, trace);
    let store =
        load_trace(&path).with_context(|| format!("Failed to load trace {}", path.display()))?;
    tracing::info!(path = %path.display(), events = store.len(), "Loaded trace");
    Ok(store)
}

fn show_facets(config: &TrevConfig, trace: &str, limit: usize) -> anyhow::Result<()> {
    let store = open(config, trace)?;
    let facets = store.get_facets();
    let index = store.index();

    println!("{} {} events", "Facets:".cyan().bold(), facets.total());

    println!("\n{}", "By kind".bold());
    for (kind, count) in &facets.by_kind {
        println!("  {:>8}  {}", count, kind);
    }

    println!("\n{}", "By node type".bold());
    for (node_type, count) in facets.top_types(limit) {
        println!("  {:>8}  {}", count, node_type);
    }

    println!("\n{}", "By node".bold());
    for (key, count) in facets.top_nodes(limit) {
        let code = index
            .lookup_by_key(key.as_str())
            .map(|node| code_snippet(index, node))
            .unwrap_or_default();
        println!("  {:>8}  {}  {}", count, key.as_str().dimmed(), code);
    }

    if facets.skipped > 0 {
        println!(
            "\n{} {} event(s) reference unknown nodes",
            "⚠".yellow(),
            facets.skipped
        );
    }
    Ok(())
}

fn check_trace(config: &TrevConfig, trace: &str) -> anyhow::Result<()> {
    let store = open(config, trace)?;
    let resolved = store.with_resolved_references()?;
    let max_depth = resolved
        .resolved()
        .into_iter()
        .flatten()
        .map(|r| r.depth())
        .max()
        .unwrap_or(0);

    println!("{} Trace '{}' is consistent", "✓".green(), trace);
    println!("  Units: {}", store.index().unit_count());
    println!("  Nodes: {}", store.index().node_count());
    println!("  Events: {}", store.len());
    println!("  Max depth: {}", max_depth);
    Ok(())
}

fn show_events(
    config: &TrevConfig,
    trace: &str,
    kind: Option<TrevKind>,
    unit: Option<String>,
) -> anyhow::Result<()> {
    let store = open(config, trace)?.with_resolved_references()?;
    let selected = store.filter(|e| {
        kind.map_or(true, |k| e.kind == k) && unit.as_deref().map_or(true, |u| &*e.unit_id == u)
    });

    for event in selected.resolved().into_iter().flatten() {
        let indent = "  ".repeat(event.depth());
        let code = code_snippet(store.index(), event.node);
        println!(
            "{:>6} {}{} {} {} {}",
            event.trev.id.to_string().dimmed(),
            indent,
            color_kind(event.trev.kind),
            event.node.node_type,
            code,
            event.trev.data.to_string().dimmed()
        );
    }
    Ok(())
}

fn scan_nodes(
    config: &TrevConfig,
    trace: &str,
    codes: &[String],
    node_type: Option<String>,
    pattern: Option<String>,
) -> anyhow::Result<()> {
    let store = open(config, trace)?;
    let index = store.index();
    let regex = pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --pattern")?;

    let matches = index.scan(|node| {
        if node_type.as_deref().is_some_and(|t| node.node_type != t) {
            return false;
        }
        let code = index.code_of(node).ok().flatten();
        if !codes.is_empty() && !code.is_some_and(|c| codes.iter().any(|want| want == c)) {
            return false;
        }
        match &regex {
            Some(re) => code.is_some_and(|c| re.is_match(c)),
            None => true,
        }
    });

    let facets = store.get_facets();
    for node in &matches {
        let hits = facets.by_node.get(&node.key).copied().unwrap_or(0);
        println!(
            "{}  {}  {}  {}",
            node.key.as_str().cyan(),
            node.node_type,
            code_snippet(index, node),
            format!("{} event(s)", hits).dimmed()
        );
    }
    println!("{} {} node(s) matched", "→".cyan(), matches.len());
    Ok(())
}

fn list(config: &TrevConfig) -> anyhow::Result<()> {
    let traces = list_traces(&config.trace_dir)?;
    if traces.is_empty() {
        println!("No traces in {}", config.trace_dir.display());
        return Ok(());
    }
    for info in traces {
        println!(
            "{}  {}",
            info.name.bold(),
            format!("{} bytes", info.size_bytes).dimmed()
        );
    }
    Ok(())
}

/// First line of a node's code, quoted; empty when the node has none
fn code_snippet(index: &NodeIndex, node: &IndexedNode) -> String {
    match index.code_of(node) {
        Ok(Some(code)) => {
            let line = code.lines().next().unwrap_or_default();
            format!("`{}`", line)
        }
        Ok(None) => String::new(),
        Err(e) => {
            tracing::debug!(error = %e, key = %node.key, "No code for node");
            String::new()
        }
    }
}

fn color_kind(kind: TrevKind) -> colored::ColoredString {
    match kind {
        TrevKind::Expression => kind.as_str().normal(),
        TrevKind::CallStart | TrevKind::Resume => kind.as_str().green(),
        TrevKind::CallReturn => kind.as_str().blue(),
        TrevKind::CallThrow => kind.as_str().red(),
        TrevKind::Suspend => kind.as_str().yellow(),
    }
}
