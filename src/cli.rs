use crate::agent::AgentClient;
use crate::dispatcher::{Dispatch, Dispatcher, Outcome, SkipReason};
use crate::memory_log::ResultLog;
use crate::model::{
    AgentConfig, AgentStatus, ConnectivityState, Contract, MemoryRecord, PageContext,
};
use crate::monitor::{self, ConnectivityMonitor};
use crate::notice::Notice;
use crate::text_summary;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// A failure whose details were already written to stdout.
///
/// In `--json` mode `main` prints nothing more for it, so stdout stays one document.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(pub String);

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "kinic-console",
    version,
    about = "Save pages to and search Kinic memory through the local desktop agent"
)]
pub struct Cli {
    /// Agent API flavour
    #[arg(long, value_enum, default_value_t = Contract::Desktop)]
    pub contract: Contract,

    /// Agent base URL (defaults to localhost:5007 for desktop, localhost:5006 for simple)
    #[arg(long)]
    pub base_url: Option<String>,

    /// How often the agent is probed
    #[arg(long, default_value = "10s")]
    pub poll_interval: humantime::Duration,

    /// Timeout for a single status probe
    #[arg(long, default_value = "3s")]
    pub probe_timeout: humantime::Duration,

    /// Timeout for save/search calls (the agent drives a real browser, so these are slow)
    #[arg(long, default_value = "120s")]
    pub request_timeout: humantime::Duration,

    /// URL of the page to save
    #[arg(long, default_value = "")]
    pub page_url: String,

    /// Title of the page to save
    #[arg(long, default_value = "")]
    pub page_title: String,

    /// Text content of the page to save (first 1000 characters are sent)
    #[arg(long, conflicts_with = "page_content_file")]
    pub page_content: Option<String>,

    /// Read the page content from a file instead
    #[arg(long)]
    pub page_content_file: Option<std::path::PathBuf>,

    /// Print JSON instead of text (one-shot commands only)
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log file for the interactive UI (defaults to the user data directory)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Probe the agent once and report connectivity
    Status {
        /// Keep probing at the poll interval until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Save the configured page to memory
    Save,
    /// Search saved memory and print the extracted answer
    Search {
        /// Query text; multiple words are joined with spaces
        #[arg(required = true)]
        query: Vec<String>,
    },
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.command.is_none() {
        return Err(anyhow::anyhow!(
            "--json needs a command (status, save or search)."
        ));
    }

    let interactive = args.command.is_none();
    let log_path = crate::logging::init(&args, interactive)?;
    let cfg = build_config(&args)?;
    tracing::info!(
        base_url = %cfg.base_url,
        contract = ?cfg.contract,
        poll_interval = ?cfg.poll_interval,
        "starting"
    );

    let Some(command) = args.command.clone() else {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg, log_path).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            let _ = log_path;
            return Err(anyhow::anyhow!(
                "built without the interactive UI; use a command (status, save or search)"
            ));
        }
    };

    match command {
        Command::Status { watch: false } => run_status(&args, &cfg).await,
        Command::Status { watch: true } => run_watch(&args, &cfg).await,
        Command::Save => run_save(&args, &cfg).await,
        Command::Search { query } => run_search(&args, &cfg, &query.join(" ")).await,
    }
}

/// Build an `AgentConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<AgentConfig> {
    let content = match (&args.page_content, &args.page_content_file) {
        (Some(c), _) => c.clone(),
        (None, Some(p)) => std::fs::read_to_string(p)
            .with_context(|| format!("read page content from {}", p.display()))?,
        (None, None) => String::new(),
    };
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| args.contract.default_base_url().to_string());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(anyhow::anyhow!(
            "--base-url must start with http:// or https:// (got {base_url})"
        ));
    }

    for (flag, value) in [
        ("--poll-interval", &args.poll_interval),
        ("--probe-timeout", &args.probe_timeout),
        ("--request-timeout", &args.request_timeout),
    ] {
        if value.is_zero() {
            anyhow::bail!("{flag} must be greater than zero");
        }
    }

    Ok(AgentConfig {
        base_url,
        contract: args.contract,
        poll_interval: Duration::from(args.poll_interval),
        probe_timeout: Duration::from(args.probe_timeout),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("kinic-console/{}", env!("CARGO_PKG_VERSION")),
        page: PageContext::new(args.page_url.clone(), args.page_title.clone(), content),
    })
}

fn emit_status(
    tx: &mpsc::UnboundedSender<OutputLine>,
    json: bool,
    status: &AgentStatus,
    base_url: &str,
) -> Result<()> {
    if json {
        let _ = tx.send(OutputLine::Stdout(serde_json::to_string(status)?));
    } else {
        for line in text_summary::build_status_summary(status, base_url).lines {
            let _ = tx.send(OutputLine::Stdout(line));
        }
    }
    Ok(())
}

fn emit_notice(tx: &mpsc::UnboundedSender<OutputLine>, json: bool, notice: &Notice) -> Result<()> {
    if json {
        let _ = tx.send(OutputLine::Stdout(serde_json::to_string_pretty(notice)?));
    } else {
        let route = |line: String| {
            if notice.is_error() {
                OutputLine::Stderr(line)
            } else {
                OutputLine::Stdout(line)
            }
        };
        for line in text_summary::build_notice_summary(notice).lines {
            let _ = tx.send(route(line));
        }
    }
    Ok(())
}

/// Print a failure notice, then fail without printing it again.
fn emit_failure(
    tx: &mpsc::UnboundedSender<OutputLine>,
    json: bool,
    notice: &Notice,
) -> Result<()> {
    emit_notice(tx, json, notice)?;
    Err(Reported(notice.title.clone()).into())
}

async fn finish(
    tx: mpsc::UnboundedSender<OutputLine>,
    handle: tokio::task::JoinHandle<()>,
) {
    drop(tx);
    let _ = handle.await;
}

async fn run_status(args: &Cli, cfg: &AgentConfig) -> Result<()> {
    let client = AgentClient::new(cfg)?;
    let status = monitor::probe_once(&client).await;
    let (out_tx, out_handle) = spawn_output_writer();
    emit_status(&out_tx, args.json, &status, client.base_url())?;
    finish(out_tx, out_handle).await;

    if status.state != ConnectivityState::Connected {
        return Err(Reported(format!("agent at {} is not ready", client.base_url())).into());
    }
    Ok(())
}

async fn run_watch(args: &Cli, cfg: &AgentConfig) -> Result<()> {
    let client = AgentClient::new(cfg)?;
    let base_url = client.base_url().to_string();
    let monitor = ConnectivityMonitor::new(client, cfg.poll_interval);
    let mut status_rx = monitor.subscribe();
    let mut handle = monitor.start();
    let (out_tx, out_handle) = spawn_output_writer();

    let res = loop {
        tokio::select! {
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let status = status_rx.borrow_and_update().clone();
                if let Err(e) = emit_status(&out_tx, args.json, &status, &base_url) {
                    break Err(e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break Ok(());
            }
        }
    };

    handle.stop();
    let last = handle.status();
    tracing::debug!(state = ?last.state, "watch finished");
    finish(out_tx, out_handle).await;
    res
}

async fn run_save(args: &Cli, cfg: &AgentConfig) -> Result<()> {
    let client = AgentClient::new(cfg)?;
    let dispatcher = Dispatcher::new(client, ResultLog::new());
    let (out_tx, out_handle) = spawn_output_writer();

    let dispatch = dispatcher.save_page().await;
    let res = match &dispatch {
        Dispatch::Settled(Outcome::Saved(notice)) => emit_notice(&out_tx, args.json, notice),
        Dispatch::Settled(Outcome::Failed(notice)) => emit_failure(&out_tx, args.json, notice),
        other => Err(unexpected_dispatch(other)),
    };
    finish(out_tx, out_handle).await;
    res
}

async fn run_search(args: &Cli, cfg: &AgentConfig, query: &str) -> Result<()> {
    let client = AgentClient::new(cfg)?;
    let dispatcher = Dispatcher::new(client, ResultLog::new());
    let (out_tx, out_handle) = spawn_output_writer();

    let dispatch = dispatcher.search_memory(query).await;
    let res = match &dispatch {
        Dispatch::Settled(Outcome::Recorded(record)) => emit_record(&out_tx, args.json, record),
        Dispatch::Settled(Outcome::Failed(notice)) => emit_failure(&out_tx, args.json, notice),
        other => Err(unexpected_dispatch(other)),
    };
    finish(out_tx, out_handle).await;
    res
}

fn emit_record(
    tx: &mpsc::UnboundedSender<OutputLine>,
    json: bool,
    record: &MemoryRecord,
) -> Result<()> {
    if json {
        let _ = tx.send(OutputLine::Stdout(serde_json::to_string_pretty(record)?));
    } else {
        for line in text_summary::build_record_summary(record).lines {
            let _ = tx.send(OutputLine::Stdout(line));
        }
    }
    Ok(())
}

fn unexpected_dispatch(dispatch: &Dispatch) -> anyhow::Error {
    match dispatch {
        Dispatch::Skipped(SkipReason::EmptyQuery) => anyhow::anyhow!("query is empty"),
        Dispatch::Skipped(SkipReason::Busy(op)) => {
            anyhow::anyhow!("{} already in progress", op.verb().to_lowercase())
        }
        other => anyhow::anyhow!("operation did not complete: {other:?}"),
    }
}
