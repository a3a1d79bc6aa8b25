use crate::model::{AppEvent, RunConfig};
use crate::orchestrator::{run_controller, ProcessedRun, UiCommand};
use crate::workflow::{Workflow, WorkflowState};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

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
    name = "veritrust-cli",
    version,
    about = "Check a video for deepfake manipulation with a remote inference service"
)]
pub struct Cli {
    /// Video file to analyze
    pub file: Option<PathBuf>,

    /// Base URL of the inference service
    #[arg(long, env = "VERITRUST_API_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Query the service health endpoint and exit
    #[arg(long)]
    pub health: bool,

    /// Look up the stored verdict for a video hash and exit
    #[arg(long, value_name = "VIDEO_HASH")]
    pub lookup: Option<String>,

    /// Check the blockchain record for a transaction hash and exit
    #[arg(long, value_name = "TX_HASH")]
    pub tx: Option<String>,

    /// List verdicts stored by the service and exit
    #[arg(long)]
    pub server_history: bool,

    /// Page size for --server-history
    #[arg(long, default_value_t = 50)]
    pub limit: u32,

    /// Entries to skip for --server-history
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Print service-wide verdict counts and exit
    #[arg(long)]
    pub stats: bool,

    /// Give up on an analysis after this long
    #[arg(long, default_value = "120s")]
    pub timeout: humantime::Duration,

    /// Do not ask the service for per-frame evidence
    #[arg(long)]
    pub no_evidence: bool,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,

    /// Export the verdict record as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write evidence frame images into this directory
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    /// Submit the file given on the command line as soon as the TUI starts
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub submit_on_launch: bool,
}

/// One-shot request against the service's read-only endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceQuery {
    Health,
    Lookup(String),
    Tx(String),
    History { limit: u32, offset: u32 },
    Stats,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !(self.json || self.text) && self.query_count() == 0
    }

    fn query_count(&self) -> usize {
        [
            self.health,
            self.lookup.is_some(),
            self.tx.is_some(),
            self.server_history,
            self.stats,
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// The service query requested on the command line, if any.
    pub fn service_query(&self) -> Result<Option<ServiceQuery>> {
        if self.query_count() > 1 {
            return Err(anyhow::anyhow!(
                "--health, --lookup, --tx, --server-history and --stats are mutually exclusive"
            ));
        }
        let query = if self.health {
            Some(ServiceQuery::Health)
        } else if let Some(hash) = self.lookup.as_deref() {
            Some(ServiceQuery::Lookup(non_blank(hash, "--lookup")?))
        } else if let Some(hash) = self.tx.as_deref() {
            Some(ServiceQuery::Tx(non_blank(hash, "--tx")?))
        } else if self.server_history {
            Some(ServiceQuery::History {
                limit: self.limit,
                offset: self.offset,
            })
        } else if self.stats {
            Some(ServiceQuery::Stats)
        } else {
            None
        };
        Ok(query)
    }
}

fn non_blank(value: &str, flag: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow::anyhow!("{flag} needs a non-empty hash"));
    }
    Ok(value.to_string())
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if let Some(query) = args.service_query()? {
        return run_query(&args, query).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args).await;
        }
    }

    run_once(args).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        base_url: args.base_url.clone(),
        timeout: Duration::from(args.timeout),
        include_evidence: !args.no_evidence,
        user_agent: format!("veritrust-cli/{}", env!("CARGO_PKG_VERSION")),
        auto_save: args.auto_save,
        export_json: args.export_json.clone(),
        frames_dir: args.frames_dir.clone(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

async fn run_query(args: &Cli, query: ServiceQuery) -> Result<()> {
    let cfg = build_config(args);
    let client = crate::engine::AnalysisClient::new(&cfg)?;
    tracing::debug!(?query, base_url = %client.base_url, "service query");
    match query {
        ServiceQuery::Health => {
            let health = client.health().await?;
            if args.json {
                return print_json(&health);
            }
            println!("Service: {}", cfg.base_url);
            println!("Status: {}", health.status);
            if let Some(model) = health.model.as_deref() {
                println!("Model: {model}");
            }
            if let Some(db) = health.database.as_deref() {
                println!("Database: {db}");
            }
            if let Some(chain) = health.blockchain_connected {
                println!(
                    "Blockchain: {}",
                    if chain { "connected" } else { "disconnected" }
                );
            }
        }
        ServiceQuery::Lookup(hash) => {
            let analysis = client.lookup(&hash).await?;
            if args.json {
                return print_json(&analysis);
            }
            print_lines(&crate::text_summary::stored_analysis_lines(&analysis));
        }
        ServiceQuery::Tx(hash) => {
            let status = client.tx_status(&hash).await?;
            if args.json {
                return print_json(&status);
            }
            print_lines(&crate::text_summary::tx_status_lines(&status));
        }
        ServiceQuery::History { limit, offset } => {
            let page = client.server_history(limit, offset).await?;
            if args.json {
                return print_json(&page);
            }
            print_lines(&crate::text_summary::history_page_lines(&page));
        }
        ServiceQuery::Stats => {
            let stats = client.stats().await?;
            if args.json {
                return print_json(&stats);
            }
            print_lines(&crate::text_summary::stats_lines(&stats));
        }
    }
    Ok(())
}

/// Run one select/submit cycle through the controller and print the outcome.
async fn run_once(args: Cli) -> Result<()> {
    let file = args
        .file
        .clone()
        .context("a video file is required with --text or --json")?;
    let cfg = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let ctrl_cfg = cfg.clone();
    let handle = tokio::spawn(async move { run_controller(&ctrl_cfg, evt_tx, cmd_rx).await });

    let _ = cmd_tx.send(UiCommand::Open(file));
    let _ = cmd_tx.send(UiCommand::Submit);

    let mut last: Option<Workflow> = None;
    let mut processed: Option<ProcessedRun> = None;
    while let Some(ev) = evt_rx.recv().await {
        match ev {
            AppEvent::Info(info) => {
                if args.text {
                    let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
                }
            }
            AppEvent::Processed(p) => {
                processed = Some(*p);
                break;
            }
            AppEvent::Workflow(wf) => {
                let done = wf.notice().is_some() || wf.error().is_some();
                last = Some(*wf);
                if done {
                    break;
                }
            }
        }
    }
    let _ = cmd_tx.send(UiCommand::Quit);
    handle.await.context("controller task failed")??;

    let outcome = report(&args, last.as_ref(), processed.as_ref(), &out_tx);
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

fn report(
    args: &Cli,
    last: Option<&Workflow>,
    processed: Option<&ProcessedRun>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let wf = last.context("controller stopped before producing a result")?;
    if let Some(notice) = wf.notice() {
        return Err(anyhow::anyhow!("{notice}"));
    }
    match wf.state() {
        WorkflowState::Failed { error, .. } => Err(anyhow::anyhow!("{error}")),
        WorkflowState::Resulted {
            result, navigator, ..
        } => {
            if args.json {
                let processed = processed.context("result was not processed")?;
                let summary = crate::text_summary::build_json_summary(result, processed);
                let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&summary)?));
            } else {
                let summary =
                    crate::text_summary::build_text_summary(result, navigator, processed);
                for line in summary.lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            if let Some(p) = processed {
                for msg in &p.messages {
                    let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
                }
            }
            Ok(())
        }
        other => Err(anyhow::anyhow!(
            "workflow ended in unexpected state {}",
            other.label()
        )),
    }
}
