//! panerelay-debug-tail - transcript tailing debugging tool
//!
//! Tails a transcript the way the relay does (persisted byte offsets,
//! complete lines only) and prints the decoded messages as JSON.
//!
//! Defaults for the provider, poll interval, write mode, starting position
//! and database come from `config.toml`; flags override them.

use anyhow::{bail, Context, Result};
use clap::Parser;
use panerelay_core::ingest::{decode_batch, PollOutcome, SessionTailer, TailBatch};
use panerelay_core::{
    AgentMessage, AgentProvider, Config, Database, PendingToolMap, ProviderRegistry, WriteMode,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "panerelay-debug-tail")]
#[command(about = "Tail an agent transcript and print decoded messages")]
#[command(version)]
struct Args {
    /// Transcript file to tail (looked up by --session when omitted)
    file: Option<PathBuf>,

    /// Session id used for offsets and transcript lookup
    #[arg(short, long)]
    session: Option<String>,

    /// Provider whose transcript format to decode [default: providers.default]
    #[arg(short, long)]
    provider: Option<String>,

    /// Persist offsets in this database [default: state.database_path]
    #[arg(long, conflicts_with = "memory")]
    db: Option<PathBuf>,

    /// Keep offsets in memory only
    #[arg(long)]
    memory: bool,

    /// Start at the current end of the transcript [default: tailer.start_at_end]
    #[arg(long)]
    from_end: bool,

    /// Keep polling for new lines
    #[arg(short, long)]
    watch: bool,

    /// Poll interval in milliseconds, only with --watch [default: tailer.poll_interval_ms]
    #[arg(long)]
    poll: Option<u64>,

    /// Defer offset writes until shutdown [default: tailer.write_mode]
    #[arg(long)]
    deferred: bool,

    /// Log to the rolling file in the state directory instead of stderr
    #[arg(long)]
    log_file: bool,

    /// Compact JSON output (default: pretty)
    #[arg(long)]
    compact: bool,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long)]
    verbose: bool,
}

/// One poll's worth of output
#[derive(Serialize)]
struct BatchOutput<'a> {
    session_id: &'a str,
    outcome: PollOutcome,
    from_offset: u64,
    to_offset: u64,
    lines: usize,
    messages: &'a [AgentMessage],
    #[serde(skip_serializing_if = "PendingToolMap::is_empty")]
    pending_tools: &'a PendingToolMap,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load config")?;
    let registry = ProviderRegistry::with_builtin();
    config.validate(&registry).context("invalid config")?;

    let _log_guard = if args.log_file {
        panerelay_core::logging::init(&config.logging)
    } else {
        panerelay_core::logging::init_stderr(if args.verbose { "debug" } else { "warn" })
    }
    .context("failed to initialize logging")?;

    let provider_name = args.provider.as_deref().unwrap_or(&config.providers.default);
    let provider = registry
        .resolve(provider_name)
        .with_context(|| format!("cannot decode transcripts for {:?}", provider_name))?;

    if !provider.policy().has_structured_transcript() {
        bail!("provider {} does not write a structured transcript", provider.name());
    }

    let (session_id, path) = resolve_target(&args, provider.as_ref())?;
    tracing::info!(session_id = %session_id, path = %path.display(), "Tailing transcript");

    let db = open_database(&args, &config)?;

    let mode = if args.deferred {
        WriteMode::Deferred
    } else {
        config.tailer.write_mode
    };
    let mut tailer = SessionTailer::load(Arc::new(db), mode).context("failed to load sessions")?;

    let start_at_end = args.from_end || config.tailer.start_at_end;
    tailer
        .track_new(&session_id, &path, start_at_end)
        .context("failed to track transcript")?;

    if !args.watch {
        let batch = tailer.poll(&session_id).context("poll failed")?;
        emit(&args, provider.as_ref(), &batch, PendingToolMap::new())?;
        tailer.flush().context("failed to flush offsets")?;
        return Ok(());
    }

    let mut pending = PendingToolMap::new();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let poll_ms = args.poll.unwrap_or(config.tailer.poll_interval_ms);
    let poll_duration = Duration::from_millis(poll_ms);
    eprintln!(
        "Watching {} (poll every {}ms). Press Ctrl+C to stop.",
        path.display(),
        poll_ms
    );

    while running.load(Ordering::SeqCst) {
        let batch = tailer.poll(&session_id).context("poll failed")?;
        if !batch.is_empty() || batch.outcome != PollOutcome::Read {
            pending = emit(&args, provider.as_ref(), &batch, pending)?;
        }
        thread::sleep(poll_duration);
    }

    let flushed = tailer.flush().context("failed to flush offsets")?;
    tracing::info!(flushed, "Watch stopped");

    Ok(())
}

fn open_database(args: &Args, config: &Config) -> Result<Database> {
    if args.memory {
        let db = Database::open_in_memory()
            .context("failed to open in-memory database")?
            .with_directory_limits(config.state.directory_limits());
        db.migrate().context("failed to run database migrations")?;
        return Ok(db);
    }

    match &args.db {
        Some(db_path) => {
            let db = Database::open(db_path)
                .with_context(|| format!("failed to open database {}", db_path.display()))?
                .with_directory_limits(config.state.directory_limits());
            db.migrate().context("failed to run database migrations")?;
            Ok(db)
        }
        None => config.open_database().with_context(|| {
            format!(
                "failed to open database {}",
                config.state_database_path().display()
            )
        }),
    }
}

/// Work out which session and file to tail from the arguments.
fn resolve_target(args: &Args, provider: &dyn AgentProvider) -> Result<(String, PathBuf)> {
    match (&args.file, &args.session) {
        (Some(file), session) => {
            let session_id = session
                .clone()
                .or_else(|| provider.session_id_from_path(file))
                .context("cannot derive a session id from the file name; pass --session")?;
            Ok((session_id, file.clone()))
        }
        (None, Some(session)) => {
            let path = provider
                .find_transcript(session)
                .context("transcript discovery failed")?
                .with_context(|| format!("no {} transcript for session {}", provider.name(), session))?;
            Ok((session.clone(), path))
        }
        (None, None) => bail!("pass a transcript file or --session"),
    }
}

fn emit(
    args: &Args,
    provider: &dyn AgentProvider,
    batch: &TailBatch,
    pending: PendingToolMap,
) -> Result<PendingToolMap> {
    let (messages, pending) = decode_batch(provider, batch, pending);

    let output = BatchOutput {
        session_id: &batch.session_id,
        outcome: batch.outcome,
        from_offset: batch.from_offset,
        to_offset: batch.to_offset,
        lines: batch.lines.len(),
        messages: &messages,
        pending_tools: &pending,
    };

    let json = if args.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{}", json);

    Ok(pending)
}
