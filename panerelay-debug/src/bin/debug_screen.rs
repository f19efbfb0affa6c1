//! panerelay-debug-screen - pane capture debugging tool
//!
//! Runs a provider's screen parser over a captured pane and prints the
//! resulting status update as JSON (`null` when nothing is recognized).

use anyhow::{Context, Result};
use clap::Parser;
use panerelay_core::screen;
use panerelay_core::{Config, ProviderRegistry, StatusUpdate};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panerelay-debug-screen")]
#[command(about = "Classify a captured terminal pane")]
#[command(version)]
struct Args {
    /// Captured pane text (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Provider whose screen parser to use [default: providers.default]
    #[arg(short, long)]
    provider: Option<String>,

    /// Also show the pane with input chrome stripped
    #[arg(long)]
    strip_chrome: bool,

    /// Extract the output of a `!` shell command instead of classifying
    #[arg(long, value_name = "COMMAND")]
    command_output: Option<String>,

    /// Compact JSON output (default: pretty)
    #[arg(long)]
    compact: bool,
}

#[derive(Serialize)]
struct ScreenOutput {
    provider: &'static str,
    interactive: bool,
    status: Option<StatusUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stripped: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard =
        panerelay_core::logging::init_stderr("warn").context("failed to initialize logging")?;

    let text = read_input(args.file.as_ref())?;

    if let Some(command) = &args.command_output {
        let output = screen::extract_command_output(&text, command);
        print_json(&output, args.compact)?;
        return Ok(());
    }

    let config = Config::load().context("failed to load config")?;
    let registry = ProviderRegistry::with_builtin();
    config.validate(&registry).context("invalid config")?;

    let provider_name = args.provider.as_deref().unwrap_or(&config.providers.default);
    let provider = registry
        .resolve(provider_name)
        .with_context(|| format!("cannot parse screens for {:?}", provider_name))?;

    let output = ScreenOutput {
        provider: provider.name(),
        interactive: provider.is_interactive_ui(&text),
        status: provider.parse_screen(&text),
        stripped: args.strip_chrome.then(|| screen::strip_pane_chrome(&text)),
    };

    print_json(&output, args.compact)
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}
