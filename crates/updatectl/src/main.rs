//! updatectl - verify and fetch a software update from the command line
//!
//! Thin front-end over the update_common driver: parses arguments, loads
//! the maintainer key allow-list, starts the worker and renders its
//! events until a terminal state is reached.
//!
//! Exit code 0 when the pipeline ends in a good terminal state
//! (up to date, only old versions announced, or a verified update on
//! disk), 1 otherwise.

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use update_common::{
    load_trusted_keys, Collaborators, TriState, UpdateEvent, Updater, UpdaterConfig,
};

#[derive(Parser, Debug)]
#[command(name = "updatectl", version, about = "Secure update verifier and fetcher")]
struct Args {
    /// Release stream to track: cli or gui
    #[arg(long, default_value = "cli", value_parser = ["cli", "gui"])]
    software: String,

    /// Version currently installed; empty means any announced version is
    /// newer
    #[arg(long, default_value = "")]
    current_version: String,

    /// Override the autodetected buildtag
    #[arg(long)]
    buildtag: Option<String>,

    /// Directory of ASCII-armored maintainer public keys (*.asc)
    #[arg(long)]
    keys: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "updatectl=warn,update_common=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
        .init();

    let args = Args::parse();

    let trusted_keys = load_trusted_keys(&args.keys)
        .with_context(|| format!("Failed to load maintainer keys from {}", args.keys.display()))?;
    if trusted_keys.is_empty() {
        anyhow::bail!("No maintainer keys found in {}", args.keys.display());
    }

    let mut config = UpdaterConfig {
        current_version: args.current_version.clone(),
        trusted_keys,
        ..UpdaterConfig::default()
    };
    if let Some(buildtag) = &args.buildtag {
        config.buildtag = buildtag.clone();
    }

    println!(
        "{} updatectl v{} ({} / {})",
        "[*]".bold(),
        env!("CARGO_PKG_VERSION"),
        args.software,
        config.buildtag
    );

    let updater = Updater::new(config, Collaborators::production());
    let mut events = updater.subscribe();
    let status = updater.status();

    let mut selected = false;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event {
            UpdateEvent::SelectingChanged(true) if !selected => {
                // the worker is initialized; pick the release stream
                selected = true;
                updater.select(&args.software);
            }
            UpdateEvent::StateChanged(name) => {
                println!("{} {}", "==>".bold(), name);
                if status.state().is_terminal() {
                    break;
                }
            }
            UpdateEvent::Message(msg) => {
                println!("    {}", msg.dimmed());
            }
            UpdateEvent::DownloadProgress { received, total } => {
                render_progress(received, total);
            }
            UpdateEvent::DownloadFinished(_) => {
                println!();
            }
            UpdateEvent::ValidUpdateReady(path) => {
                println!("{} update ready: {}", "[+]".green().bold(), path.display());
            }
            _ => {}
        }
    }

    let outcome = status.state_outcome();
    let state = status.state();
    updater.shutdown().await;

    match outcome {
        TriState::True => {
            println!("{} {}", "[+]".green().bold(), state.display_name());
            Ok(())
        }
        _ => {
            println!("{} {}", "[!]".red().bold(), state.display_name());
            std::process::exit(1);
        }
    }
}

fn render_progress(received: u64, total: Option<u64>) {
    match total {
        Some(total) if total > 0 => {
            let percent = received * 100 / total;
            print!("\r    downloading... {percent}% ({received}/{total} bytes)");
        }
        _ => {
            print!("\r    downloading... {received} bytes");
        }
    }
    let _ = std::io::stdout().flush();
}
