//! Schoolwatch - An operator console for school emergency alerts.
//!
//! This is the main entry point of schoolwatch, which watches the emergencies
//! reported to a hosted store and raises an audible and visual alarm on the
//! operator's terminal.
//!
//! # Overview
//!
//! Staff report emergencies about students into the store. Schoolwatch keeps the
//! list of unresolved emergencies up to date by polling the store and, when
//! enabled, by following its change feed. The first emergency after a quiet
//! period starts the alarm sound and shows a desktop notification; the alarm runs
//! until every emergency is resolved or the operator silences it.
//!
//! # Features
//!
//! - **Edge-Triggered Alarm**: The sound starts once per quiet-to-active transition
//! - **Push and Poll**: The change feed speeds things up, polling stays the source of truth
//! - **Acknowledgement**: Resolve an emergency in the store from the console
//! - **Respond Screen**: Work one emergency with the alarm silenced
//! - **Session Persistence**: The login flag survives restarts
//! - **YAML Configuration**: Simple configuration file format with environment variable support
//!
//! # Configuration
//!
//! ```yaml
//! store:
//!   url: "https://project.example.co"
//!   api_key: "anon-key"
//!   polling_interval: 10
//!
//! auth:
//!   password: "shared-password"
//! ```
//!
//! Any value can be overridden with a `SCHOOLWATCH_` environment variable, for
//! example `SCHOOLWATCH_AUTH__PASSWORD`.
//!
//! # Usage
//!
//! ```bash
//! schoolwatch --config config.yaml --data ./schoolwatch-data
//! ```
//!
//! # Console Commands
//!
//! - `!watch help` - Display help information
//! - `!watch status` - Show the alarm banner
//! - `!watch emergencies` - List the active emergencies
//! - `!watch ack <id>` - Resolve an emergency
//! - `!watch respond <id>` - Work an emergency with the alarm silenced
//! - `!watch stop` - Silence the alarm
//! - `!watch dismiss` - Clear the display until the next refresh
//! - `!watch goto <screen>` - Switch screen
//! - `!watch login <password>` / `!watch logout`
//! - `!watch stats` - Show the statistics
//!
//! # Architecture
//!
//! - [`alerts`] - Alert snapshot, screens, alarm sound, notifications and dispatcher
//! - [`commands`] - Command parsing and execution
//! - [`config`] - YAML configuration with environment variable support
//! - [`monitor`] - Console loop wiring everything together
//! - [`session`] - Persisted login flag
//! - [`store`] - Hosted store client, alert source and change feed
//! - [`widgets`] - Banner, panel and detail rendering
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use tokio::task::LocalSet;

use crate::{config::Config, monitor::Monitor};

mod alerts;
mod commands;
mod config;
mod monitor;
mod session;
mod store;
mod widgets;

/// Command-line arguments of schoolwatch.
///
/// # Examples
///
/// ```bash
/// schoolwatch --config config.yaml --data ./schoolwatch-data
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// See the [`config`] module for the expected format.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for storing persistent data.
    ///
    /// This directory will contain `session.json`, the persisted login flag.
    #[arg(short, long)]
    data: PathBuf,
}

/// Main entry point of schoolwatch.
///
/// 1. **Logging Setup**: `info` level by default, overridable with `RUST_LOG`
/// 2. **Argument Parsing**: Parses command-line arguments using `clap`
/// 3. **Configuration Loading**: Reads the YAML file merged with the environment
/// 4. **Console**: Runs the [`Monitor`] on a single-threaded runtime until end of
///    input or Ctrl-C
///
/// Configuration and initialization errors are logged and end the process
/// without panicking.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting schoolwatch {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    // Every task shares state through Rc, so they all live on this LocalSet
    LocalSet::new()
        .run_until(async move {
            let monitor = match Monitor::new(config, &args.data).await {
                Ok(m) => m,
                Err(e) => {
                    error!("Failed to initialize monitor: {}", e);
                    return;
                }
            };
            monitor.start().await;
        })
        .await;

    info!("schoolwatch stopped");
}
