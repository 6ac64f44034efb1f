// SPDX-FileCopyrightText: 2026 Mirra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mirra - continuous channel-to-channel message replication.
//!
//! This is the binary entry point for the Mirra agent.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod backfill;
mod rules;
mod serve;
mod status;
mod transport;

use clap::{Parser, Subcommand};

/// Mirra - continuous channel-to-channel message replication.
#[derive(Parser, Debug)]
#[command(name = "mirra", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the replication agent: live listener plus continuous backfills.
    Serve,
    /// Replicate a source channel's history into a target, then exit.
    Backfill {
        /// Source channel (id, @handle, or t.me link).
        #[arg(long)]
        source: String,
        /// Target channel (id, @handle, or t.me link).
        #[arg(long)]
        target: String,
        /// Start from this source message id instead of the saved cursor.
        #[arg(long)]
        from: Option<i64>,
    },
    /// Manage replication rules.
    Rules {
        #[command(subcommand)]
        action: rules::RulesAction,
    },
    /// Show per-pair replication statistics.
    Status {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match mirra_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            mirra_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(&config).await,
        Some(Commands::Backfill {
            source,
            target,
            from,
        }) => backfill::run_backfill(&config, &source, &target, from).await,
        Some(Commands::Rules { action }) => rules::run_rules(&config, action).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("mirra: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("mirra: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = mirra_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "mirra");
    }
}
