// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callrelay - call-signaling relay.
//!
//! This is the binary entry point for the Callrelay service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Callrelay - call-signaling relay.
#[derive(Parser, Debug)]
#[command(name = "callrelay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// End every call that has rung past the ring timeout, then exit.
    Sweep,
    /// Maintain the local profile directory.
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Validate configuration and storage, then exit.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// Create or replace a user's display profile.
    Set {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Print a user's display profile.
    Show {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => callrelay_config::load_and_validate_path(path),
        None => callrelay_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            callrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Sweep) => admin::run_sweep(&config).await,
        Some(Commands::Profile { action }) => match action {
            ProfileCommands::Set {
                id,
                name,
                username,
                avatar_url,
            } => admin::run_profile_set(&config, id, name, username, avatar_url).await,
            ProfileCommands::Show { id } => admin::run_profile_show(&config, &id).await,
        },
        Some(Commands::Check { plain }) => check::run_check(&config, plain).await,
        None => {
            println!("callrelay: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
