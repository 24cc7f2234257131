//! Recstream CLI: the `recstream` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RECSTREAM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Put {
            id,
            id_type,
            object_type,
            payload,
            tags,
            existing,
            retain,
            stream,
        } => commands::put::run(commands::put::Args {
            id,
            id_type,
            object_type,
            payload,
            tags,
            existing,
            retain,
            stream,
        }),

        Commands::Records {
            ids,
            id_type,
            object_types,
            version_match,
            tags,
            tag_match,
            order,
            latest,
            stream,
        } => commands::records::run(commands::records::Args {
            ids,
            id_type,
            object_types,
            version_match,
            tags,
            tag_match,
            order,
            latest,
            stream,
        }),

        Commands::Prune {
            before_id,
            before_timestamp,
            details,
            stream,
        } => commands::prune::run(before_id, before_timestamp, details, stream),

        Commands::Handle { command } => commands::handle::run(command),

        Commands::Mutex {
            id,
            details,
            poll_ms,
            stream,
            command,
        } => commands::mutex::run(id, details, poll_ms, stream, command),
    }
}
