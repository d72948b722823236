//! Deskplan CLI: natural-language desktop requests to guarded automation plans.

use clap::Parser;
use deskplan::cli::GlobalOptions;
use deskplan::core::config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "deskplan",
    version,
    about = "Natural-language desktop requests to bounded, auditable UI-automation plans"
)]
struct Cli {
    /// Path to deskplan.yaml
    #[arg(long, global = true, default_value = config::CONFIG_FILE)]
    config: PathBuf,

    /// Verbose logging and notification tracing
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: deskplan::cli::Commands,
}

/// `RUST_LOG` wins; otherwise `debug` with --debug or `debug: true`, else `warn`.
fn init_tracing(debug: bool) {
    let fallback = if debug { "deskplan=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    let config_debug = config::load_config(&cli.config)
        .map(|c| c.debug)
        .unwrap_or(false);
    init_tracing(cli.debug || config_debug);

    let opts = GlobalOptions {
        config: cli.config,
        debug: cli.debug,
    };
    if let Err(e) = deskplan::cli::dispatch(cli.command, &opts) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
