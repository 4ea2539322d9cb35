//! boson-admin CLI: log in, then manage members and job postings.
//!
//! Settings come from `packages/conf/boson-admin.yaml` under `PRJ_ROOT`, then
//! `boson-admin/settings.yaml` under the config home (`--conf` overrides it).
//!
//! Logging: set `RUST_LOG=boson_admin_client=debug` (or `warn`, `info`) to see client logs on stderr.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use boson_admin::{load_runtime_settings, set_config_home_override};

use crate::cli::Cli;
use crate::commands::Console;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "boson_admin=debug,boson_admin_client=debug"
        } else {
            "boson_admin=info,boson_admin_client=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime_settings = load_runtime_settings();
    let console = Console::open(&runtime_settings, cli.yes)?;
    console.run(cli.command).await
}
