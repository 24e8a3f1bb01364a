use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use gompet::config::AppConfig;

/// gompet web gate and notification server.
#[derive(Debug, Parser)]
#[command(name = "gompet", version)]
struct Args {
    /// HTTP port (overrides GOMPET_HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,
    /// User directory JSON file (overrides GOMPET_USERS_FILE)
    #[arg(long)]
    users_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port { config.http_port = port; }
    if let Some(path) = args.users_file { config.users_file = path; }

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "gompet", "gompet starting: RUST_LOG='{}', http_port={}", rust_log, config.http_port);

    gompet::server::run(config).await
}
