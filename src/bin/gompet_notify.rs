//!
//! gompet notification harness
//! ---------------------------
//! Opens the per-user notification socket and prints every display message
//! as it arrives. Either logs in with `--user/--password` against `--base`, or
//! uses an existing `--token` with `--url` (or `--base` plus `--user-id`).

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use gompet::cli::connectivity::{notification_socket_base, HttpSession};
use gompet::cli::{format_status, print_display_message};
use gompet::notifications::{ConnectionStatus, NotificationClient, TokenEncoding, TungsteniteConnector};

#[derive(Debug, Parser)]
#[command(name = "gompet-notify", version, about = "Watch a gompet notification socket")]
struct Args {
    /// Socket base URL ending right before the token, e.g. ws://host/ws/notifications/2/?token=
    #[arg(long, env = "GOMPET_NOTIFY_URL")]
    url: Option<String>,
    /// Session token to append to the socket URL
    #[arg(long, env = "GOMPET_TOKEN")]
    token: Option<String>,
    /// User id used to derive the socket URL from --base
    #[arg(long)]
    user_id: Option<u64>,
    /// HTTP base of the server
    #[arg(long, env = "GOMPET_BASE", default_value = "http://127.0.0.1:7878")]
    base: String,
    /// Log in as this user to obtain token and user id
    #[arg(long)]
    user: Option<String>,
    #[arg(long, env = "GOMPET_PASSWORD")]
    password: Option<String>,
    /// Percent-encode the token instead of appending it verbatim
    #[arg(long)]
    percent_encode_token: bool,
}

async fn resolve_target(args: &Args) -> Result<(String, String)> {
    if let (Some(user), Some(pass)) = (&args.user, &args.password) {
        let session = HttpSession::connect(&args.base, user, pass).await?;
        info!(target: "notify", user_id = session.grant().user_id, "logged in");
        return Ok((session.notification_socket_base()?, session.grant().token.clone()));
    }
    let token = args.token.clone().ok_or_else(|| anyhow!("either --token or --user/--password is required"))?;
    let url = match (&args.url, args.user_id) {
        (Some(url), _) => url.clone(),
        (None, Some(id)) => notification_socket_base(&args.base, id)?,
        (None, None) => return Err(anyhow!("--url or --user-id is required together with --token")),
    };
    Ok((url, token))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))?;
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let (url, token) = resolve_target(&args).await?;
    let encoding = if args.percent_encode_token { TokenEncoding::Percent } else { TokenEncoding::Raw };

    let mut client = NotificationClient::new(TungsteniteConnector).with_token_encoding(encoding);
    client.connect(&url, &token);
    println!("{}", format_status(client.status(), client.status_label()));
    if let Some(msg) = client.latest() { print_display_message(msg); }

    let mut last_status = client.status();
    let mut interrupted = false;
    while client.has_connection() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                client.disconnect();
                interrupted = true;
            }
            applied = client.pump() => {
                if !applied { continue; }
                if let Some(msg) = client.latest() { print_display_message(msg); }
            }
        }
        if client.status() != last_status {
            last_status = client.status();
            println!("{}", format_status(last_status, client.status_label()));
        }
    }
    // the close that follows a local disconnect
    while interrupted && client.status() != ConnectionStatus::Disconnected && client.pump().await {
        if let Some(msg) = client.latest() { print_display_message(msg); }
    }
    Ok(())
}
