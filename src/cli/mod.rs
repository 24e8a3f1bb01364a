//! Terminal helpers for the notification harness.

pub mod connectivity;

use crate::notifications::{ConnectionStatus, DisplayMessage, MessageKind};

const MAX_TEXT_WIDTH: usize = 100;

fn json_output() -> bool {
    std::env::var("GOMPET_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

/// One display message as a single terminal line.
pub fn format_display_message(msg: &DisplayMessage) -> String {
    let mut line = format!("[{}] {}", msg.received_at.format("%H:%M:%S"), truncate(&msg.text, MAX_TEXT_WIDTH));
    if let Some(url) = &msg.link_url {
        line.push_str(&format!("  → {} ({})", url, msg.link_label));
    }
    line
}

pub fn print_display_message(msg: &DisplayMessage) {
    if json_output() {
        match serde_json::to_string(msg) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("failed to encode message {}: {e}", msg.id),
        }
        return;
    }
    match msg.kind {
        // lifecycle lines in yellow so they stand out from notifications
        MessageKind::Lifecycle(_) => println!("\x1b[33m{}\x1b[0m", format_display_message(msg)),
        _ => println!("{}", format_display_message(msg)),
    }
}

pub fn format_status(status: ConnectionStatus, label: &str) -> String {
    let color = match status {
        ConnectionStatus::Connected => "32",
        ConnectionStatus::Connecting => "33",
        ConnectionStatus::Disconnected => "90",
        ConnectionStatus::Error => "31",
    };
    format!("status: \x1b[{color}m{label}\x1b[0m")
}
