use tokio::task::JoinHandle;

use gompet::config::AppConfig;
use gompet::security::UserDirectory;
use gompet::server::{serve, AppState};

pub const USER: &str = "ola";
pub const PASSWORD: &str = "tajne";

/// Server on an ephemeral port with one user (`ola`, id 1). Returns the task and the http base.
pub async fn start_server(tmp: &tempfile::TempDir) -> anyhow::Result<(JoinHandle<()>, String)> {
    let users_file = tmp.path().join("users.json");
    let mut directory = UserDirectory::default();
    directory.add_user(USER, PASSWORD)?;
    directory.save(&users_file)?;
    let config = AppConfig { users_file, ..Default::default() };
    let state = AppState::new(config, directory)?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await { eprintln!("server task error: {e:?}"); }
    });
    Ok((handle, format!("http://{addr}")))
}
