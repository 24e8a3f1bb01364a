use anyhow::{anyhow, Context, Result};
use reqwest::Url;

/// Session obtained from `POST /api/auth/login`.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: String,
    pub user_id: u64,
}

#[derive(Clone)]
pub struct HttpSession {
    base: Url,
    client: reqwest::Client,
    grant: LoginGrant,
}

impl HttpSession {
    pub async fn connect(base: &str, user: &str, pass: &str) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()?;
        let login_url = base_url.join("/api/auth/login")?;
        let resp = client
            .post(login_url)
            .json(&serde_json::json!({"username": user, "password": pass}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("login failed: HTTP {}", resp.status()));
        }
        let v: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if v.get("status").and_then(|s| s.as_str()) != Some("ok") {
            return Err(anyhow!("login failed"));
        }
        let token = v.get("token").and_then(|s| s.as_str()).unwrap_or("").to_string();
        if token.is_empty() { return Err(anyhow!("session token missing")); }
        let user_id = v.get("user_id").and_then(|n| n.as_u64()).ok_or_else(|| anyhow!("user id missing"))?;
        Ok(Self { base: base_url, client, grant: LoginGrant { token, user_id } })
    }

    pub fn grant(&self) -> &LoginGrant { &self.grant }

    /// Socket base for this session's user, ending in `?token=`.
    pub fn notification_socket_base(&self) -> Result<String> {
        notification_socket_base(self.base.as_str(), self.grant.user_id)
    }

    /// Publish a payload to a user's sockets. Returns whether anyone received it.
    pub async fn publish(&self, user_id: u64, payload: &serde_json::Value) -> Result<bool> {
        let url = self.base.join(&format!("/api/notifications/{user_id}"))?;
        let resp = self.client.post(url).bearer_auth(&self.grant.token).json(payload).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("publish failed: HTTP {}", resp.status()));
        }
        let v: serde_json::Value = resp.json().await?;
        Ok(v.get("delivered").and_then(|b| b.as_bool()).unwrap_or(false))
    }

    pub async fn logout(&self) -> Result<()> {
        let url = self.base.join("/api/auth/logout")?;
        self.client.post(url).bearer_auth(&self.grant.token).send().await?;
        Ok(())
    }
}

/// Convert `http(s)://host[:port]` into `ws(s)://host[:port]/ws/notifications/<id>/?token=`.
pub fn notification_socket_base(http_base: &str, user_id: u64) -> Result<String> {
    let mut ws = Url::parse(http_base).context("invalid base URL")?;
    let scheme = if ws.scheme() == "https" { "wss" } else { "ws" };
    ws.set_scheme(scheme).map_err(|_| anyhow!("cannot derive socket URL from {http_base}"))?;
    let ws = ws.join(&format!("/ws/notifications/{user_id}/"))?;
    Ok(format!("{ws}?token="))
}
