//!
//! gompet HTTP/WS server
//! ---------------------
//! Axum application hosting the page gate, the login endpoints and the
//! per-user notification socket.
//!
//! Responsibilities:
//! - Run every page request through the auth/locale gate (`gate::layer`).
//! - Session cookies issued by `POST /api/auth/login`, revoked by `POST /api/auth/logout`.
//! - `GET /ws/notifications/{user_id}/` streams payloads published for that user.
//! - `POST /api/notifications/{user_id}` publishes a payload to the user's sockets.
//! - First-run seeding of the user directory with a default admin.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub mod notify_hub;
pub use notify_hub::{NotificationHub, Subscription};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::gate::layer::gate_layer;
use crate::gate::{AuthGate, GateRequest, PrefixLocaleResolver, ResolvedLocale, RouteClassifier};
use crate::identity::{
    AuthProvider, CookieSessionProvider, LocalAuthProvider, LoginRequest, Principal, SessionManager, SESSION_COOKIE,
};
use crate::security::UserDirectory;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionManager,
    pub auth: Arc<dyn AuthProvider>,
    pub hub: NotificationHub,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(config: AppConfig, directory: UserDirectory) -> anyhow::Result<Self> {
        let sessions = SessionManager::with_ttl(config.session_ttl);
        let classifier = RouteClassifier::with_defaults(config.locales.as_slice()).context("compiling route tables")?;
        let gate = AuthGate::new(
            classifier,
            Arc::new(CookieSessionProvider::new(sessions.clone())),
            Arc::new(PrefixLocaleResolver::new(config.locales.clone(), config.default_locale.clone())),
        );
        Ok(Self {
            auth: Arc::new(LocalAuthProvider::new(directory, sessions.clone())),
            sessions,
            hub: NotificationHub::new(),
            gate: Arc::new(gate),
            config: Arc::new(config),
        })
    }
}

pub fn build_app(state: AppState) -> Router {
    let gate = state.gate.clone();
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/notifications/{user_id}", post(publish))
        .route("/ws/notifications/{user_id}", get(notifications_ws))
        .route("/ws/notifications/{user_id}/", get(notifications_ws))
        .fallback(page)
        .layer(middleware::from_fn_with_state(gate, gate_layer))
        .with_state(state)
}

/// Serve on an already bound listener until the server stops.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

fn log_startup(config: &AppConfig) {
    let cwd = std::env::current_dir().ok();
    info!(
        target: "startup",
        "gompet starting: cwd={:?}, http_port={}, locales={:?}, default_locale={}, session_ttl_secs={}, users_file={:?}, cookie_secure={}",
        cwd, config.http_port, config.locales, config.default_locale,
        config.session_ttl.as_secs(), config.users_file, config.cookie_secure
    );
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    log_startup(&config);
    let directory = UserDirectory::ensure_default_admin(&config.users_file)
        .with_context(|| format!("While loading user directory {}", config.users_file.display()))?;
    info!(target: "startup", users = directory.users.len(), "user directory loaded");
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState::new(config, directory)?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

#[derive(Debug, Deserialize)]
struct LoginPayload { username: String, password: String }

#[derive(Debug, Deserialize)]
struct SocketParams { token: Option<String> }

fn session_cookie(token: &str, secure: bool) -> AppResult<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/{secure}"))
        .map_err(|e| AppError::internal("cookie".to_string(), e.to_string()))
}

fn clear_session_cookie(secure: bool) -> HeaderValue {
    let secure = if secure { "; Secure" } else { "" };
    let value = format!(
        "{SESSION_COOKIE}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict; Path=/{secure}"
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("gompet_session=deleted; Path=/"))
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> AppResult<Response> {
    let req = LoginRequest { username: payload.username, password: payload.password, ip: None };
    let resp = state.auth.login(&req).inspect_err(|e| {
        warn!(target: "auth", user = %req.username, "login rejected: {e}");
    })?;
    let session = resp.session;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&session.token, state.config.cookie_secure)?);
    let body = json!({"status": "ok", "token": session.token, "user_id": session.principal.user_id});
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

async fn logout(State(state): State<AppState>, req: Request) -> impl IntoResponse {
    let greq = GateRequest::from_parts(req.uri(), req.headers());
    if let Some(token) = greq.cookie(SESSION_COOKIE).or_else(|| greq.bearer_token()) {
        let revoked = state.sessions.logout(&token);
        debug!(target: "auth", revoked, "auth.logout");
    }
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie(state.config.cookie_secure));
    (StatusCode::OK, headers, Json(json!({"status": "ok"})))
}

fn require_user(state: &AppState, token: Option<String>, user_id: u64) -> AppResult<Principal> {
    let principal = token
        .and_then(|t| state.sessions.validate(&t))
        .ok_or_else(|| AppError::auth("invalid_token", "missing or invalid session token"))?;
    if principal.user_id != user_id {
        return Err(AppError::forbidden("user_mismatch", "session does not belong to this user"));
    }
    Ok(principal)
}

async fn notifications_ws(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Query(params): Query<SocketParams>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = GateRequest::from_parts(&uri, &headers).bearer_token().or(params.token.filter(|t| !t.is_empty()));
    let principal = require_user(&state, token, user_id).inspect_err(|e| {
        warn!(target: "notify", user_id, "socket refused: {e}");
    })?;
    // subscribe before the handshake completes so nothing published afterwards is missed;
    // a handshake that never completes drops the subscription and prunes the group
    let subscription = state.hub.open(user_id);
    info!(target: "notify", user_id, user = %principal.username, "notification socket opened");
    Ok(ws.on_upgrade(move |socket| forward_notifications(socket, subscription)))
}

async fn forward_notifications(socket: WebSocket, mut subscription: Subscription) {
    let user_id = subscription.user_id();
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            pushed = subscription.recv() => match pushed {
                Ok(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() { break; }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(target: "notify", user_id, skipped, "socket fell behind, notifications dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // read-only channel
                Some(Ok(_)) => {}
            },
        }
    }
    drop(subscription);
    info!(target: "notify", user_id, "notification socket closed");
}

async fn publish(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    uri: Uri,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<Json<serde_json::Value>> {
    let greq = GateRequest::from_parts(&uri, &headers);
    let principal = greq
        .bearer_token()
        .or_else(|| greq.cookie(SESSION_COOKIE))
        .and_then(|t| state.sessions.validate(&t))
        .ok_or_else(|| AppError::auth("invalid_token", "missing or invalid session token"))?;
    if principal.user_id != user_id && !principal.roles.iter().any(|r| r == "admin") {
        return Err(AppError::forbidden("user_mismatch", "cannot publish to another user"));
    }
    let delivered = state.hub.broadcast_user_notification(user_id, &payload);
    debug!(target: "notify", user_id, delivered, by = %principal.username, "publish");
    Ok(Json(json!({"status": "ok", "delivered": delivered})))
}

/// Placeholder for page rendering: reports which page and locale the gate let through.
async fn page(req: Request) -> Json<serde_json::Value> {
    let locale = req.extensions().get::<ResolvedLocale>().map(|l| l.0.clone());
    Json(json!({"status": "ok", "page": req.uri().path(), "locale": locale}))
}
