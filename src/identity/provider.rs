use anyhow::Result;
use tracing::{debug, info};

use super::principal::{Attrs, Principal};
use super::session::{Session, SessionManager};
use super::SESSION_COOKIE;
use crate::error::{AppError, AppResult};
use crate::gate::GateRequest;
use crate::security::UserDirectory;

/// What the gate learns about the caller: a user claim and/or an access token.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub user: Option<Principal>,
    pub access_token: Option<String>,
}

impl SessionInfo {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() || self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Source of "current session or none" for a request.
///
/// An `Err` means the provider could not be consulted; callers treat it as no session.
pub trait SessionProvider: Send + Sync {
    fn get_session(&self, req: &GateRequest) -> Result<Option<SessionInfo>>;
}

/// Resolves the session from the `gompet_session` cookie, falling back to a bearer token.
#[derive(Debug, Clone)]
pub struct CookieSessionProvider {
    sessions: SessionManager,
}

impl CookieSessionProvider {
    pub fn new(sessions: SessionManager) -> Self { Self { sessions } }
}

impl SessionProvider for CookieSessionProvider {
    fn get_session(&self, req: &GateRequest) -> Result<Option<SessionInfo>> {
        let Some(token) = req.cookie(SESSION_COOKIE).or_else(|| req.bearer_token()) else {
            return Ok(None);
        };
        let Some(principal) = self.sessions.validate(&token) else {
            debug!(target: "session", "stale or unknown session token");
            return Ok(None);
        };
        Ok(Some(SessionInfo { user: Some(principal), access_token: Some(token) }))
    }
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse>;
}

pub struct LocalAuthProvider {
    pub directory: UserDirectory,
    pub sm: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(directory: UserDirectory, sm: SessionManager) -> Self { Self { directory, sm } }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::user("missing_credentials", "username and password are required"));
        }
        let Some(user) = self.directory.authenticate(&req.username, &req.password) else {
            return Err(AppError::auth("invalid_credentials", "invalid username or password"));
        };
        let principal = Principal {
            user_id: user.user_id,
            username: user.username.clone(),
            roles: user.roles.clone(),
            attrs: Attrs { ip: req.ip.clone(), ..Default::default() },
        };
        let session = self.sm.issue(principal)?;
        info!(target: "auth", user = %req.username, sid = %session.session_id, "auth.login");
        Ok(LoginResponse { session })
    }
}
