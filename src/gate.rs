//!
//! gompet page gate
//! ----------------
//! Per-request auth and locale policy for page routes.
//!
//! Responsibilities:
//! - Classify the path against the public-only and protected route tables.
//! - Look up the session only for gated paths; a failing provider counts as "no session".
//! - Redirect anonymous users away from protected pages (carrying `from`) and
//!   signed-in users away from public-only pages.
//! - Otherwise hand the request to locale resolution and pass its answer through.
//! - Stamp every answer with the originally requested path.

use std::sync::Arc;

use tracing::{debug, warn};

pub mod classifier;
pub mod layer;
pub mod locale;
mod request;

pub use classifier::{Classification, RouteClass, RouteClassifier};
pub use locale::{LocaleResolver, PrefixLocaleResolver, ResolvedLocale};
pub use request::{GateRequest, GateResponse, ResponseAction, TEMPORARY_REDIRECT};

use crate::identity::SessionProvider;
use crate::routes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Anonymous request for a protected page; `from` is the original path+query.
    RedirectToLogin { from: String },
    /// Signed-in request for a public-only page.
    RedirectToLanding,
    Delegate,
}

/// Pure redirect policy.
pub fn decide(classification: Classification, has_session: bool, req: &GateRequest) -> GateDecision {
    if !has_session && classification.protected {
        return GateDecision::RedirectToLogin { from: req.path_and_query() };
    }
    if has_session && classification.public_only {
        return GateDecision::RedirectToLanding;
    }
    GateDecision::Delegate
}

pub struct AuthGate {
    classifier: RouteClassifier,
    sessions: Arc<dyn SessionProvider>,
    locale: Arc<dyn LocaleResolver>,
}

impl AuthGate {
    pub fn new(classifier: RouteClassifier, sessions: Arc<dyn SessionProvider>, locale: Arc<dyn LocaleResolver>) -> Self {
        Self { classifier, sessions, locale }
    }

    pub fn classify(&self, path: &str) -> Classification { self.classifier.classify(path) }

    fn has_session(&self, req: &GateRequest) -> bool {
        match self.sessions.get_session(req) {
            Ok(Some(info)) => info.is_authenticated(),
            Ok(None) => false,
            Err(e) => {
                warn!(target: "gate", path = %req.path, "session lookup failed, treating as anonymous: {e:#}");
                false
            }
        }
    }

    pub fn handle(&self, req: &GateRequest) -> GateResponse {
        let classification = self.classifier.classify(&req.path);
        // unrestricted pages never touch the session provider
        let has_session = classification.is_gated() && self.has_session(req);
        let decision = decide(classification, has_session, req);
        debug!(target: "gate", path = %req.path, ?classification, has_session, ?decision, "gate decision");
        let response = match decision {
            GateDecision::RedirectToLogin { from } => GateResponse::redirect(routes::login_with_from(&from)),
            GateDecision::RedirectToLanding => GateResponse::redirect(routes::LANDING),
            GateDecision::Delegate => self.locale.resolve(req),
        };
        response.with_header(routes::CURRENT_PATH_HEADER, &req.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Mode { Anonymous, SignedIn, Broken }

    struct FixedProvider { mode: Mode, calls: AtomicUsize }

    impl SessionProvider for FixedProvider {
        fn get_session(&self, _req: &GateRequest) -> anyhow::Result<Option<SessionInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::Anonymous => Ok(None),
                Mode::SignedIn => Ok(Some(SessionInfo { user: None, access_token: Some("t".into()) })),
                Mode::Broken => Err(anyhow::anyhow!("session backend unreachable")),
            }
        }
    }

    fn gate(mode: Mode) -> (AuthGate, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider { mode, calls: AtomicUsize::new(0) });
        let g = AuthGate::new(
            RouteClassifier::with_defaults(&["pl"]).unwrap(),
            provider.clone(),
            Arc::new(PrefixLocaleResolver::new(vec!["pl".into()], "pl")),
        );
        (g, provider)
    }

    #[test]
    fn anonymous_protected_redirects_to_login_with_from() {
        let (g, _) = gate(Mode::Anonymous);
        let r = g.handle(&GateRequest::new("/bookmarks").with_query("page=2&sort=new"));
        assert_eq!(r.location(), Some("/auth/login?from=%2Fbookmarks%3Fpage%3D2%26sort%3Dnew"));
        assert_eq!(r.header(routes::CURRENT_PATH_HEADER), Some("/bookmarks"));
    }

    #[test]
    fn signed_in_public_only_redirects_to_landing() {
        let (g, _) = gate(Mode::SignedIn);
        let r = g.handle(&GateRequest::new("/pl/auth/signup"));
        assert_eq!(r.location(), Some("/"));
        assert_eq!(r.header(routes::CURRENT_PATH_HEADER), Some("/pl/auth/signup"));
    }

    #[test]
    fn signed_in_protected_delegates_to_locale() {
        let (g, _) = gate(Mode::SignedIn);
        let r = g.handle(&GateRequest::new("/bookmarks"));
        assert_eq!(r.action, ResponseAction::Rewrite { path: "/pl/bookmarks".into() });
        assert_eq!(r.header(routes::CURRENT_PATH_HEADER), Some("/bookmarks"));
    }

    #[test]
    fn anonymous_public_only_delegates_to_locale() {
        let (g, _) = gate(Mode::Anonymous);
        let r = g.handle(&GateRequest::new("/auth/login"));
        assert!(!r.is_redirect());
        assert_eq!(r.header(routes::CURRENT_PATH_HEADER), Some("/auth/login"));
    }

    #[test]
    fn provider_failure_fails_closed_on_protected_and_open_on_public_only() {
        let (g, _) = gate(Mode::Broken);
        let protected = g.handle(&GateRequest::new("/profile/settings"));
        assert_eq!(protected.location(), Some("/auth/login?from=%2Fprofile%2Fsettings"));
        let public_only = g.handle(&GateRequest::new("/auth/login"));
        assert!(!public_only.is_redirect());
    }

    #[test]
    fn unrestricted_paths_skip_session_lookup() {
        let (g, provider) = gate(Mode::SignedIn);
        let r = g.handle(&GateRequest::new("/knowledge"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.header(routes::CURRENT_PATH_HEADER), Some("/knowledge"));
    }

    #[test]
    fn locale_redirect_is_passed_through_unchanged() {
        let (g, _) = gate(Mode::Anonymous);
        let r = g.handle(&GateRequest::new("/pl/knowledge"));
        assert_eq!(r.location(), Some("/knowledge"));
        assert_eq!(r.header(routes::LOCALE_HEADER), Some("pl"));
        assert_eq!(r.header(routes::CURRENT_PATH_HEADER), Some("/pl/knowledge"));
    }

    #[test]
    fn decide_is_total() {
        let req = GateRequest::new("/x");
        let none = Classification::default();
        assert_eq!(decide(none, false, &req), GateDecision::Delegate);
        assert_eq!(decide(none, true, &req), GateDecision::Delegate);
    }
}
