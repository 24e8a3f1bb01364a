//! axum adapter running [`AuthGate`] in front of page routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::{AuthGate, GateRequest, GateResponse, ResolvedLocale, ResponseAction};
use crate::routes::LOCALE_HEADER;

// API, socket and static asset paths bypass the gate.
static BYPASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(api|ws|static|favicon\.ico)(/|$)").expect("static bypass pattern")
});

pub fn bypasses_gate(path: &str) -> bool { BYPASS.is_match(path) }

fn apply_headers(resp: &mut Response, gate: &GateResponse) {
    for (name, value) in gate.headers.iter() {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(n), Ok(v)) => { resp.headers_mut().insert(n, v); }
            _ => warn!(target: "gate", header = %name, "dropping header that is not valid on the wire"),
        }
    }
}

fn rewrite_uri(uri: &Uri, path: &str) -> Option<Uri> {
    let pq = match uri.query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(pq.parse().ok()?);
    Uri::from_parts(parts).ok()
}

pub async fn gate_layer(State(gate): State<Arc<AuthGate>>, mut req: Request, next: Next) -> Response {
    if bypasses_gate(req.uri().path()) {
        return next.run(req).await;
    }
    let greq = GateRequest::from_parts(req.uri(), req.headers());
    let outcome = gate.handle(&greq);

    let mut resp = match &outcome.action {
        ResponseAction::Redirect { location, status } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::TEMPORARY_REDIRECT);
            match HeaderValue::from_str(location) {
                Ok(loc) => (status, [(header::LOCATION, loc)]).into_response(),
                Err(_) => StatusCode::BAD_REQUEST.into_response(),
            }
        }
        ResponseAction::Rewrite { path } => {
            if let Some(uri) = rewrite_uri(req.uri(), path) { *req.uri_mut() = uri; }
            if let Some(loc) = outcome.header(LOCALE_HEADER) { req.extensions_mut().insert(ResolvedLocale(loc.to_string())); }
            next.run(req).await
        }
        ResponseAction::Next => {
            if let Some(loc) = outcome.header(LOCALE_HEADER) { req.extensions_mut().insert(ResolvedLocale(loc.to_string())); }
            next.run(req).await
        }
    };
    apply_headers(&mut resp, &outcome);
    resp
}
