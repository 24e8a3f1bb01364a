use std::collections::BTreeMap;

use axum::http::{HeaderMap, Uri};

/// Framework-neutral view of an inbound page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRequest {
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Header names are stored lowercased.
    pub headers: BTreeMap<String, String>,
}

impl GateRequest {
    pub fn new(path: &str) -> Self {
        Self { path: path.to_string(), ..Default::default() }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = if query.is_empty() { None } else { Some(query.to_string()) };
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Self {
        let mut out = Self::new(uri.path());
        if let Some(q) = uri.query() { out = out.with_query(q); }
        for (name, value) in headers.iter() {
            // non-visible-ASCII header values are not needed by the gate
            let Ok(v) = value.to_str() else { continue };
            let key = name.as_str().to_ascii_lowercase();
            match out.headers.get_mut(&key) {
                // HTTP/2 may split the cookie header into one field per pair
                Some(joined) if key == "cookie" => {
                    joined.push_str("; ");
                    joined.push_str(v);
                }
                _ => {
                    out.headers.insert(key, v.to_string());
                }
            }
        }
        out
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// Path plus `?query` when a query is present.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        let raw = self.header("cookie")?;
        for part in raw.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
        None
    }

    /// Token from `Authorization: Bearer <token>`.
    pub fn bearer_token(&self) -> Option<String> {
        let raw = self.header("authorization")?;
        let (prefix, token) = raw.split_once(' ')?;
        if prefix.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
            Some(token.trim().to_string())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseAction {
    /// Continue to the page handler unchanged.
    Next,
    /// Continue to the page handler with an internally rewritten path.
    Rewrite { path: String },
    Redirect { location: String, status: u16 },
}

/// Framework-neutral outcome of the gate; the axum layer turns it into a real response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub action: ResponseAction,
    pub headers: BTreeMap<String, String>,
}

pub const TEMPORARY_REDIRECT: u16 = 307;

impl GateResponse {
    pub fn next() -> Self { Self { action: ResponseAction::Next, headers: BTreeMap::new() } }

    pub fn rewrite(path: impl Into<String>) -> Self {
        Self { action: ResponseAction::Rewrite { path: path.into() }, headers: BTreeMap::new() }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            action: ResponseAction::Redirect { location: location.into(), status: TEMPORARY_REDIRECT },
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn location(&self) -> Option<&str> {
        match &self.action {
            ResponseAction::Redirect { location, .. } => Some(location.as_str()),
            _ => None,
        }
    }

    pub fn is_redirect(&self) -> bool { matches!(self.action, ResponseAction::Redirect { .. }) }
}
