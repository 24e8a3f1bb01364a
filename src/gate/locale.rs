//! Locale resolution with "as-needed" prefixes: the default locale is served
//! unprefixed, every other supported locale keeps its `/<locale>` prefix.

use super::request::{GateRequest, GateResponse};
use crate::routes::LOCALE_HEADER;

/// Locale step run by the gate when no auth redirect applies.
pub trait LocaleResolver: Send + Sync {
    fn resolve(&self, req: &GateRequest) -> GateResponse;
}

/// Locale picked for the request, stored in request extensions for page handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale(pub String);

#[derive(Debug, Clone)]
pub struct PrefixLocaleResolver {
    locales: Vec<String>,
    default_locale: String,
}

impl PrefixLocaleResolver {
    pub fn new(locales: Vec<String>, default_locale: impl Into<String>) -> Self {
        Self { locales, default_locale: default_locale.into() }
    }

    pub fn default_locale(&self) -> &str { &self.default_locale }

    /// Split a leading supported-locale segment off `path`.
    /// Returns the canonical locale name and the remaining path (`/` when empty).
    pub fn split_locale<'a>(&'a self, path: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = path.strip_prefix('/')?;
        let (first, tail) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let locale = self.locales.iter().find(|l| l.eq_ignore_ascii_case(first))?;
        Some((locale.as_str(), if tail.is_empty() { "/" } else { tail }))
    }
}

impl LocaleResolver for PrefixLocaleResolver {
    fn resolve(&self, req: &GateRequest) -> GateResponse {
        match self.split_locale(&req.path) {
            Some((locale, rest)) if locale == self.default_locale => {
                let location = match &req.query {
                    Some(q) => format!("{rest}?{q}"),
                    None => rest.to_string(),
                };
                GateResponse::redirect(location).with_header(LOCALE_HEADER, locale)
            }
            Some((locale, _)) => GateResponse::next().with_header(LOCALE_HEADER, locale),
            None => {
                let rewritten = if req.path == "/" || req.path.is_empty() {
                    format!("/{}", self.default_locale)
                } else {
                    format!("/{}{}", self.default_locale, req.path)
                };
                GateResponse::rewrite(rewritten).with_header(LOCALE_HEADER, &self.default_locale)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ResponseAction;

    fn resolver() -> PrefixLocaleResolver {
        PrefixLocaleResolver::new(vec!["pl".into(), "en".into()], "pl")
    }

    #[test]
    fn unprefixed_path_is_rewritten_to_default_locale() {
        let r = resolver().resolve(&GateRequest::new("/animals"));
        assert_eq!(r.action, ResponseAction::Rewrite { path: "/pl/animals".into() });
        assert_eq!(r.header(LOCALE_HEADER), Some("pl"));
        let root = resolver().resolve(&GateRequest::new("/"));
        assert_eq!(root.action, ResponseAction::Rewrite { path: "/pl".into() });
    }

    #[test]
    fn default_locale_prefix_redirects_to_unprefixed() {
        let r = resolver().resolve(&GateRequest::new("/pl/animals").with_query("page=3"));
        assert_eq!(r.location(), Some("/animals?page=3"));
        let root = resolver().resolve(&GateRequest::new("/PL"));
        assert_eq!(root.location(), Some("/"));
    }

    #[test]
    fn other_locale_passes_through() {
        let r = resolver().resolve(&GateRequest::new("/en/knowledge"));
        assert_eq!(r.action, ResponseAction::Next);
        assert_eq!(r.header(LOCALE_HEADER), Some("en"));
    }

    #[test]
    fn locale_must_be_a_whole_segment() {
        let r = resolver();
        assert_eq!(r.split_locale("/plants"), None);
        assert_eq!(r.split_locale("/en/x/y"), Some(("en", "/x/y")));
        assert_eq!(r.split_locale("relative"), None);
    }
}
