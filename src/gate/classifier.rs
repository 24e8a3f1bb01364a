//! Route classification against the public-only and protected glob tables.
//!
//! A table compiles to one anchored, case-insensitive regex of the shape
//! `^(/(<locale>|...))?(<glob>|<glob>...)/?$`, where every `/*` in a glob
//! becomes `.*` and the remaining text is matched literally.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    PublicOnly,
    Protected,
    Unrestricted,
}

/// Raw match flags for both tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub public_only: bool,
    pub protected: bool,
}

impl Classification {
    pub fn class(&self) -> RouteClass {
        if self.public_only {
            RouteClass::PublicOnly
        } else if self.protected {
            RouteClass::Protected
        } else {
            RouteClass::Unrestricted
        }
    }

    pub fn is_gated(&self) -> bool { self.public_only || self.protected }
}

fn glob_to_regex(glob: &str) -> String {
    glob.split("/*").map(regex::escape).collect::<Vec<_>>().join(".*")
}

/// Compile one table. An empty table matches nothing and yields `None`.
pub fn compile_table<L: AsRef<str>, P: AsRef<str>>(locales: &[L], pages: &[P]) -> Result<Option<Regex>> {
    if pages.is_empty() { return Ok(None); }
    let alternatives = pages.iter().map(|p| glob_to_regex(p.as_ref())).collect::<Vec<_>>().join("|");
    let pattern = if locales.is_empty() {
        format!("^({alternatives})/?$")
    } else {
        let locs = locales.iter().map(|l| regex::escape(l.as_ref())).collect::<Vec<_>>().join("|");
        format!("^(/({locs}))?({alternatives})/?$")
    };
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("compiling route table pattern {pattern}"))?;
    Ok(Some(re))
}

/// Immutable after construction; shared read-only across requests.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    public_only: Option<Regex>,
    protected: Option<Regex>,
}

impl RouteClassifier {
    pub fn new<L: AsRef<str>>(locales: &[L], public_only: &[&str], protected: &[&str]) -> Result<Self> {
        Ok(Self {
            public_only: compile_table(locales, public_only)?,
            protected: compile_table(locales, protected)?,
        })
    }

    /// Classifier over the built-in route tables.
    pub fn with_defaults<L: AsRef<str>>(locales: &[L]) -> Result<Self> {
        Self::new(locales, crate::routes::PUBLIC_ONLY_ROUTES, crate::routes::PROTECTED_ROUTES)
    }

    pub fn classify(&self, path: &str) -> Classification {
        Classification {
            public_only: self.public_only.as_ref().is_some_and(|re| re.is_match(path)),
            protected: self.protected.as_ref().is_some_and(|re| re.is_match(path)),
        }
    }
}
