//! Content negotiation.
//!
//! A route can register one wildcard formatter, which accepts every format,
//! and any number of named formatters. After the action set has run, the
//! pipeline appends at most one of them as its terminal step.
//!
//! | Policy | Terminal step |
//! |--------|---------------|
//! | [`Negotiation::WildcardOnly`] | the wildcard formatter, if any |
//! | [`Negotiation::PreferRequested`] | accepted formatter for `ctx.format`, else the wildcard |

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// Format name that registers the wildcard formatter.
pub const WILDCARD: &str = "*";

/// How the terminal formatter is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Negotiation {
    #[default]
    WildcardOnly,
    PreferRequested,
}

/// Formatters registered on a route.
#[derive(Debug, Clone, Default)]
pub struct Formats {
    wildcard: Option<Step>,
    named: Vec<(String, Step)>,
}

impl Formats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a formatter for `format`, replacing any previous one.
    ///
    /// The name [`WILDCARD`] sets the wildcard formatter.
    pub fn insert(&mut self, format: impl Into<String>, step: Step) {
        let format = format.into();
        if format == WILDCARD {
            self.wildcard = Some(step);
            return;
        }
        match self
            .named
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&format))
        {
            Some(slot) => slot.1 = step,
            None => self.named.push((format, step)),
        }
    }

    pub fn wildcard(&self) -> Option<&Step> {
        self.wildcard.as_ref()
    }

    /// Named formatter for `format`, compared case-insensitively.
    pub fn get(&self, format: &str) -> Option<&Step> {
        self.named
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(format))
            .map(|(_, step)| step)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.wildcard.is_none() && self.named.is_empty()
    }

    /// Picks the terminal formatter step.
    ///
    /// An empty `accepts` list accepts every format.
    pub fn resolve(
        &self,
        policy: Negotiation,
        requested: Option<&str>,
        accepts: &[String],
    ) -> Option<&Step> {
        if policy == Negotiation::PreferRequested {
            let named = requested
                .filter(|format| accepts_format(accepts, format))
                .and_then(|format| self.get(format));
            if named.is_some() {
                return named;
            }
        }
        self.wildcard()
    }
}

fn accepts_format(accepts: &[String], format: &str) -> bool {
    accepts.is_empty() || accepts.iter().any(|a| a.eq_ignore_ascii_case(format))
}
