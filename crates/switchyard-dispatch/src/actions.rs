//! Per-route action tables.
//!
//! An [`ActionTable`] maps event names to [`ActionSet`]s. Each set holds
//! ordered before-steps, at most one handler, and ordered after-steps. One
//! dispatch runs exactly one event's set; an event with nothing registered
//! contributes no steps.
//!
//! `enter`, `exit`, `connect` and `disconnect` get constants for
//! convenience, but the table treats them like any other name.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::step::Step;

pub const REQUEST: &str = "request";
pub const ENTER: &str = "enter";
pub const EXIT: &str = "exit";
pub const CONNECT: &str = "connect";
pub const DISCONNECT: &str = "disconnect";

/// Where in an action set a step is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    Handler,
    After,
}

/// Steps registered for one event.
#[derive(Debug, Clone, Default)]
pub struct ActionSet {
    pub before: Vec<Step>,
    pub handler: Option<Step>,
    pub after: Vec<Step>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only a handler, the shape of a flat action list.
    pub fn handler_only(step: Step) -> Self {
        Self {
            handler: Some(step),
            ..Self::default()
        }
    }

    /// Steps in run order: before, handler, after.
    pub fn steps(&self) -> impl Iterator<Item = (Phase, usize, &Step)> {
        let before = self.before.iter().enumerate().map(|(i, s)| (Phase::Before, i, s));
        let handler = self.handler.iter().map(|s| (Phase::Handler, 0, s));
        let after = self.after.iter().enumerate().map(|(i, s)| (Phase::After, i, s));
        before.chain(handler).chain(after)
    }

    pub fn len(&self) -> usize {
        self.before.len() + usize::from(self.handler.is_some()) + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Event name to [`ActionSet`] map with a default event.
#[derive(Debug, Clone)]
pub struct ActionTable {
    default_event: String,
    events: HashMap<String, ActionSet>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self {
            default_event: REQUEST.to_string(),
            events: HashMap::new(),
        }
    }
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the event used when the context selects none.
    pub fn with_default_event(mut self, event: impl Into<String>) -> Self {
        self.default_event = event.into();
        self
    }

    pub fn default_event(&self) -> &str {
        &self.default_event
    }

    /// Adds `step` to `event` at `phase`.
    ///
    /// Before and after steps accumulate. A second handler replaces the
    /// first.
    pub fn register(&mut self, event: impl Into<String>, phase: Phase, step: Step) {
        let event = event.into();
        let set = self.events.entry(event.clone()).or_default();
        match phase {
            Phase::Before => set.before.push(step),
            Phase::After => set.after.push(step),
            Phase::Handler => {
                if set.handler.replace(step).is_some() {
                    debug!(event = %event, "handler replaced");
                }
            }
        }
    }

    pub fn get(&self, event: &str) -> Option<&ActionSet> {
        self.events.get(event)
    }

    /// Resolves the event to run: `requested`, or the default event.
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(self.default_event.as_str())
    }

    /// The set for the resolved event, if anything is registered for it.
    pub fn select(&self, requested: Option<&str>) -> Option<&ActionSet> {
        self.events.get(self.resolve(requested))
    }

    /// Registered event names, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.events.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Step {
        Step::sync(|_| Ok(()))
    }

    #[test]
    fn test_register_phases() {
        let mut table = ActionTable::new();
        table.register(REQUEST, Phase::Before, noop());
        table.register(REQUEST, Phase::Before, noop());
        table.register(REQUEST, Phase::Handler, noop());
        table.register(REQUEST, Phase::After, noop());

        let set = table.get(REQUEST).unwrap();
        let phases: Vec<_> = set.steps().map(|(p, i, _)| (p, i)).collect();
        assert_eq!(
            phases,
            vec![
                (Phase::Before, 0),
                (Phase::Before, 1),
                (Phase::Handler, 0),
                (Phase::After, 0),
            ]
        );
    }

    #[test]
    fn test_second_handler_replaces() {
        let mut table = ActionTable::new();
        table.register(ENTER, Phase::Handler, noop());
        table.register(ENTER, Phase::Handler, noop());
        assert_eq!(table.get(ENTER).unwrap().len(), 1);
    }

    #[test]
    fn test_select_default_event() {
        let mut table = ActionTable::new();
        table.register(REQUEST, Phase::Handler, noop());

        assert!(table.select(None).is_some());
        assert!(table.select(Some(EXIT)).is_none());
        assert_eq!(table.resolve(None), "request");
        assert_eq!(table.resolve(Some("500")), "500");
    }

    #[test]
    fn test_custom_default_event() {
        let mut table = ActionTable::new().with_default_event(CONNECT);
        table.register(CONNECT, Phase::Handler, noop());
        assert_eq!(table.default_event(), "connect");
        assert!(table.select(None).is_some());
    }

    #[test]
    fn test_events_sorted() {
        let mut table = ActionTable::new();
        table.register(EXIT, Phase::Handler, noop());
        table.register(DISCONNECT, Phase::Handler, noop());
        table.register(ENTER, Phase::Handler, noop());
        assert_eq!(table.events(), vec!["disconnect", "enter", "exit"]);
    }

    #[test]
    fn test_handler_only_set() {
        let set = ActionSet::handler_only(noop());
        assert_eq!(set.len(), 1);
        assert!(set.before.is_empty() && set.after.is_empty());
    }
}
