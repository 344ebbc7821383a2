//! Pipeline execution.
//!
//! A [`Pipeline`] is the flattened, ordered list of units a matched route
//! runs for one event:
//!
//! ```text
//! middleware… → validators… → before… → handler → after… → formatter?
//! ```
//!
//! Units run one at a time with a single forward-only cursor. After every
//! unit the executor checks, in order, the error handed to the continuation,
//! `ctx.error`, and `ctx.cancelled`. The first one present stops the run and
//! becomes the abort reason. A unit that returns `Err` from its body stops
//! the run as an [`UnhandledThrow`].

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::actions::{ActionSet, Phase};
use crate::context::RequestContext;
use crate::error::{DispatchError, UnhandledThrow};
use crate::step::Step;
use crate::validate::Validate;

/// The pipeline section a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Middleware,
    Validator,
    Before,
    Handler,
    After,
    Formatter,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Middleware => "middleware",
            Stage::Validator => "validator",
            Stage::Before => "before",
            Stage::Handler => "handler",
            Stage::After => "after",
            Stage::Formatter => "formatter",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Phase> for Stage {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Before => Stage::Before,
            Phase::Handler => Stage::Handler,
            Phase::After => Stage::After,
        }
    }
}

enum Unit<'r> {
    Step(&'r Step),
    Validator(&'r dyn Validate),
}

struct Entry<'r> {
    stage: Stage,
    /// Position within the stage.
    index: usize,
    unit: Unit<'r>,
}

/// An ordered run of steps and validators borrowed from a route.
#[derive(Default)]
pub struct Pipeline<'r> {
    entries: Vec<Entry<'r>>,
}

impl<'r> Pipeline<'r> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn next_index(&self, stage: Stage) -> usize {
        self.entries.iter().filter(|e| e.stage == stage).count()
    }

    pub fn step(mut self, stage: Stage, step: &'r Step) -> Self {
        let index = self.next_index(stage);
        self.entries.push(Entry {
            stage,
            index,
            unit: Unit::Step(step),
        });
        self
    }

    pub fn steps<I>(self, stage: Stage, steps: I) -> Self
    where
        I: IntoIterator<Item = &'r Step>,
    {
        steps.into_iter().fold(self, |p, step| p.step(stage, step))
    }

    pub fn validator(mut self, validator: &'r dyn Validate) -> Self {
        let index = self.next_index(Stage::Validator);
        self.entries.push(Entry {
            stage: Stage::Validator,
            index,
            unit: Unit::Validator(validator),
        });
        self
    }

    /// Appends an action set's before, handler and after steps.
    pub fn actions(self, set: &'r ActionSet) -> Self {
        set.steps()
            .fold(self, |p, (phase, _, step)| p.step(phase.into(), step))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stage of every unit, in run order.
    pub fn stages(&self) -> Vec<Stage> {
        self.entries.iter().map(|e| e.stage).collect()
    }

    /// Runs every unit in order.
    ///
    /// Returns `Ok(None)` when the sequence is exhausted and `Ok(Some(err))`
    /// when a unit aborted it. A context that is already aborted runs
    /// nothing.
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Option<DispatchError>, UnhandledThrow> {
        if let Some(err) = ctx.take_abort() {
            debug!(error = %err, "context aborted before first step");
            return Ok(Some(err));
        }

        for entry in &self.entries {
            trace!(stage = %entry.stage, index = entry.index, "running step");

            let signalled = match entry.unit {
                Unit::Step(step) => step
                    .run(ctx)
                    .await
                    .map_err(|err| UnhandledThrow::new(entry.stage, entry.index, err))?,
                Unit::Validator(validator) => {
                    validator
                        .validate(ctx)
                        .await
                        .err()
                        .map(|message| DispatchError::ValidationFailed {
                            validator_index: entry.index,
                            param: None,
                            message,
                        })
                }
            };

            if let Some(err) = signalled.or_else(|| ctx.take_abort()) {
                debug!(
                    stage = %entry.stage,
                    index = entry.index,
                    error = %err,
                    state = ?ctx.extensions,
                    "pipeline aborted"
                );
                return Ok(Some(err));
            }
        }

        Ok(None)
    }
}

impl fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stages()).finish()
    }
}
