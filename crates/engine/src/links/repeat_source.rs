//! Streaming-shaped source: emits one item per execute pass.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with, require_non_empty};

/// Options recognized by [`RepeatSource`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatSourceOptions {
    /// Key the current micro-batch is published under, overwritten each
    /// pass.
    pub store_key: String,
    /// Items emitted one per pass, in order.
    pub items: Vec<Value>,
    /// Optional cap on how many passes run; remaining items are dropped.
    #[serde(default)]
    pub max_batches: Option<u32>,
    /// When true, signal a clean end of the whole run after the last batch
    /// instead of continuing with downstream chains.
    #[serde(default)]
    pub then_stop: bool,
}

/// Link that drives the chain through one pass per configured item by
/// returning [`Outcome::Repeat`] until its items are drained. Downstream
/// links in the same chain run once, after the final pass.
pub struct RepeatSource {
    name: String,
    options: RepeatSourceOptions,
    cursor: usize,
}

impl RepeatSource {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "repeat_source";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: RepeatSourceOptions) -> Self {
        Self {
            name: name.into(),
            options,
            cursor: 0,
        }
    }

    /// Constructs the link from its descriptor entry.
    pub fn from_doc(doc: &LinkDoc) -> Result<Box<dyn Link>, EngineError> {
        let options = options_from_with(doc.label(), &doc.with)?;
        Ok(Box::new(Self::new(doc.label(), options)))
    }

    fn batch_limit(&self) -> usize {
        let configured = self.options.items.len();
        match self.options.max_batches {
            Some(cap) => configured.min(cap as usize),
            None => configured,
        }
    }
}

impl Link for RepeatSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        require_non_empty(&self.name, "store_key", &self.options.store_key)?;
        if self.options.items.is_empty() {
            return Err(EngineError::configuration(&self.name, "items must not be empty"));
        }
        if self.options.max_batches == Some(0) {
            return Err(EngineError::configuration(&self.name, "max_batches must be at least 1"));
        }
        Ok(Outcome::Success)
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        let limit = self.batch_limit();
        if self.cursor >= limit {
            return Ok(Outcome::Success);
        }
        let item = self.options.items[self.cursor].clone();
        debug!(link = %self.name, batch = self.cursor + 1, of = limit, "emitting micro-batch");
        ctx.store.set(&self.options.store_key, item);
        self.cursor += 1;

        if self.cursor < limit {
            Ok(Outcome::Repeat)
        } else if self.options.then_stop {
            Ok(Outcome::StopProcessing)
        } else {
            Ok(Outcome::Success)
        }
    }
}
