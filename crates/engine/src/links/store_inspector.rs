//! Publishes a summary of the store back into the store.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with, require_non_empty};
use crate::store::value_kind;

/// Options recognized by [`StoreInspector`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreInspectorOptions {
    /// Key the summary object is written under.
    pub store_key: String,
}

/// Link that enumerates every entry and records entry count, keys, and kind
/// tags under a configured output key. Handy as a run-end audit record that
/// travels with the snapshot.
pub struct StoreInspector {
    name: String,
    options: StoreInspectorOptions,
}

impl StoreInspector {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "store_inspector";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: StoreInspectorOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Constructs the link from its descriptor entry.
    pub fn from_doc(doc: &LinkDoc) -> Result<Box<dyn Link>, EngineError> {
        let options = options_from_with(doc.label(), &doc.with)?;
        Ok(Box::new(Self::new(doc.label(), options)))
    }
}

impl Link for StoreInspector {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        require_non_empty(&self.name, "store_key", &self.options.store_key)?;
        Ok(Outcome::Success)
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        let mut keys = Vec::with_capacity(ctx.store.len());
        let mut kinds = serde_json::Map::new();
        for (key, value) in ctx.store.iter() {
            keys.push(Value::String(key.to_string()));
            kinds.insert(key.to_string(), Value::String(value_kind(value).to_string()));
        }

        let summary = json!({
            "entries": keys.len(),
            "keys": keys,
            "kinds": kinds,
        });
        debug!(link = %self.name, key = %self.options.store_key, entries = ctx.store.len(), "summary written");
        ctx.store.set(&self.options.store_key, summary);
        Ok(Outcome::Success)
    }
}
