//! Asserts that configured keys exist in the store.

use serde::Deserialize;
use tracing::debug;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with};
use crate::store::StoreError;

/// Options recognized by [`AssertInStore`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssertInStoreOptions {
    /// Keys that must be present.
    pub key_set: Vec<String>,
}

/// Link that fails the chain when a required store key is absent.
pub struct AssertInStore {
    name: String,
    options: AssertInStoreOptions,
}

impl AssertInStore {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "assert_in_store";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: AssertInStoreOptions) -> Self {
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

impl Link for AssertInStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        if self.options.key_set.is_empty() {
            return Err(EngineError::configuration(&self.name, "key_set must not be empty"));
        }
        if self.options.key_set.iter().any(|key| key.trim().is_empty()) {
            return Err(EngineError::configuration(&self.name, "key_set must not contain blank keys"));
        }
        Ok(Outcome::Success)
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        for key in &self.options.key_set {
            if !ctx.store.contains_key(key) {
                return Err(StoreError::KeyNotFound(key.clone()).into());
            }
            debug!(link = %self.name, key = %key, "key present");
        }
        Ok(Outcome::Success)
    }
}
