//! Writes a configured value into the store.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with, require_non_empty};

/// Options recognized by [`SetValue`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetValueOptions {
    /// Store key to write.
    pub store_key: String,
    /// Value written verbatim; any prior value is overwritten.
    pub value: Value,
}

/// Link that publishes one configured key/value pair.
pub struct SetValue {
    name: String,
    options: SetValueOptions,
}

impl SetValue {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "set_value";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: SetValueOptions) -> Self {
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

impl Link for SetValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        require_non_empty(&self.name, "store_key", &self.options.store_key)?;
        Ok(Outcome::Success)
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        debug!(link = %self.name, key = %self.options.store_key, "writing value");
        ctx.store.set(&self.options.store_key, self.options.value.clone());
        Ok(Outcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn writes_the_configured_value() {
        let mut link = SetValue::new(
            "writer",
            SetValueOptions {
                store_key: "raw".into(),
                value: json!({"rows": 3}),
            },
        );
        let mut ctx = PipelineContext::new();

        assert_eq!(link.initialize(&mut ctx).expect("initialize"), Outcome::Success);
        assert_eq!(link.execute(&mut ctx).expect("execute"), Outcome::Success);
        assert_eq!(ctx.store.get("raw"), Some(&json!({"rows": 3})));
    }

    #[test]
    fn empty_store_key_fails_initialize() {
        let mut link = SetValue::new(
            "writer",
            SetValueOptions {
                store_key: "".into(),
                value: json!(null),
            },
        );
        let mut ctx = PipelineContext::new();
        let error = link.initialize(&mut ctx).expect_err("blank key must fail");
        assert!(matches!(error, EngineError::Configuration { .. }));
    }

    #[test]
    fn from_doc_rejects_unknown_options() {
        let mut with = IndexMap::new();
        with.insert("store_key".to_string(), json!("raw"));
        with.insert("valeu".to_string(), json!(1));
        let doc = LinkDoc {
            name: None,
            kind: SetValue::KIND.into(),
            with,
        };

        let error = SetValue::from_doc(&doc).expect_err("typo must be rejected");
        assert!(error.to_string().contains("valeu"));
    }
}
