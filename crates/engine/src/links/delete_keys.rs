//! Removes configured keys from the store.

use serde::Deserialize;
use tracing::debug;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with};

fn default_must_exist() -> bool {
    true
}

/// Options recognized by [`DeleteKeys`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteKeysOptions {
    /// Keys to remove.
    pub keys: Vec<String>,
    /// When true (the default), a missing key fails the link; when false,
    /// missing keys are skipped silently.
    #[serde(default = "default_must_exist")]
    pub must_exist: bool,
}

/// Link that drops store entries, e.g. bulky intermediates before a
/// checkpoint.
pub struct DeleteKeys {
    name: String,
    options: DeleteKeysOptions,
}

impl DeleteKeys {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "delete_keys";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: DeleteKeysOptions) -> Self {
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

impl Link for DeleteKeys {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        if self.options.keys.is_empty() {
            return Err(EngineError::configuration(&self.name, "keys must not be empty"));
        }
        Ok(Outcome::Success)
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        for key in &self.options.keys {
            match ctx.store.delete(key) {
                Ok(_) => debug!(link = %self.name, key = %key, "key deleted"),
                Err(error) if self.options.must_exist => return Err(error.into()),
                Err(_) => debug!(link = %self.name, key = %key, "key absent, skipped"),
            }
        }
        Ok(Outcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use serde_json::json;

    #[test]
    fn deletes_present_keys() {
        let mut ctx = PipelineContext::new();
        ctx.store.set("a", json!(1));
        ctx.store.set("b", json!(2));

        let mut link = DeleteKeys::new(
            "cleanup",
            DeleteKeysOptions {
                keys: vec!["a".into()],
                must_exist: true,
            },
        );
        assert_eq!(link.execute(&mut ctx).expect("execute"), Outcome::Success);
        assert!(!ctx.store.contains_key("a"));
        assert!(ctx.store.contains_key("b"));
    }

    #[test]
    fn missing_key_fails_when_must_exist() {
        let mut ctx = PipelineContext::new();
        let mut link = DeleteKeys::new(
            "cleanup",
            DeleteKeysOptions {
                keys: vec!["absent".into()],
                must_exist: true,
            },
        );
        let error = link.execute(&mut ctx).expect_err("missing key must fail");
        assert!(matches!(error, EngineError::Store(StoreError::KeyNotFound(_))));
    }

    #[test]
    fn missing_key_is_skipped_when_allowed() {
        let mut ctx = PipelineContext::new();
        let mut link = DeleteKeys::new(
            "cleanup",
            DeleteKeysOptions {
                keys: vec!["absent".into()],
                must_exist: false,
            },
        );
        assert_eq!(link.execute(&mut ctx).expect("execute"), Outcome::Success);
    }

    #[test]
    fn must_exist_defaults_to_true_in_documents() {
        use indexmap::IndexMap;

        let mut with = IndexMap::new();
        with.insert("keys".to_string(), json!(["a"]));
        let doc = LinkDoc {
            name: None,
            kind: DeleteKeys::KIND.into(),
            with,
        };
        let mut link = DeleteKeys::from_doc(&doc).expect("build link");

        let mut ctx = PipelineContext::new();
        assert!(link.execute(&mut ctx).is_err(), "default must_exist=true fails on absent key");
    }
}
