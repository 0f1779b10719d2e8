//! Copies a store value from one key to another, optionally checking its
//! kind on the way.

use serde::Deserialize;
use tracing::debug;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with, require_non_empty};
use crate::store::{StoreError, value_kind};

const KNOWN_KINDS: [&str; 6] = ["null", "boolean", "number", "string", "array", "object"];

/// Options recognized by [`CopyValue`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyValueOptions {
    /// Key the value is read from.
    pub read_key: String,
    /// Key the value is written to.
    pub store_key: String,
    /// Kind tag the source value must carry, one of `null`, `boolean`,
    /// `number`, `string`, `array`, `object`.
    #[serde(default)]
    pub expect: Option<String>,
}

/// Link that republishes the value at `read_key` under `store_key`.
pub struct CopyValue {
    name: String,
    options: CopyValueOptions,
}

impl CopyValue {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "copy_value";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: CopyValueOptions) -> Self {
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

impl Link for CopyValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        require_non_empty(&self.name, "read_key", &self.options.read_key)?;
        require_non_empty(&self.name, "store_key", &self.options.store_key)?;
        if let Some(expect) = &self.options.expect
            && !KNOWN_KINDS.contains(&expect.as_str())
        {
            return Err(EngineError::configuration(
                &self.name,
                format!("expect must be one of {KNOWN_KINDS:?}, got '{expect}'"),
            ));
        }
        Ok(Outcome::Success)
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        let value = ctx
            .store
            .get(&self.options.read_key)
            .ok_or_else(|| StoreError::KeyNotFound(self.options.read_key.clone()))?;

        if let Some(expect) = &self.options.expect {
            let actual = value_kind(value);
            if actual != expect {
                return Err(StoreError::TypeMismatch {
                    key: self.options.read_key.clone(),
                    expected: KNOWN_KINDS
                        .iter()
                        .find(|kind| *kind == expect)
                        .copied()
                        .unwrap_or("unknown"),
                    actual,
                }
                .into());
            }
        }

        let value = value.clone();
        debug!(link = %self.name, from = %self.options.read_key, to = %self.options.store_key, "copying value");
        ctx.store.set(&self.options.store_key, value);
        Ok(Outcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link(read_key: &str, store_key: &str, expect: Option<&str>) -> CopyValue {
        CopyValue::new(
            "copy",
            CopyValueOptions {
                read_key: read_key.into(),
                store_key: store_key.into(),
                expect: expect.map(str::to_string),
            },
        )
    }

    #[test]
    fn copies_the_value() {
        let mut ctx = PipelineContext::new();
        ctx.store.set("source", json!([1, 2]));

        let mut copy = link("source", "target", Some("array"));
        assert_eq!(copy.initialize(&mut ctx).expect("initialize"), Outcome::Success);
        assert_eq!(copy.execute(&mut ctx).expect("execute"), Outcome::Success);
        assert_eq!(ctx.store.get("target"), Some(&json!([1, 2])));
        assert!(ctx.store.contains_key("source"), "source stays in place");
    }

    #[test]
    fn kind_mismatch_fails_the_copy() {
        let mut ctx = PipelineContext::new();
        ctx.store.set("source", json!("text"));

        let mut copy = link("source", "target", Some("array"));
        let error = copy.execute(&mut ctx).expect_err("mismatch must fail");
        assert!(matches!(
            error,
            EngineError::Store(StoreError::TypeMismatch { ref key, expected: "array", actual: "string" }) if key == "source"
        ));
        assert!(!ctx.store.contains_key("target"));
    }

    #[test]
    fn missing_source_key_fails() {
        let mut ctx = PipelineContext::new();
        let mut copy = link("absent", "target", None);
        let error = copy.execute(&mut ctx).expect_err("missing key must fail");
        assert!(matches!(error, EngineError::Store(StoreError::KeyNotFound(_))));
    }

    #[test]
    fn empty_read_key_is_a_configuration_error() {
        let mut ctx = PipelineContext::new();
        let mut copy = link("", "target", None);
        let error = copy.initialize(&mut ctx).expect_err("blank read_key must fail");
        assert!(matches!(error, EngineError::Configuration { .. }));
    }

    #[test]
    fn unknown_expected_kind_is_rejected_at_initialize() {
        let mut ctx = PipelineContext::new();
        let mut copy = link("source", "target", Some("dataframe"));
        let error = copy.initialize(&mut ctx).expect_err("unknown kind must fail");
        assert!(error.to_string().contains("dataframe"));
    }
}
