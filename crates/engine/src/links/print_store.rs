//! Logs the store contents for inspection.

use serde::Deserialize;
use tracing::info;

use linkwork_types::LinkDoc;

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome, options_from_with};
use crate::store::value_kind;

const PREVIEW_CHARS: usize = 80;

/// Options recognized by [`PrintStore`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrintStoreOptions {
    /// When set, only these keys are printed; otherwise every entry is.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
}

/// Link that logs each entry's key, kind tag, and a value preview.
pub struct PrintStore {
    name: String,
    options: PrintStoreOptions,
}

impl PrintStore {
    /// Kind tag used in pipeline documents.
    pub const KIND: &'static str = "print_store";

    /// Creates the link with already-typed options.
    pub fn new(name: impl Into<String>, options: PrintStoreOptions) -> Self {
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

impl Link for PrintStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        let filter = self.options.keys.as_deref();
        let mut printed = 0usize;
        for (key, value) in ctx.store.iter() {
            if let Some(keys) = filter
                && !keys.iter().any(|wanted| wanted == key)
            {
                continue;
            }
            let rendered = serde_json::to_string(value).unwrap_or_else(|_| "<unprintable>".into());
            info!(
                link = %self.name,
                key = %key,
                kind = value_kind(value),
                value = %preview(&rendered),
                "store entry"
            );
            printed += 1;
        }
        info!(link = %self.name, entries = printed, total = ctx.store.len(), "store printed");
        Ok(Outcome::Success)
    }
}

fn preview(rendered: &str) -> String {
    if rendered.chars().count() <= PREVIEW_CHARS {
        return rendered.to_string();
    }
    let truncated: String = rendered.chars().take(PREVIEW_CHARS).collect();
    format!("{truncated}...")
}
