//! Link contract: the lifecycle every processing unit implements.
//!
//! A link moves through `Configured -> Initialized -> (Executing)* ->
//! Finalized`. Construction consumes a typed options struct (unknown keys
//! rejected), initialize validates required options and may open resources,
//! execute does the actual work against the context and may run once per
//! micro-batch, and finalize releases resources once the chain is done.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::PipelineContext;
use crate::error::EngineError;

/// Result code of a lifecycle call, consumed by the chain and the process
/// manager to decide whether to continue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    /// Continue with the next link.
    Success,
    /// Abort the owning chain and the run.
    Failure,
    /// Skip the remaining links of the owning chain; not a failure.
    SkipChainRemainder,
    /// Re-invoke this link's execute, e.g. for the next micro-batch.
    Repeat,
    /// End the whole run cleanly without visiting later chains.
    StopProcessing,
}

impl Outcome {
    /// Whether this code lets the run carry on (everything but `Failure`).
    pub fn is_success(self) -> bool {
        !matches!(self, Outcome::Failure)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::SkipChainRemainder => "skip-chain-remainder",
            Outcome::Repeat => "repeat",
            Outcome::StopProcessing => "stop-processing",
        };
        f.write_str(label)
    }
}

/// One configured processing step.
///
/// Implementations read inputs from and publish outputs to the context's
/// store, and may look up services. They never swallow engine errors:
/// a missing or mistyped input propagates with `?` and the owning chain
/// records it as this link's failure.
pub trait Link {
    /// Instance name, used in reports and diagnostics.
    fn name(&self) -> &str;

    /// Validates required options and performs one-time setup. Runs once,
    /// before the first execute.
    fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        Ok(Outcome::Success)
    }

    /// Performs the link's work. May be invoked repeatedly when the link
    /// itself returns [`Outcome::Repeat`].
    fn execute(&mut self, ctx: &mut PipelineContext) -> Result<Outcome, EngineError>;

    /// Releases resources and writes deferred aggregate output. Runs once
    /// for every link that reached Initialized, even when a sibling failed.
    fn finalize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
        Ok(Outcome::Success)
    }
}

/// Deserializes a descriptor `with:` map into a link's typed options
/// struct. Unknown keys fail with a configuration error naming the link, so
/// a typo dies at construction instead of being silently ignored.
pub fn options_from_with<T: DeserializeOwned>(link: &str, with: &IndexMap<String, Value>) -> Result<T, EngineError> {
    let mut map = serde_json::Map::with_capacity(with.len());
    for (key, value) in with {
        map.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(map)).map_err(|error| EngineError::configuration(link, error.to_string()))
}

/// Initialize-time check that a required string option is non-empty.
pub fn require_non_empty(link: &str, option: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::configuration(
            link,
            format!("{option} must be a non-empty string"),
        ));
    }
    Ok(())
}
