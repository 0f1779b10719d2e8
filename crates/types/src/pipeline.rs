//! Strongly typed pipeline document schema.
//!
//! Every field an author can write is declared here; unknown keys are
//! rejected at parse time so a typo fails the run before anything executes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level pipeline document.
///
/// A document may carry only settings, only chains, or any mix; composing
/// several partial documents through `includes` is the normal way larger
/// analyses are assembled.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineDoc {
    /// Run-wide settings applied to the configuration service before any
    /// included document is loaded and before chains are assembled.
    #[serde(default)]
    pub settings: Option<SettingsDoc>,

    /// Further pipeline documents merged into the run, in order.
    ///
    /// Relative paths resolve against the configured pipelines directory,
    /// falling back to the including document's own directory.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Ordered chains appended to the run after all includes.
    #[serde(default)]
    pub chains: Vec<ChainDoc>,
}

/// Recognized run settings.
///
/// Only the keys enumerated here are accepted; every field is optional and
/// untouched configuration values keep their previous state, which lets an
/// included document override just the settings it cares about.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SettingsDoc {
    /// Analysis name used to derive persistence paths. Must be path-safe.
    #[serde(default)]
    pub analysis_name: Option<String>,

    /// Version namespace for persisted artifacts.
    #[serde(default)]
    pub version: Option<u32>,

    /// When true, the store and configuration are not persisted at
    /// checkpoints.
    #[serde(default)]
    pub do_not_store_results: Option<bool>,

    /// Base directory relative include paths resolve against.
    #[serde(default)]
    pub pipelines_dir: Option<String>,

    /// Base directory persisted snapshots are written under.
    #[serde(default)]
    pub results_dir: Option<String>,
}

/// One named, ordered sequence of links.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChainDoc {
    /// Chain name, unique within the run.
    pub name: String,

    /// Links executed strictly in list order.
    #[serde(default)]
    pub links: Vec<LinkDoc>,
}

/// One configured processing step.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LinkDoc {
    /// Optional instance name; falls back to the kind tag.
    #[serde(default)]
    pub name: Option<String>,

    /// Registered link kind tag, e.g. `assert_in_store`.
    pub kind: String,

    /// Options handed to the link factory, in authoring order. The factory
    /// rejects any key its kind does not recognize.
    #[serde(default)]
    pub with: IndexMap<String, Value>,
}

impl LinkDoc {
    /// Display label for diagnostics: the instance name when present and
    /// non-blank, otherwise the kind tag.
    pub fn label(&self) -> &str {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.kind,
        }
    }
}
