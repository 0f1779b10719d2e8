//! Shared pipeline descriptor definitions used by the Linkwork engine and CLI.
//!
//! A pipeline is authored as a declarative YAML or JSON document: a
//! `settings:` block with the recognized run configuration, an optional
//! `includes:` list composing further documents, and an ordered list of
//! chains, each holding an ordered list of links. The models here
//! intentionally preserve authoring order (via `IndexMap`) so link options
//! and chain sequences are handled in the order the author wrote them.

pub mod pipeline;

pub use pipeline::{ChainDoc, LinkDoc, PipelineDoc, SettingsDoc};
