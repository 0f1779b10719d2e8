//! # Linkwork Engine
//!
//! A strictly sequential execution engine for composable analysis
//! pipelines: named links grouped into ordered chains, a shared keyed
//! store for intermediate results, lazily constructed singleton services,
//! and snapshot/restore persistence so multi-session analyses resume
//! without recomputation.
//!
//! ## Key pieces
//!
//! - **`store`**: insertion-ordered key/value exchange with tagged typed
//!   reads
//! - **`services`**: singleton-per-kind service registry, configuration
//!   included
//! - **`link` / `chain`**: the configure → initialize → execute → finalize
//!   lifecycle and the ordered sequences that drive it
//! - **`process`**: the process manager owning chains, context, and
//!   checkpoints
//! - **`persistence`**: deterministic snapshot paths with atomic writes
//! - **`assembly` / `links`**: declarative pipeline documents and the
//!   built-in link library
//!
//! ## Usage
//!
//! ```rust
//! use linkwork_engine::{Outcome, ProcessManager};
//! use linkwork_engine::links::set_value::{SetValue, SetValueOptions};
//! use serde_json::json;
//!
//! let mut manager = ProcessManager::new();
//! manager.config().borrow_mut().do_not_store_results = true;
//!
//! let load = manager.add_chain("load")?;
//! load.add_link(Box::new(SetValue::new(
//!     "write_raw",
//!     SetValueOptions {
//!         store_key: "raw".into(),
//!         value: json!([1, 2, 3]),
//!     },
//! )))?;
//!
//! let report = manager.execute_all();
//! assert_eq!(report.outcome, Outcome::Success);
//! assert!(manager.context().store.contains_key("raw"));
//! # Ok::<(), linkwork_engine::EngineError>(())
//! ```
//!
//! Pipelines are normally assembled from declarative YAML/JSON documents
//! instead; see [`ProcessManager::load_pipeline_file`] and the
//! [`assembly`] module.

pub mod assembly;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod link;
pub mod links;
pub mod persistence;
pub mod process;
pub mod services;
pub mod store;

pub use assembly::{LinkRegistry, parse_pipeline_file};
pub use chain::{Chain, ChainReport, MAX_EXECUTE_REPEATS};
pub use config::{CONFIG_SERVICE_KIND, ConfigError, RunConfig};
pub use context::PipelineContext;
pub use error::EngineError;
pub use link::{Link, Outcome};
pub use persistence::{PersistenceError, restore, snapshot, snapshot_dir};
pub use process::{CheckpointPolicy, ProcessManager, RUN_END_LABEL, RunReport};
pub use services::{ServiceError, ServiceRegistry};
pub use store::{DataStore, StoreError};
