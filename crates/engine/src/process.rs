//! Process manager: owner of the ordered chains, the execution context,
//! and the persistence checkpoints.
//!
//! One manager is one run. It is constructed explicitly, carries its own
//! context (store + services, with the configuration registered as the
//! `"config"` service), and drives the initialize/execute/finalize cycle
//! across every chain in insertion order.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::assembly::{self, LinkRegistry};
use crate::chain::{Chain, ChainReport};
use crate::config::{CONFIG_SERVICE_KIND, RunConfig};
use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::Outcome;
use crate::persistence::{self, PersistenceError};
use crate::store::DataStore;

/// Label of the checkpoint written when the whole run completes.
pub const RUN_END_LABEL: &str = "run_end";

/// When the store and configuration are snapshotted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointPolicy {
    /// One snapshot at run end (the default).
    #[default]
    RunEnd,
    /// A snapshot at every chain boundary, plus the run-end snapshot.
    EveryChain,
}

/// Aggregated result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    /// `Success` unless a chain failed or a checkpoint could not be written.
    pub outcome: Outcome,
    /// Per-chain reports, in execution order, up to the stopping chain.
    pub chains: Vec<ChainReport>,
    /// Chain that stopped the run, when the outcome is `Failure`.
    pub failed_chain: Option<String>,
    /// Link inside the failed chain that produced the failure.
    pub failed_link: Option<String>,
    /// Error text when a persistence checkpoint failed.
    pub persistence_error: Option<String>,
}

/// Owner of the ordered chains and the run context.
pub struct ProcessManager {
    chains: Vec<Chain>,
    context: PipelineContext,
    registry: LinkRegistry,
    checkpoint: CheckpointPolicy,
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessManager {
    /// Creates a manager with a fresh context, a default configuration
    /// registered as the `"config"` service, and the built-in link kinds.
    pub fn new() -> Self {
        Self::with_config(RunConfig::default())
    }

    /// Creates a manager whose configuration service starts from `config`.
    pub fn with_config(config: RunConfig) -> Self {
        let mut context = PipelineContext::new();
        let seed = config;
        context
            .services
            .register(CONFIG_SERVICE_KIND, move || RefCell::new(seed.clone()));
        Self {
            chains: Vec::new(),
            context,
            registry: LinkRegistry::with_builtins(),
            checkpoint: CheckpointPolicy::default(),
        }
    }

    /// Handle to the configuration service.
    pub fn config(&mut self) -> Rc<RefCell<RunConfig>> {
        self.context
            .config()
            .expect("config service is registered at construction")
    }

    /// Read access to the run context.
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Mutable access to the run context, e.g. to seed store entries or
    /// register additional services before the run.
    pub fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.context
    }

    /// Link-kind registry used by the pipeline loader.
    pub fn link_registry(&self) -> &LinkRegistry {
        &self.registry
    }

    /// Mutable registry access, for registering caller-defined link kinds.
    pub fn link_registry_mut(&mut self) -> &mut LinkRegistry {
        &mut self.registry
    }

    /// Sets when checkpoints are written.
    pub fn set_checkpoint_policy(&mut self, policy: CheckpointPolicy) {
        self.checkpoint = policy;
    }

    /// Appends a new, empty chain and returns it for link registration.
    /// Chain names are unique within a run.
    pub fn add_chain(&mut self, name: impl Into<String>) -> Result<&mut Chain, EngineError> {
        let name = name.into();
        if self.chains.iter().any(|chain| chain.name() == name) {
            return Err(EngineError::Assembly(format!("chain '{name}' already exists")));
        }
        debug!(chain = %name, "chain added");
        self.chains.push(Chain::new(name));
        Ok(self.chains.last_mut().expect("chain pushed above"))
    }

    /// Looks up a chain by name.
    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.name() == name)
    }

    /// Looks up a chain by name, mutably.
    pub fn chain_mut(&mut self, name: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|chain| chain.name() == name)
    }

    /// Chain names in execution order.
    pub fn chain_names(&self) -> impl Iterator<Item = &str> {
        self.chains.iter().map(Chain::name)
    }

    /// Parses a pipeline document and appends its settings, includes, and
    /// chains to this run. May be called several times to compose a
    /// pipeline incrementally; settings already applied remain visible to
    /// every later document.
    pub fn load_pipeline_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        assembly::load_into(self, path.as_ref())
    }

    /// Installs a restored store and configuration as the active state,
    /// replacing the current store contents and configuration values.
    pub fn install_snapshot(&mut self, store: DataStore, config: RunConfig) {
        self.context.store = store;
        *self.config().borrow_mut() = config;
    }

    /// Runs every chain in insertion order.
    ///
    /// Each chain runs and then finalizes its initialized links. A
    /// `Failure` stops the run and is surfaced with the failing chain and
    /// link; `SkipChainRemainder` moves on to the next chain;
    /// `StopProcessing` ends the run cleanly without visiting later
    /// chains. Checkpoints are written per policy unless the configuration
    /// suppresses persistence; a failed run never reaches the run-end
    /// checkpoint.
    pub fn execute_all(&mut self) -> RunReport {
        let chain_count = self.chains.len();
        let started = Instant::now();
        info!(chains = chain_count, "starting pipeline run");

        let mut reports: Vec<ChainReport> = Vec::with_capacity(chain_count);
        let mut outcome = Outcome::Success;
        let mut failed_chain = None;
        let mut failed_link = None;
        let mut persistence_error = None;

        for index in 0..chain_count {
            let report = {
                let Self { chains, context, .. } = self;
                let chain = &mut chains[index];
                info!(chain = chain.name(), position = index + 1, total = chain_count, "running chain");
                let report = chain.run(context);
                chain.finalize(context);
                report
            };

            let chain_name = report.chain.clone();
            let chain_outcome = report.outcome;
            if chain_outcome == Outcome::Failure {
                failed_link = report.failed_link.clone();
            }
            reports.push(report);

            match chain_outcome {
                Outcome::Failure => {
                    error!(
                        chain = %chain_name,
                        link = failed_link.as_deref().unwrap_or("<none>"),
                        "chain failed; aborting run"
                    );
                    outcome = Outcome::Failure;
                    failed_chain = Some(chain_name);
                    break;
                }
                Outcome::StopProcessing => {
                    info!(chain = %chain_name, "stop requested; ending run early");
                    break;
                }
                Outcome::SkipChainRemainder => {
                    info!(chain = %chain_name, "chain remainder skipped; continuing with next chain");
                }
                _ => {}
            }

            if self.checkpoint == CheckpointPolicy::EveryChain
                && let Err(error) = self.checkpoint_now(&chain_name)
            {
                error!(chain = %chain_name, %error, "chain checkpoint failed; aborting run");
                outcome = Outcome::Failure;
                failed_chain = Some(chain_name);
                persistence_error = Some(error.to_string());
                break;
            }
        }

        if outcome.is_success()
            && let Err(error) = self.checkpoint_now(RUN_END_LABEL)
        {
            error!(%error, "run-end checkpoint failed");
            outcome = Outcome::Failure;
            persistence_error = Some(error.to_string());
        }

        info!(
            %outcome,
            chains_run = reports.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run finished"
        );

        RunReport {
            outcome,
            chains: reports,
            failed_chain,
            failed_link,
            persistence_error,
        }
    }

    /// Snapshots the store and configuration under `label` now, honoring
    /// the suppression flag. Returns the artifact directory when a
    /// snapshot was written.
    pub fn checkpoint_now(&mut self, label: &str) -> Result<Option<PathBuf>, PersistenceError> {
        let config_snapshot = self.config().borrow().clone();
        if config_snapshot.do_not_store_results {
            debug!(label, "persistence suppressed by configuration");
            return Ok(None);
        }

        let dir = persistence::snapshot_dir(
            &config_snapshot.results_dir,
            &config_snapshot.analysis_name,
            config_snapshot.version,
            label,
        );
        persistence::snapshot(&self.context.store, &config_snapshot, &dir)?;
        Ok(Some(dir))
    }
}
