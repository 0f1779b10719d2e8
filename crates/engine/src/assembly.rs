//! Pipeline assembly: parsing declarative pipeline documents and turning
//! them into chains of constructed links.
//!
//! Pipelines are data, not code. A document is parsed and validated before
//! anything is assembled; `includes:` composes further documents
//! depth-first, with settings applied before any included document loads so
//! the already-mutated configuration is visible to them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use tracing::debug;

use linkwork_types::{LinkDoc, PipelineDoc};

use crate::error::EngineError;
use crate::link::Link;
use crate::process::ProcessManager;

/// Factory constructing a link instance from its descriptor entry.
pub type LinkFactory = Box<dyn Fn(&LinkDoc) -> Result<Box<dyn Link>, EngineError>>;

/// Table of link kinds the loader can construct.
pub struct LinkRegistry {
    factories: IndexMap<String, LinkFactory>,
}

impl LinkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Creates a registry with every built-in link kind registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::links::register_builtins(&mut registry);
        registry
    }

    /// Registers a factory for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&LinkDoc) -> Result<Box<dyn Link>, EngineError> + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Whether a factory exists for `kind`.
    pub fn is_registered(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Constructs the link described by `doc`.
    pub fn build(&self, doc: &LinkDoc) -> Result<Box<dyn Link>, EngineError> {
        let factory = self
            .factories
            .get(&doc.kind)
            .ok_or_else(|| EngineError::Assembly(format!("unknown link kind '{}'", doc.kind)))?;
        factory(doc)
    }
}

impl Default for LinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.kinds().collect();
        f.debug_struct("LinkRegistry").field("kinds", &kinds).finish()
    }
}

/// Reads and parses one pipeline document (YAML, or JSON as a YAML subset).
pub fn parse_pipeline_file(path: impl AsRef<Path>) -> Result<PipelineDoc> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read pipeline file: {}", path.display()))?;
    let doc: PipelineDoc = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse pipeline document: {}", path.display()))?;
    Ok(doc)
}

/// Loads `path` into `manager`: settings first, then includes depth-first,
/// then the document's own chains.
pub fn load_into(manager: &mut ProcessManager, path: &Path) -> Result<()> {
    let mut loading = Vec::new();
    load_recursive(manager, path, &mut loading)
}

fn load_recursive(manager: &mut ProcessManager, path: &Path, loading: &mut Vec<PathBuf>) -> Result<()> {
    let canonical =
        fs::canonicalize(path).with_context(|| format!("pipeline file not found: {}", path.display()))?;
    if loading.contains(&canonical) {
        let chain: Vec<String> = loading.iter().map(|entry| entry.display().to_string()).collect();
        bail!("include cycle detected: {} -> {}", chain.join(" -> "), canonical.display());
    }
    loading.push(canonical);

    let doc = parse_pipeline_file(path)?;
    debug!(
        path = %path.display(),
        includes = doc.includes.len(),
        chains = doc.chains.len(),
        "loading pipeline document"
    );

    if let Some(settings) = &doc.settings {
        manager
            .config()
            .borrow_mut()
            .apply_settings(settings)
            .with_context(|| format!("invalid settings in '{}'", path.display()))?;
    }

    for include in &doc.includes {
        let resolved = resolve_include(manager, path, include);
        load_recursive(manager, &resolved, loading)
            .with_context(|| format!("while loading include '{}' of '{}'", include, path.display()))?;
    }

    for chain_doc in &doc.chains {
        let mut links = Vec::with_capacity(chain_doc.links.len());
        for link_doc in &chain_doc.links {
            let link = manager
                .link_registry()
                .build(link_doc)
                .with_context(|| format!("in chain '{}' of '{}'", chain_doc.name, path.display()))?;
            links.push(link);
        }
        let chain = manager.add_chain(chain_doc.name.clone())?;
        for link in links {
            chain.add_link(link)?;
        }
    }

    loading.pop();
    Ok(())
}

/// Resolves an include path: absolute paths pass through, relative paths
/// resolve against the configured pipelines directory when set, otherwise
/// against the including document's own directory.
fn resolve_include(manager: &mut ProcessManager, including: &Path, include: &str) -> PathBuf {
    let include_path = Path::new(include);
    if include_path.is_absolute() {
        return include_path.to_path_buf();
    }
    match manager.config().borrow().pipelines_dir.clone() {
        Some(base) => base.join(include_path),
        None => including.parent().unwrap_or_else(|| Path::new(".")).join(include_path),
    }
}
