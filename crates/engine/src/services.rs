//! Process-wide singleton services, looked up by kind tag.
//!
//! A service is any utility object shared by every link in a run: the
//! configuration object, an external-connection manager, a template cache.
//! Each kind registers a factory once; the instance is constructed lazily on
//! first lookup and every later lookup returns the identical handle. The
//! registry lives inside the execution context and is passed explicitly, so
//! independent runs (and parallel test cases) never share state.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

/// Error surfaced by service lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// No factory was registered for the requested kind; this indicates a
    /// pipeline-assembly mistake, not a runtime condition.
    #[error("no factory registered for service kind '{0}'")]
    NotRegistered(String),
    /// The cached instance holds a different concrete type than requested.
    #[error("service kind '{kind}' holds a different concrete type than requested")]
    WrongType {
        /// Kind tag whose instance failed to downcast.
        kind: String,
    },
}

type ServiceFactory = Box<dyn Fn() -> Rc<dyn Any>>;

/// Table of lazily constructed singleton services.
#[derive(Default)]
pub struct ServiceRegistry {
    factories: HashMap<String, ServiceFactory>,
    instances: HashMap<String, Rc<dyn Any>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for `kind`, replacing any previous factory.
    /// The cached instance (if any) is left untouched; call [`reset`] to
    /// force reconstruction through the new factory.
    ///
    /// [`reset`]: ServiceRegistry::reset
    pub fn register<T, F>(&mut self, kind: impl Into<String>, factory: F)
    where
        T: Any,
        F: Fn() -> T + 'static,
    {
        self.factories.insert(kind.into(), Box::new(move || Rc::new(factory())));
    }

    /// Whether a factory exists for `kind`.
    pub fn is_registered(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Returns the singleton instance for `kind`, constructing it through
    /// the registered factory on first lookup. Subsequent lookups return a
    /// handle to the identical instance for the registry's lifetime.
    pub fn service<T: Any>(&mut self, kind: &str) -> Result<Rc<T>, ServiceError> {
        if !self.instances.contains_key(kind) {
            let factory = self
                .factories
                .get(kind)
                .ok_or_else(|| ServiceError::NotRegistered(kind.to_string()))?;
            debug!(kind, "constructing service instance");
            let instance = factory();
            self.instances.insert(kind.to_string(), instance);
        }

        let instance = Rc::clone(self.instances.get(kind).expect("instance cached above"));
        instance.downcast::<T>().map_err(|_| ServiceError::WrongType { kind: kind.to_string() })
    }

    /// Drops the cached instance for `kind`, keeping its factory, so the
    /// next lookup constructs a fresh instance. Returns whether an instance
    /// was actually dropped. Used between independent test runs.
    pub fn reset(&mut self, kind: &str) -> bool {
        self.instances.remove(kind).is_some()
    }

    /// Drops every cached instance, keeping all factories.
    pub fn reset_all(&mut self) {
        self.instances.clear();
    }

    /// Registered kinds, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        registered.sort_unstable();
        let mut live: Vec<&str> = self.instances.keys().map(String::as_str).collect();
        live.sort_unstable();
        f.debug_struct("ServiceRegistry")
            .field("registered", &registered)
            .field("live", &live)
            .finish()
    }
}
