//! Execution context threaded through every lifecycle call.
//!
//! The context bundles the two process-wide mutable resources — the shared
//! store and the service registry — into one explicitly constructed value.
//! Nothing is ambient or global: multiple independent contexts coexist
//! freely, each with its own store, services, and configuration.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{CONFIG_SERVICE_KIND, RunConfig};
use crate::services::{ServiceError, ServiceRegistry};
use crate::store::DataStore;

/// Shared state handed to links at initialize, execute, and finalize time.
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// Keyed exchange for inter-link data.
    pub store: DataStore,
    /// Singleton services, including the `"config"` entry.
    pub services: ServiceRegistry,
}

impl PipelineContext {
    /// Creates a context with an empty store and no registered services.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for looking up the configuration service.
    pub fn config(&mut self) -> Result<Rc<RefCell<RunConfig>>, ServiceError> {
        self.services.service(CONFIG_SERVICE_KIND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;

    #[test]
    fn config_lookup_requires_registration() {
        let mut context = PipelineContext::new();
        assert_eq!(
            context.config().expect_err("no config registered"),
            ServiceError::NotRegistered(CONFIG_SERVICE_KIND.into())
        );

        context
            .services
            .register(CONFIG_SERVICE_KIND, || RefCell::new(RunConfig::default()));
        let config = context.config().expect("config service");
        config.borrow_mut().version = 4;
        assert_eq!(context.config().expect("same service").borrow().version, 4);
    }
}
