//! Engine error taxonomy.
//!
//! One explicit channel carries every unit failure: lifecycle calls return
//! `Result<Outcome, EngineError>`, and the owning chain folds an `Err` into
//! a `Failure` outcome with the error preserved in its report.

use thiserror::Error;

use crate::persistence::PersistenceError;
use crate::services::ServiceError;
use crate::store::StoreError;

/// Errors a link or engine component can surface during a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad, missing, or unrecognized option at construction or initialize
    /// time. Always fatal to the link and aborts the owning chain.
    #[error("configuration error in link '{link}': {message}")]
    Configuration {
        /// Link instance the option belongs to.
        link: String,
        /// What was wrong with the option.
        message: String,
    },

    /// Pipeline assembly violation: duplicate chain name, unknown link
    /// kind, or mutation of a chain after execution started.
    #[error("pipeline assembly error: {0}")]
    Assembly(String),

    /// Required store key absent, or present with the wrong kind.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Service lookup failed; indicates an assembly mistake.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Snapshot or restore failed. Fatal to that operation only; completed
    /// in-memory results stay valid.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl EngineError {
    /// Builds a [`EngineError::Configuration`] for `link`.
    pub fn configuration(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            link: link.into(),
            message: message.into(),
        }
    }
}
