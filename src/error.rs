//! Error types for the migration module
//!
//! `MigrationError` is what callers see, either synchronously from `start()`
//! or through `MigrationCallbacks::on_error`. `GatewayError` is the closed set
//! of failures a network gateway call can report; the burner and coordinator
//! switch on it exhaustively. `StoreError` covers the completion store.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Boxed proximate cause attached to `MigrationFailed`
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by the migration coordinator
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The version resolver could not tell which network is authoritative
    #[error("Failed to resolve the active network version: {0}")]
    FailedToResolveVersion(String),

    /// `start()` was called while another migration run was still active
    #[error("A migration is already in progress")]
    MigrationInProgress,

    /// A targeted start named an address that is not held locally
    #[error("Account {0} is not in the local list of accounts")]
    AccountNotInList(String),

    /// Umbrella failure for the burn and migration-request phases
    #[error("Migration failed: {reason}")]
    MigrationFailed {
        reason: String,
        #[source]
        cause: Option<Cause>,
    },

    /// The coordinator could not be built (no runtime, bad configuration, ...)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The completion store could not be opened
    #[error("Completion store error: {0}")]
    Store(#[from] StoreError),
}

impl MigrationError {
    /// `MigrationFailed` without a nested cause
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::MigrationFailed {
            reason: reason.into(),
            cause: None,
        }
    }

    /// `MigrationFailed` wrapping the error that caused it
    pub fn failed_with<E>(reason: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::MigrationFailed {
            reason: reason.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Whether this is the umbrella migration failure
    pub fn is_migration_failed(&self) -> bool {
        matches!(self, Self::MigrationFailed { .. })
    }
}

/// Outcome of a failed gateway call
///
/// Gateways translate whatever their SDK throws into one of these variants;
/// the orchestrator decides what each one means for the current phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The account does not exist on the network
    #[error("Account {0} was not found on the network")]
    NotFound(String),

    /// The account exists but has no trustline to the asset
    #[error("Account {0} is not activated")]
    NotActivated(String),

    /// The network answered with an HTTP error status
    #[error("Server responded with status {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other failure
    #[error("Gateway operation failed: {0}")]
    Other(String),
}

impl GatewayError {
    /// True for 5xx-equivalent failures, the only ones worth retrying
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { status, .. } if *status >= 500)
    }
}

/// Errors raised by a `CompletionStore`
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid store contents: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}
