//! Migration service client
//!
//! One POST per request to `{migration_service_url}{public_address}`. A 2xx
//! answer means the account was migrated. Anything else carries a JSON
//! `{code, message}` body that is mapped onto a `MigrationOutcome` or a hard
//! failure. Server errors are retried by the `RetryInterceptor` underneath.

mod transport;

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::NetworkInfo;
use crate::error::MigrationError;
use crate::events::EventsNotifier;
use crate::retry::MAX_RETRIES;
use crate::types::{MigrationOutcome, ServiceErrorCode};

pub use transport::{HttpReply, HttpTransport, MigrationTransport, RetryInterceptor, TransportError};

/// Business error reported by the migration service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}, code = {code} (status {status})")]
pub struct ServiceError {
    pub status: u16,
    pub code: ServiceErrorCode,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) => Some(code.clone()),
            serde_json::Value::Number(code) => Some(code.to_string()),
            _ => None,
        }
    }

    /// Message text; non-string values are kept in their JSON form
    fn message(&self) -> String {
        match &self.message {
            Some(serde_json::Value::String(message)) => message.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

pub struct MigrationRequester {
    network: NetworkInfo,
    transport: RetryInterceptor<Arc<dyn MigrationTransport>>,
    notifier: EventsNotifier,
}

impl MigrationRequester {
    pub fn new(network: NetworkInfo, transport: Arc<dyn MigrationTransport>, notifier: EventsNotifier) -> Self {
        Self::with_max_attempts(network, transport, notifier, MAX_RETRIES)
    }

    pub fn with_max_attempts(
        network: NetworkInfo,
        transport: Arc<dyn MigrationTransport>,
        notifier: EventsNotifier,
        max_attempts: u32,
    ) -> Self {
        Self {
            network,
            transport: RetryInterceptor::with_max_attempts(transport, max_attempts),
            notifier,
        }
    }

    /// Ask the service to migrate `public_address`
    ///
    /// # Returns
    /// * `Migrated` - service accepted the migration
    /// * `AlreadyMigrated` - service had migrated the account before
    /// * `NoAccountToMigrate` - service does not know the account
    pub async fn request_migration(&self, public_address: &str) -> Result<MigrationOutcome, MigrationError> {
        self.notifier.on_request_migration_started(public_address);

        let url = self.network.migration_url(public_address);
        let result = match self.transport.post_empty(&url).await {
            Ok(reply) => Self::classify(reply),
            Err(e) => Err(MigrationError::failed_with("Migration request could not be sent", e)),
        };

        match result {
            Ok(outcome) => {
                info!(public_address, %outcome, "Migration request finished");
                self.notifier.on_request_migration_succeeded(public_address, outcome);
                Ok(outcome)
            }
            Err(err) => {
                self.notifier.on_request_migration_failed(public_address, &err);
                Err(err)
            }
        }
    }

    /// Map a service reply onto an outcome or a hard failure
    pub fn classify(reply: HttpReply) -> Result<MigrationOutcome, MigrationError> {
        if reply.is_success() {
            return Ok(MigrationOutcome::Migrated);
        }

        let body = match reply.body.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => body,
            _ => {
                return Err(MigrationError::failed(format!(
                    "Body is empty, response code is = {}",
                    reply.status
                )))
            }
        };

        let parsed: ErrorBody = serde_json::from_str(body)
            .map_err(|e| MigrationError::failed_with("Json parsing failed", e))?;
        let code = parsed.code().ok_or_else(|| {
            MigrationError::failed(format!(
                "Migration not completed due to an unexpected response, status = {}",
                reply.status
            ))
        })?;

        let error = ServiceError {
            status: reply.status,
            code: ServiceErrorCode::parse(&code),
            message: parsed.message(),
        };
        match error.code {
            ServiceErrorCode::AlreadyMigrated => Ok(MigrationOutcome::AlreadyMigrated),
            ServiceErrorCode::AccountNotFound => Ok(MigrationOutcome::NoAccountToMigrate),
            ServiceErrorCode::AccountNotBurned => {
                Err(MigrationError::failed_with("The old account is not burned", error))
            }
            ServiceErrorCode::InvalidAddressFormat => {
                Err(MigrationError::failed_with("The public address is not valid", error))
            }
            ServiceErrorCode::Unknown(_) => Err(MigrationError::failed_with(
                "Got an unexpected migration error from the service",
                error,
            )),
        }
    }
}
