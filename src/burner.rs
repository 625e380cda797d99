//! Old-network account burning
//!
//! Before the migration service will move an account, the account's signing
//! authority on the old network has to be removed for good. A previous run
//! may have burned the account and then died, so the burner always checks
//! first and only submits the burn transaction for `NotBurned` accounts.

use tracing::{debug, info};

use crate::error::{GatewayError, MigrationError};
use crate::events::EventsNotifier;
use crate::gateway::AccountHandle;
use crate::retry::{retry_on_server_error, MAX_RETRIES};
use crate::types::{BurnOutcome, CheckBurnOutcome};

pub struct AccountBurner {
    notifier: EventsNotifier,
    max_attempts: u32,
}

impl AccountBurner {
    pub fn new(notifier: EventsNotifier) -> Self {
        Self::with_max_attempts(notifier, MAX_RETRIES)
    }

    pub fn with_max_attempts(notifier: EventsNotifier, max_attempts: u32) -> Self {
        Self {
            notifier,
            max_attempts,
        }
    }

    /// Check the account and burn it if it is still usable
    pub async fn start(&self, account: &dyn AccountHandle) -> Result<BurnOutcome, MigrationError> {
        let public_address = account
            .public_address()
            .ok_or_else(|| MigrationError::failed("account not valid - public address is missing"))?;

        let outcome = match self.check_burned(account).await? {
            CheckBurnOutcome::NotBurned => self.burn(&public_address, account).await?,
            CheckBurnOutcome::AlreadyBurned => BurnOutcome::AlreadyBurned,
            CheckBurnOutcome::NoAccount => BurnOutcome::NoAccount,
            CheckBurnOutcome::NoTrustAnchor => BurnOutcome::NoTrustAnchor,
        };
        info!(%public_address, %outcome, "Burn phase finished");
        Ok(outcome)
    }

    /// Whether the old account still needs burning
    pub async fn check_burned(&self, account: &dyn AccountHandle) -> Result<CheckBurnOutcome, MigrationError> {
        let public_address = account.public_address().unwrap_or_default();
        self.notifier.on_check_burn_started(&public_address);

        let result = retry_on_server_error("check_burned", self.max_attempts, || account.is_burned()).await;
        let outcome = match result {
            Ok(true) => CheckBurnOutcome::AlreadyBurned,
            Ok(false) => CheckBurnOutcome::NotBurned,
            Err(GatewayError::NotFound(_)) => CheckBurnOutcome::NoAccount,
            Err(GatewayError::NotActivated(_)) => CheckBurnOutcome::NoTrustAnchor,
            Err(e @ GatewayError::Server { .. }) | Err(e @ GatewayError::Other(_)) => {
                let err = MigrationError::failed_with("Checking if the old account is burned has failed", e);
                self.notifier.on_check_burn_failed(&public_address, &err);
                return Err(err);
            }
        };

        self.notifier.on_check_burn_succeeded(&public_address, outcome);
        Ok(outcome)
    }

    /// Submit the burn transaction for an account known to be unburned
    pub async fn burn(&self, public_address: &str, account: &dyn AccountHandle) -> Result<BurnOutcome, MigrationError> {
        self.notifier.on_burn_started(public_address);

        let result = retry_on_server_error("burn", self.max_attempts, || account.burn()).await;
        let outcome = match result {
            Ok(transaction_id) if transaction_id.trim().is_empty() => {
                let err = MigrationError::failed(
                    "Burning the account could not succeed due to an unexpected error, transaction id is empty",
                );
                self.notifier.on_burn_failed(public_address, &err);
                return Err(err);
            }
            Ok(transaction_id) => {
                debug!(public_address, %transaction_id, "Burn transaction submitted");
                BurnOutcome::Burned
            }
            Err(GatewayError::NotFound(_)) => BurnOutcome::NoAccount,
            Err(GatewayError::NotActivated(_)) => BurnOutcome::NoTrustAnchor,
            Err(e @ GatewayError::Server { .. }) | Err(e @ GatewayError::Other(_)) => {
                let err = MigrationError::failed_with("Burning the old account failed", e);
                self.notifier.on_burn_failed(public_address, &err);
                return Err(err);
            }
        };

        self.notifier.on_burn_succeeded(public_address, outcome);
        Ok(outcome)
    }
}
