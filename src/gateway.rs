//! Network gateway interfaces
//!
//! The coordinator never talks to a blockchain directly. Each network is
//! reached through an `AccountGateway` supplied by the SDK adapter layer, and
//! the authoritative network is reported by a `VersionResolver`. Gateway
//! calls report failures as `GatewayError` so the orchestrator can classify
//! them without knowing the SDK's exception types.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NetworkInfo;
use crate::error::GatewayError;
use crate::types::NetworkVersion;

/// A single local account as seen by one network
#[async_trait]
pub trait AccountHandle: Send + Sync + 'static {
    /// Public address of the account, `None` if the key was deleted
    fn public_address(&self) -> Option<String>;

    /// Whether the account's signing authority on the old network is gone
    ///
    /// # Returns
    /// * `Ok(true)` - account is burned
    /// * `Err(GatewayError::NotFound)` - account does not exist on the network
    /// * `Err(GatewayError::NotActivated)` - account has no trustline
    async fn is_burned(&self) -> Result<bool, GatewayError>;

    /// Submit the irrevocable burn transaction
    ///
    /// # Returns
    /// Transaction id; an empty id means the submission did not go through
    async fn burn(&self) -> Result<String, GatewayError>;
}

/// Local account storage and network access for one network
pub trait AccountGateway: Send + Sync + 'static {
    fn has_account(&self) -> bool;

    fn account_count(&self) -> usize;

    /// Account at `index`, `None` when out of range
    fn account(&self, index: usize) -> Option<Arc<dyn AccountHandle>>;

    /// Most recently added account, the one migrated by default
    fn primary_account(&self) -> Option<Arc<dyn AccountHandle>> {
        self.account_count()
            .checked_sub(1)
            .and_then(|index| self.account(index))
    }

    /// Local account with the given public address
    fn find_account(&self, public_address: &str) -> Option<Arc<dyn AccountHandle>> {
        (0..self.account_count())
            .filter_map(|index| self.account(index))
            .find(|account| account.public_address().as_deref() == Some(public_address))
    }
}

/// Reports which network is authoritative right now
#[async_trait]
pub trait VersionResolver: Send + Sync + 'static {
    async fn resolve_active_network_version(&self) -> anyhow::Result<NetworkVersion>;
}

/// Resolver with a fixed answer, for apps that ship the decision in config
#[derive(Debug, Clone, Copy)]
pub struct FixedVersionResolver(pub NetworkVersion);

#[async_trait]
impl VersionResolver for FixedVersionResolver {
    async fn resolve_active_network_version(&self) -> anyhow::Result<NetworkVersion> {
        Ok(self.0)
    }
}

/// Endpoint of one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub url: String,
    pub passphrase: String,
}

impl NetworkEndpoint {
    pub fn for_version(info: &NetworkInfo, version: NetworkVersion) -> Self {
        match version {
            NetworkVersion::Legacy => Self {
                url: info.old_network_url.clone(),
                passphrase: info.old_network_passphrase.clone(),
            },
            NetworkVersion::Successor => Self {
                url: info.new_network_url.clone(),
                passphrase: info.new_network_passphrase.clone(),
            },
        }
    }
}

/// Client bound to one network, handed to the caller when a run ends
#[derive(Clone)]
pub struct ClientHandle {
    version: NetworkVersion,
    endpoint: NetworkEndpoint,
    gateway: Arc<dyn AccountGateway>,
}

impl ClientHandle {
    pub fn new(version: NetworkVersion, endpoint: NetworkEndpoint, gateway: Arc<dyn AccountGateway>) -> Self {
        Self {
            version,
            endpoint,
            gateway,
        }
    }

    pub fn version(&self) -> NetworkVersion {
        self.version
    }

    pub fn endpoint(&self) -> &NetworkEndpoint {
        &self.endpoint
    }

    pub fn gateway(&self) -> &Arc<dyn AccountGateway> {
        &self.gateway
    }

    pub fn is_successor(&self) -> bool {
        self.version == NetworkVersion::Successor
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("version", &self.version)
            .field("endpoint", &self.endpoint)
            .field("accounts", &self.gateway.account_count())
            .finish()
    }
}
