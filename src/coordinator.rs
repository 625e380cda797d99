//! Migration coordinator
//!
//! Sequences completion check -> version resolution -> account check ->
//! burn -> migration request -> completion persistence on one background
//! task, and reports the result through `MigrationCallbacks`.
//!
//! Only one run may be active per coordinator. A second `start()` while one
//! is running fails immediately with `MigrationInProgress`; it neither waits
//! nor queues. The in-flight flag is released before the terminal callback
//! is dispatched, on every path including a panicking worker.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::burner::AccountBurner;
use crate::config::{ConfigError, MigrationConfig, NetworkInfo};
use crate::delivery::{DeliveryContext, SerialDelivery};
use crate::error::{MigrationError, Result};
use crate::events::{EventsNotifier, MigrationEventsListener};
use crate::gateway::{AccountGateway, ClientHandle, NetworkEndpoint, VersionResolver};
use crate::requester::{HttpTransport, MigrationRequester, MigrationTransport};
use crate::store::{CompletionStore, FileCompletionStore, MemoryCompletionStore};
use crate::types::{MigrationOutcome, NetworkVersion};

/// Caller-facing result contract of a migration run
///
/// For one `start()` the coordinator calls `on_migration_start` at most once,
/// and only when an actual burn and migration is attempted, followed by
/// exactly one of `on_ready` or `on_error`.
pub trait MigrationCallbacks: Send + Sync + 'static {
    fn on_migration_start(&self);

    /// Client bound to the network the caller should use from now on
    fn on_ready(&self, client: ClientHandle, outcome: MigrationOutcome);

    fn on_error(&self, error: MigrationError);
}

/// Single-run-at-a-time flag
#[derive(Debug, Default)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag if it is free; the permit releases it when dropped
    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit {
                flag: self.flag.clone(),
            })
    }

    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Proof of holding the in-flight flag
#[derive(Debug)]
pub struct InFlightPermit {
    flag: Arc<AtomicBool>,
}

impl InFlightPermit {
    /// Clear the flag now
    pub fn release(self) {}
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct Ready {
    client: ClientHandle,
    outcome: MigrationOutcome,
}

struct Inner {
    network: NetworkInfo,
    legacy: Arc<dyn AccountGateway>,
    successor: Arc<dyn AccountGateway>,
    resolver: Arc<dyn VersionResolver>,
    store: Arc<dyn CompletionStore>,
    burner: AccountBurner,
    requester: MigrationRequester,
    notifier: EventsNotifier,
    delivery: Arc<dyn DeliveryContext>,
    guard: InFlightGuard,
    runtime: Handle,
}

/// Moves the local account from the legacy network to its successor
#[derive(Clone)]
pub struct MigrationCoordinator {
    inner: Arc<Inner>,
}

impl MigrationCoordinator {
    pub fn builder(
        config: MigrationConfig,
        legacy: Arc<dyn AccountGateway>,
        successor: Arc<dyn AccountGateway>,
        resolver: Arc<dyn VersionResolver>,
    ) -> MigrationCoordinatorBuilder {
        MigrationCoordinatorBuilder::new(config, legacy, successor, resolver)
    }

    /// Client for the network to use right now, from local state only
    pub fn get_current_client(&self) -> ClientHandle {
        let migrated = self
            .inner
            .legacy
            .primary_account()
            .and_then(|account| account.public_address())
            .map(|address| self.inner.store.is_complete(&address))
            .unwrap_or(false);

        if migrated {
            self.inner.client(NetworkVersion::Successor)
        } else {
            self.inner.client(NetworkVersion::Legacy)
        }
    }

    /// Whether `public_address` has a completion record
    pub fn is_migrated(&self, public_address: &str) -> bool {
        self.inner.store.is_complete(public_address)
    }

    pub fn is_migration_in_progress(&self) -> bool {
        self.inner.guard.is_active()
    }

    /// Migrate the primary (most recently added) local account
    ///
    /// # Errors
    /// `MigrationInProgress` when another run of this coordinator is active;
    /// every other failure is reported through `callbacks.on_error`.
    pub fn start(&self, callbacks: Arc<dyn MigrationCallbacks>) -> Result<()> {
        self.spawn_run(None, callbacks)
    }

    /// Migrate the local account with the given public address
    pub fn start_for_address(&self, public_address: &str, callbacks: Arc<dyn MigrationCallbacks>) -> Result<()> {
        self.spawn_run(Some(public_address.to_string()), callbacks)
    }

    fn spawn_run(&self, target: Option<String>, callbacks: Arc<dyn MigrationCallbacks>) -> Result<()> {
        self.inner.notifier.on_method_started();

        let permit = match self.inner.guard.try_acquire() {
            Some(permit) => permit,
            None => {
                debug!("Rejecting start(): a migration is already running");
                return Err(MigrationError::MigrationInProgress);
            }
        };

        let run_id = Uuid::new_v4();
        let span = info_span!("migration", %run_id, public_address = ?target);
        let inner = self.inner.clone();

        self.inner.runtime.spawn(
            async move {
                let result = AssertUnwindSafe(inner.run(target.as_deref(), &callbacks))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!("Migration worker panicked");
                        Err(MigrationError::failed("Migration worker panicked"))
                    });

                permit.release();
                inner.deliver_result(callbacks, result);
            }
            .instrument(span),
        );
        Ok(())
    }
}

impl Inner {
    fn client(&self, version: NetworkVersion) -> ClientHandle {
        let gateway = match version {
            NetworkVersion::Legacy => self.legacy.clone(),
            NetworkVersion::Successor => self.successor.clone(),
        };
        ClientHandle::new(version, NetworkEndpoint::for_version(&self.network, version), gateway)
    }

    fn ready(&self, version: NetworkVersion, outcome: MigrationOutcome) -> Result<Ready> {
        Ok(Ready {
            client: self.client(version),
            outcome,
        })
    }

    async fn run(&self, target: Option<&str>, callbacks: &Arc<dyn MigrationCallbacks>) -> Result<Ready> {
        let known_address = match target {
            Some(address) => Some(address.to_string()),
            None => self.legacy.primary_account().and_then(|account| account.public_address()),
        };
        if let Some(address) = &known_address {
            if self.store.is_complete(address) {
                info!(public_address = %address, "Migration already completed");
                return self.ready(NetworkVersion::Successor, MigrationOutcome::AlreadyMigrated);
            }
        }

        self.notifier.on_version_check_started();
        let version = match self.resolver.resolve_active_network_version().await {
            Ok(version) => version,
            Err(e) => {
                let err = MigrationError::FailedToResolveVersion(format!("{:#}", e));
                self.notifier.on_version_check_failed(&err);
                return Err(err);
            }
        };
        self.notifier.on_version_check_succeeded(version);
        if version == NetworkVersion::Legacy {
            return self.ready(NetworkVersion::Legacy, MigrationOutcome::UsingLegacyNetwork);
        }

        let account = match target {
            Some(address) => self
                .legacy
                .find_account(address)
                .ok_or_else(|| MigrationError::AccountNotInList(address.to_string()))?,
            None => match self.legacy.primary_account() {
                Some(account) if self.legacy.has_account() => account,
                _ => {
                    info!("No local account, nothing to migrate");
                    return self.ready(NetworkVersion::Successor, MigrationOutcome::NoAccountToMigrate);
                }
            },
        };
        let public_address = match account.public_address() {
            Some(address) => address,
            None => {
                info!("Local account has no public address, nothing to migrate");
                return self.ready(NetworkVersion::Successor, MigrationOutcome::NoAccountToMigrate);
            }
        };

        self.deliver_start(callbacks);

        let burn = self.burner.start(account.as_ref()).await?;
        if !burn.is_burned() {
            return self.ready(NetworkVersion::Successor, MigrationOutcome::NoAccountToMigrate);
        }

        let outcome = self.requester.request_migration(&public_address).await?;

        if outcome.is_completion() {
            if let Err(e) = self.store.mark_complete(&public_address) {
                error!(%public_address, error = %e, "Failed to persist migration completion");
            }
        }
        self.ready(NetworkVersion::Successor, outcome)
    }

    fn deliver_start(&self, callbacks: &Arc<dyn MigrationCallbacks>) {
        self.notifier.on_callback_start();
        let callbacks = callbacks.clone();
        self.delivery
            .dispatch(Box::new(move || callbacks.on_migration_start()));
    }

    fn deliver_result(&self, callbacks: Arc<dyn MigrationCallbacks>, result: Result<Ready>) {
        match result {
            Ok(Ready { client, outcome }) => {
                info!(version = %client.version(), %outcome, "Migration run finished");
                self.notifier.on_callback_ready(client.version(), outcome);
                self.delivery
                    .dispatch(Box::new(move || callbacks.on_ready(client, outcome)));
            }
            Err(err) => {
                self.notifier.on_callback_failed(&err);
                self.delivery.dispatch(Box::new(move || callbacks.on_error(err)));
            }
        }
    }
}

/// Wires a coordinator together; defaults fill anything not supplied
pub struct MigrationCoordinatorBuilder {
    config: MigrationConfig,
    legacy: Arc<dyn AccountGateway>,
    successor: Arc<dyn AccountGateway>,
    resolver: Arc<dyn VersionResolver>,
    store: Option<Arc<dyn CompletionStore>>,
    transport: Option<Arc<dyn MigrationTransport>>,
    listener: Option<Arc<dyn MigrationEventsListener>>,
    delivery: Option<Arc<dyn DeliveryContext>>,
    runtime: Option<Handle>,
}

impl MigrationCoordinatorBuilder {
    pub fn new(
        config: MigrationConfig,
        legacy: Arc<dyn AccountGateway>,
        successor: Arc<dyn AccountGateway>,
        resolver: Arc<dyn VersionResolver>,
    ) -> Self {
        Self {
            config,
            legacy,
            successor,
            resolver,
            store: None,
            transport: None,
            listener: None,
            delivery: None,
            runtime: None,
        }
    }

    /// Defaults to a file store at `config.store_path`, else in-memory
    pub fn store(mut self, store: Arc<dyn CompletionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to `HttpTransport` with `config.http_timeout_secs`
    pub fn transport(mut self, transport: Arc<dyn MigrationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn events_listener(mut self, listener: Arc<dyn MigrationEventsListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Defaults to a `SerialDelivery` on the coordinator's runtime
    pub fn delivery(mut self, delivery: Arc<dyn DeliveryContext>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Defaults to the runtime `build()` is called from
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<MigrationCoordinator> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                ConfigError::InvalidValue(format!("no tokio runtime to run migrations on: {}", e))
            })?,
        };

        let store: Arc<dyn CompletionStore> = match (self.store, &self.config.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileCompletionStore::open(path)?),
            (None, None) => Arc::new(MemoryCompletionStore::new()),
        };

        let transport: Arc<dyn MigrationTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let timeout = Duration::from_secs(self.config.http_timeout_secs);
                Arc::new(
                    HttpTransport::new(timeout).map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
                )
            }
        };

        let notifier = match self.listener {
            Some(listener) => EventsNotifier::new(listener),
            None => EventsNotifier::default(),
        };
        let delivery: Arc<dyn DeliveryContext> = match self.delivery {
            Some(delivery) => delivery,
            None => Arc::new(SerialDelivery::spawn(&runtime)),
        };

        let max_attempts = self.config.max_retries;
        let burner = AccountBurner::with_max_attempts(notifier.clone(), max_attempts);
        let requester = MigrationRequester::with_max_attempts(
            self.config.network.clone(),
            transport,
            notifier.clone(),
            max_attempts,
        );

        Ok(MigrationCoordinator {
            inner: Arc::new(Inner {
                network: self.config.network,
                legacy: self.legacy,
                successor: self.successor,
                resolver: self.resolver,
                store,
                burner,
                requester,
                notifier,
                delivery,
                guard: InFlightGuard::new(),
                runtime,
            }),
        })
    }
}
