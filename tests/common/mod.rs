//! Shared fakes for the coordinator integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use kin_migration::requester::{HttpReply, MigrationTransport, TransportError};
use kin_migration::store::MemoryCompletionStore;
use kin_migration::{
    AccountGateway, AccountHandle, ClientHandle, GatewayError, MigrationCallbacks, MigrationConfig,
    MigrationCoordinator, MigrationError, MigrationOutcome, NetworkInfo, NetworkVersion, VersionResolver,
};

pub const SERVICE_URL: &str = "https://migration.example.com/migrate?address=";

pub fn network() -> NetworkInfo {
    NetworkInfo::new(
        "https://horizon-old.example.com",
        "Kin Mainnet ; December 2018",
        "https://horizon-new.example.com",
        "Kin Mainnet ; September 2019",
        "GBC3SG6NGTSZ2OMH3FFGB7UVRQWILW367U4GSOOF4TFSZONV42UJXUH7",
        SERVICE_URL,
    )
}

pub fn server_error() -> GatewayError {
    GatewayError::Server {
        status: 503,
        message: "Service Unavailable".into(),
    }
}

/// Local account whose network answers can be scripted
pub struct FakeAccount {
    address: Option<String>,
    burned: AtomicBool,
    check_replies: Mutex<VecDeque<Result<bool, GatewayError>>>,
    burn_replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    pub check_calls: AtomicUsize,
    pub burn_calls: AtomicUsize,
}

impl FakeAccount {
    pub fn new(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            burned: AtomicBool::new(false),
            check_replies: Mutex::new(VecDeque::new()),
            burn_replies: Mutex::new(VecDeque::new()),
            check_calls: AtomicUsize::new(0),
            burn_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_address() -> Self {
        Self {
            address: None,
            ..Self::new("")
        }
    }

    pub fn already_burned(self) -> Self {
        self.burned.store(true, Ordering::SeqCst);
        self
    }

    pub fn check_replies(self, replies: Vec<Result<bool, GatewayError>>) -> Self {
        *self.check_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn burn_replies(self, replies: Vec<Result<String, GatewayError>>) -> Self {
        *self.burn_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn checks(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn burns(&self) -> usize {
        self.burn_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountHandle for FakeAccount {
    fn public_address(&self) -> Option<String> {
        self.address.clone()
    }

    async fn is_burned(&self) -> Result<bool, GatewayError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        match self.check_replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(self.burned.load(Ordering::SeqCst)),
        }
    }

    async fn burn(&self) -> Result<String, GatewayError> {
        let n = self.burn_calls.fetch_add(1, Ordering::SeqCst);
        match self.burn_replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => {
                self.burned.store(true, Ordering::SeqCst);
                Ok(format!("tx-{}", n))
            }
        }
    }
}

/// Gateway over a fixed list of accounts
#[derive(Default)]
pub struct FakeGateway {
    accounts: Vec<Arc<FakeAccount>>,
}

impl FakeGateway {
    pub fn new(accounts: Vec<Arc<FakeAccount>>) -> Self {
        Self { accounts }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl AccountGateway for FakeGateway {
    fn has_account(&self) -> bool {
        !self.accounts.is_empty()
    }

    fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn account(&self, index: usize) -> Option<Arc<dyn AccountHandle>> {
        self.accounts
            .get(index)
            .map(|account| account.clone() as Arc<dyn AccountHandle>)
    }
}

/// Resolver that can be held on a gate, fail, or panic
pub struct FakeResolver {
    version: NetworkVersion,
    failure: Option<String>,
    panics: bool,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new(version: NetworkVersion) -> Self {
        Self {
            version,
            failure: None,
            panics: false,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(NetworkVersion::Successor)
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::new(NetworkVersion::Successor)
        }
    }

    /// Block every resolution until `gate` is notified
    pub fn gated(version: NetworkVersion, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(version)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionResolver for FakeResolver {
    async fn resolve_active_network_version(&self) -> anyhow::Result<NetworkVersion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.panics {
            panic!("version endpoint returned garbage");
        }
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(self.version),
        }
    }
}

/// Transport replaying canned replies, 200 once the script runs out
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<HttpReply>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<HttpReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MigrationTransport for ScriptedTransport {
    async fn post_empty(&self, url: &str) -> Result<HttpReply, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| HttpReply::new(200, None)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    Start,
    Ready(NetworkVersion, MigrationOutcome),
    Error(String),
}

/// Records callbacks and wakes waiters on the terminal one
#[derive(Default)]
pub struct RecordingCallbacks {
    events: Mutex<Vec<CallbackEvent>>,
    done: Notify,
    panic_on_start: bool,
}

impl RecordingCallbacks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn panicking_on_start() -> Arc<Self> {
        Arc::new(Self {
            panic_on_start: true,
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<CallbackEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait for `on_ready` or `on_error`
    pub async fn finished(&self) -> Vec<CallbackEvent> {
        tokio::time::timeout(Duration::from_secs(5), self.done.notified())
            .await
            .expect("migration run did not finish");
        self.events()
    }
}

impl MigrationCallbacks for RecordingCallbacks {
    fn on_migration_start(&self) {
        self.events.lock().unwrap().push(CallbackEvent::Start);
        if self.panic_on_start {
            panic!("ui thread is gone");
        }
    }

    fn on_ready(&self, client: ClientHandle, outcome: MigrationOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(CallbackEvent::Ready(client.version(), outcome));
        self.done.notify_one();
    }

    fn on_error(&self, error: MigrationError) {
        self.events
            .lock()
            .unwrap()
            .push(CallbackEvent::Error(error.to_string()));
        self.done.notify_one();
    }
}

/// Everything a coordinator test needs to inspect afterwards
pub struct Harness {
    pub coordinator: MigrationCoordinator,
    pub resolver: Arc<FakeResolver>,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryCompletionStore>,
}

pub fn harness(accounts: Vec<Arc<FakeAccount>>, resolver: FakeResolver, replies: Vec<HttpReply>) -> Harness {
    harness_with_store(accounts, resolver, replies, MemoryCompletionStore::new())
}

pub fn harness_with_store(
    accounts: Vec<Arc<FakeAccount>>,
    resolver: FakeResolver,
    replies: Vec<HttpReply>,
    store: MemoryCompletionStore,
) -> Harness {
    let resolver = Arc::new(resolver);
    let transport = Arc::new(ScriptedTransport::new(replies));
    let store = Arc::new(store);

    let coordinator = MigrationCoordinator::builder(
        MigrationConfig::new(network()),
        Arc::new(FakeGateway::new(accounts)),
        Arc::new(FakeGateway::empty()),
        resolver.clone(),
    )
    .store(store.clone())
    .transport(transport.clone())
    .build()
    .expect("coordinator");

    Harness {
        coordinator,
        resolver,
        transport,
        store,
    }
}
