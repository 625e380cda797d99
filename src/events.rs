//! Migration phase notifications
//!
//! `MigrationEventsListener` is the injectable observer: one method per
//! phase start/success/failure. All methods default to no-ops so analytics
//! integrations only implement what they report. `EventsNotifier` logs each
//! notification and forwards it; a listener that panics is contained here and
//! can never change the outcome of a run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::MigrationError;
use crate::types::{BurnOutcome, CheckBurnOutcome, MigrationOutcome, NetworkVersion};

/// Observer of migration phases. Implementations must return quickly.
#[allow(unused_variables)]
pub trait MigrationEventsListener: Send + Sync + 'static {
    fn on_method_started(&self) {}

    fn on_version_check_started(&self) {}
    fn on_version_check_succeeded(&self, version: NetworkVersion) {}
    fn on_version_check_failed(&self, error: &MigrationError) {}

    fn on_callback_start(&self) {}

    fn on_check_burn_started(&self, public_address: &str) {}
    fn on_check_burn_succeeded(&self, public_address: &str, outcome: CheckBurnOutcome) {}
    fn on_check_burn_failed(&self, public_address: &str, error: &MigrationError) {}

    fn on_burn_started(&self, public_address: &str) {}
    fn on_burn_succeeded(&self, public_address: &str, outcome: BurnOutcome) {}
    fn on_burn_failed(&self, public_address: &str, error: &MigrationError) {}

    fn on_request_migration_started(&self, public_address: &str) {}
    fn on_request_migration_succeeded(&self, public_address: &str, outcome: MigrationOutcome) {}
    fn on_request_migration_failed(&self, public_address: &str, error: &MigrationError) {}

    fn on_callback_ready(&self, version: NetworkVersion, outcome: MigrationOutcome) {}
    fn on_callback_failed(&self, error: &MigrationError) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventsListener;

impl MigrationEventsListener for NoopEventsListener {}

/// Logs every notification and forwards it to the listener
#[derive(Clone)]
pub struct EventsNotifier {
    listener: Arc<dyn MigrationEventsListener>,
}

impl Default for EventsNotifier {
    fn default() -> Self {
        Self::new(Arc::new(NoopEventsListener))
    }
}

impl EventsNotifier {
    pub fn new(listener: Arc<dyn MigrationEventsListener>) -> Self {
        Self { listener }
    }

    fn forward<F>(&self, event: &'static str, f: F)
    where
        F: FnOnce(&dyn MigrationEventsListener),
    {
        let listener = self.listener.as_ref();
        if catch_unwind(AssertUnwindSafe(|| f(listener))).is_err() {
            warn!("Events listener panicked while handling {}", event);
        }
    }

    pub fn on_method_started(&self) {
        debug!("on_method_started");
        self.forward("on_method_started", |l| l.on_method_started());
    }

    pub fn on_version_check_started(&self) {
        debug!("on_version_check_started");
        self.forward("on_version_check_started", |l| l.on_version_check_started());
    }

    pub fn on_version_check_succeeded(&self, version: NetworkVersion) {
        debug!(%version, "on_version_check_succeeded");
        self.forward("on_version_check_succeeded", |l| l.on_version_check_succeeded(version));
    }

    pub fn on_version_check_failed(&self, err: &MigrationError) {
        error!(error = %err, "on_version_check_failed");
        self.forward("on_version_check_failed", |l| l.on_version_check_failed(err));
    }

    pub fn on_callback_start(&self) {
        debug!("on_callback_start");
        self.forward("on_callback_start", |l| l.on_callback_start());
    }

    pub fn on_check_burn_started(&self, public_address: &str) {
        debug!(public_address, "on_check_burn_started");
        self.forward("on_check_burn_started", |l| l.on_check_burn_started(public_address));
    }

    pub fn on_check_burn_succeeded(&self, public_address: &str, outcome: CheckBurnOutcome) {
        debug!(public_address, %outcome, "on_check_burn_succeeded");
        self.forward("on_check_burn_succeeded", |l| {
            l.on_check_burn_succeeded(public_address, outcome)
        });
    }

    pub fn on_check_burn_failed(&self, public_address: &str, err: &MigrationError) {
        error!(public_address, error = %err, "on_check_burn_failed");
        self.forward("on_check_burn_failed", |l| l.on_check_burn_failed(public_address, err));
    }

    pub fn on_burn_started(&self, public_address: &str) {
        debug!(public_address, "on_burn_started");
        self.forward("on_burn_started", |l| l.on_burn_started(public_address));
    }

    pub fn on_burn_succeeded(&self, public_address: &str, outcome: BurnOutcome) {
        debug!(public_address, %outcome, "on_burn_succeeded");
        self.forward("on_burn_succeeded", |l| l.on_burn_succeeded(public_address, outcome));
    }

    pub fn on_burn_failed(&self, public_address: &str, err: &MigrationError) {
        error!(public_address, error = %err, "on_burn_failed");
        self.forward("on_burn_failed", |l| l.on_burn_failed(public_address, err));
    }

    pub fn on_request_migration_started(&self, public_address: &str) {
        debug!(public_address, "on_request_migration_started");
        self.forward("on_request_migration_started", |l| {
            l.on_request_migration_started(public_address)
        });
    }

    pub fn on_request_migration_succeeded(&self, public_address: &str, outcome: MigrationOutcome) {
        debug!(public_address, %outcome, "on_request_migration_succeeded");
        self.forward("on_request_migration_succeeded", |l| {
            l.on_request_migration_succeeded(public_address, outcome)
        });
    }

    pub fn on_request_migration_failed(&self, public_address: &str, err: &MigrationError) {
        error!(public_address, error = %err, "on_request_migration_failed");
        self.forward("on_request_migration_failed", |l| {
            l.on_request_migration_failed(public_address, err)
        });
    }

    pub fn on_callback_ready(&self, version: NetworkVersion, outcome: MigrationOutcome) {
        debug!(%version, %outcome, "on_callback_ready");
        self.forward("on_callback_ready", |l| l.on_callback_ready(version, outcome));
    }

    pub fn on_callback_failed(&self, err: &MigrationError) {
        error!(error = %err, "on_callback_failed");
        self.forward("on_callback_failed", |l| l.on_callback_failed(err));
    }
}

/// Listener that records event names in order, shared by the unit tests
#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingListener {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingListener {
        pub fn push(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        pub fn names(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl MigrationEventsListener for RecordingListener {
        fn on_check_burn_started(&self, _: &str) {
            self.push("check_burn_started");
        }
        fn on_check_burn_succeeded(&self, _: &str, outcome: CheckBurnOutcome) {
            self.push(format!("check_burn_succeeded:{}", outcome));
        }
        fn on_check_burn_failed(&self, _: &str, _: &MigrationError) {
            self.push("check_burn_failed");
        }
        fn on_burn_started(&self, _: &str) {
            self.push("burn_started");
        }
        fn on_burn_succeeded(&self, _: &str, outcome: BurnOutcome) {
            self.push(format!("burn_succeeded:{}", outcome));
        }
        fn on_burn_failed(&self, _: &str, _: &MigrationError) {
            self.push("burn_failed");
        }
        fn on_request_migration_started(&self, _: &str) {
            self.push("request_migration_started");
        }
        fn on_request_migration_succeeded(&self, _: &str, outcome: MigrationOutcome) {
            self.push(format!("request_migration_succeeded:{}", outcome));
        }
        fn on_request_migration_failed(&self, _: &str, _: &MigrationError) {
            self.push("request_migration_failed");
        }
    }
}
