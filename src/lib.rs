// Kin account migration library
//
// Moves the locally held account from the legacy Kin network to its
// successor: version resolution, burning the old account, the migration
// service request and persisting completion, run once per coordinator at a
// time with the result reported through ordered callbacks.

pub mod burner;
pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logger;
pub mod requester;
pub mod retry;
pub mod store;
pub mod types;

pub use config::{ConfigLoader, MigrationConfig, NetworkInfo};
pub use coordinator::{MigrationCallbacks, MigrationCoordinator, MigrationCoordinatorBuilder};
pub use error::{GatewayError, MigrationError};
pub use events::{MigrationEventsListener, NoopEventsListener};
pub use gateway::{AccountGateway, AccountHandle, ClientHandle, FixedVersionResolver, VersionResolver};
pub use logger::{init_logging, init_logging_from};
pub use types::{BurnOutcome, CheckBurnOutcome, MigrationOutcome, NetworkVersion};
