//! Migration outcome types
//!
//! Small closed enums produced and consumed within a single migration run:
//! which network is authoritative, what the burn check found, what the burn
//! did, and why a client was finally handed back to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which network is currently authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkVersion {
    /// The old network; accounts have not been moved yet
    Legacy,
    /// The new network accounts migrate to
    Successor,
}

impl NetworkVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Successor => "successor",
        }
    }
}

impl fmt::Display for NetworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "old" | "2" => Ok(Self::Legacy),
            "successor" | "new" | "3" => Ok(Self::Successor),
            _ => Err(format!("Unknown network version: {}", s)),
        }
    }
}

/// Why a client was handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationOutcome {
    /// The migration service moved the account during this run
    Migrated,
    /// The account had been migrated before
    AlreadyMigrated,
    /// There was nothing on the old network worth migrating
    NoAccountToMigrate,
    /// The old network is still authoritative
    UsingLegacyNetwork,
}

impl MigrationOutcome {
    /// Outcomes that justify writing the completion record
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Migrated | Self::AlreadyMigrated | Self::NoAccountToMigrate)
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Migrated => write!(f, "migrated"),
            Self::AlreadyMigrated => write!(f, "already_migrated"),
            Self::NoAccountToMigrate => write!(f, "no_account_to_migrate"),
            Self::UsingLegacyNetwork => write!(f, "using_legacy_network"),
        }
    }
}

/// Result of checking whether the old account is already burned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckBurnOutcome {
    NotBurned,
    AlreadyBurned,
    NoAccount,
    NoTrustAnchor,
}

impl fmt::Display for CheckBurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBurned => write!(f, "not_burned"),
            Self::AlreadyBurned => write!(f, "already_burned"),
            Self::NoAccount => write!(f, "no_account"),
            Self::NoTrustAnchor => write!(f, "no_trustline"),
        }
    }
}

/// Result of the burn phase
///
/// `Burned` only follows `CheckBurnOutcome::NotBurned`; the other variants
/// pass the check outcome through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurnOutcome {
    Burned,
    AlreadyBurned,
    NoAccount,
    NoTrustAnchor,
}

impl BurnOutcome {
    /// Whether the account is now unusable on the old network
    pub fn is_burned(&self) -> bool {
        matches!(self, Self::Burned | Self::AlreadyBurned)
    }
}

impl fmt::Display for BurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Burned => write!(f, "burned"),
            Self::AlreadyBurned => write!(f, "already_burned"),
            Self::NoAccount => write!(f, "no_account"),
            Self::NoTrustAnchor => write!(f, "no_trustline"),
        }
    }
}

/// Business error codes returned by the migration service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceErrorCode {
    /// The old account can still transact
    AccountNotBurned,
    AlreadyMigrated,
    InvalidAddressFormat,
    AccountNotFound,
    Unknown(String),
}

impl ServiceErrorCode {
    /// Parse either the symbolic or the historical numeric form
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "account-not-burned" | "4001" => Self::AccountNotBurned,
            "already-migrated" | "4002" => Self::AlreadyMigrated,
            "invalid-address-format" | "4003" => Self::InvalidAddressFormat,
            "account-not-found" | "4041" => Self::AccountNotFound,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountNotBurned => write!(f, "account-not-burned"),
            Self::AlreadyMigrated => write!(f, "already-migrated"),
            Self::InvalidAddressFormat => write!(f, "invalid-address-format"),
            Self::AccountNotFound => write!(f, "account-not-found"),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}
