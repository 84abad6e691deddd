//! Operator-supplied invariants for a collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum royalty expressible in basis points.
pub const MAX_ROYALTY_BPS: u16 = 10_000;

/// The invariant set every member of one collection must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedContract {
    /// Collection identity (the collection mint).
    pub group_value: String,
    /// Content-address fragment (CID) expected inside member URIs.
    pub expected_content_id: String,
    pub name_prefix: String,
    pub symbol: String,
    pub royalty_bps: u16,
    pub expected_creator_address: String,
}

impl ExpectedContract {
    /// Build a contract, rejecting blank fields and out-of-range royalties.
    pub fn new(
        group_value: impl Into<String>,
        expected_content_id: impl Into<String>,
        name_prefix: impl Into<String>,
        symbol: impl Into<String>,
        royalty_bps: u16,
        expected_creator_address: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let contract = Self {
            group_value: group_value.into(),
            expected_content_id: expected_content_id.into(),
            name_prefix: name_prefix.into(),
            symbol: symbol.into(),
            royalty_bps,
            expected_creator_address: expected_creator_address.into(),
        };
        contract.validate()?;
        Ok(contract)
    }

    /// Check that every field is usable.
    ///
    /// The name prefix is compared verbatim, so only an entirely empty prefix
    /// is rejected; the other string fields must not be blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("collection", &self.group_value),
            ("content id", &self.expected_content_id),
            ("symbol", &self.symbol),
            ("creator", &self.expected_creator_address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field));
            }
        }
        if self.name_prefix.is_empty() {
            return Err(ConfigError::MissingField("name prefix"));
        }
        if self.royalty_bps > MAX_ROYALTY_BPS {
            return Err(ConfigError::Invalid {
                field: "royalty bps",
                reason: format!("{} exceeds {}", self.royalty_bps, MAX_ROYALTY_BPS),
            });
        }
        Ok(())
    }
}

/// Configuration problems. These are the only errors fatal to a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not supplied.
    MissingField(&'static str),
    /// A setting was supplied but cannot be used.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField(field) => {
                write!(f, "missing required setting: {}", field)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
