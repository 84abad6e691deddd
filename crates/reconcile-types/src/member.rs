//! Normalized member records.
//!
//! A [`Member`] is the single shape every downstream component works with.
//! Index responses are projected into it at the transport boundary, so the
//! rule engine and orchestrator never look at raw JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group key used by collections on the index.
pub const COLLECTION_GROUP_KEY: &str = "collection";

/// Ledger-assigned member identifier (a base58 mint address).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One creator entry asserted by the member's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub verified: bool,
    /// Percentage share; entries sum to 100 by ledger invariant.
    pub share: u8,
}

impl Creator {
    pub fn new(address: impl Into<String>, verified: bool, share: u8) -> Self {
        Self {
            address: address.into(),
            verified,
            share,
        }
    }
}

/// A registered asset under audit, as currently reported by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: Option<String>,
    pub symbol: Option<String>,
    pub royalty_bps: Option<u16>,
    pub creators: Vec<Creator>,
    pub metadata_uri: Option<String>,
    pub image_uri: Option<String>,
    /// Whether the index reports the member's group link as verified.
    pub membership_verified: bool,
    pub group_key: String,
    pub group_value: Option<String>,
    /// Token standard or interface hint, when the index exposes one.
    pub token_kind: Option<String>,
}

impl Member {
    /// A member with only an id and no asserted metadata.
    pub fn bare(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            symbol: None,
            royalty_bps: None,
            creators: Vec::new(),
            metadata_uri: None,
            image_uri: None,
            membership_verified: false,
            group_key: COLLECTION_GROUP_KEY.to_string(),
            group_value: None,
            token_kind: None,
        }
    }

    /// True when the member claims a link to `group_value`, verified or not.
    pub fn is_linked_to(&self, group_value: &str) -> bool {
        self.group_value.as_deref() == Some(group_value)
    }

    /// Trailing decimal index of the display name (`"Mini #003"` -> 3).
    pub fn name_index(&self) -> Option<u64> {
        let name = self.display_name.as_deref()?.trim_end();
        let digits_start = name
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;
        name[digits_start..].parse().ok()
    }
}
