use std::fmt;

use serde::{Deserialize, Serialize};
use svix_ksuid::KsuidLike;

#[derive(Serialize, Deserialize, Debug, Hash, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub struct DbId(String);

impl Default for DbId {
    fn default() -> Self {
        DbId(svix_ksuid::Ksuid::new(None, None).to_string())
    }
}

impl fmt::Display for DbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DbId {
    fn from(string: String) -> Self {
        DbId(string)
    }
}

impl From<&str> for DbId {
    fn from(string: &str) -> Self {
        DbId(string.to_string())
    }
}

impl From<svix_ksuid::Ksuid> for DbId {
    fn from(id: svix_ksuid::Ksuid) -> Self {
        DbId(id.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, PartialOrd, Ord, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DbModerationStatus {
    Approved,
    Pending,
    Rejected,
}

impl DbModerationStatus {
    pub fn from_string(string: &str) -> Option<Self> {
        match string {
            "approved" => Some(Self::Approved),
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The partition a feed view is bound to: the global feed, or one community.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DbScope {
    Global,
    Community(DbId),
}

impl DbScope {
    pub fn community(&self) -> Option<&DbId> {
        match self {
            DbScope::Global => None,
            DbScope::Community(id) => Some(id),
        }
    }

    /// Whether a post row with the given community column belongs to this
    /// scope. Global means "no community set".
    pub fn includes(&self, community: &Option<DbId>) -> bool {
        match self {
            DbScope::Global => community.is_none(),
            DbScope::Community(id) => community.as_ref() == Some(id),
        }
    }
}

impl fmt::Display for DbScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbScope::Global => write!(f, "global"),
            DbScope::Community(id) => write!(f, "community:{}", id),
        }
    }
}
