use serde::{Deserialize, Serialize};

use crate::types::DbId;

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Eq)]
pub struct ProfileRecord {
    pub id: DbId,
    pub display_name: String,
    pub avatar_url: String,
    pub role: String,
    pub level: i32,
    /// Denormalized follow counters, maintained by the store.
    pub followers_count: i64,
    pub following_count: i64,
}
