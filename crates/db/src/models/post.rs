use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DbId, DbModerationStatus};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Eq)]
pub struct PostRecord {
    pub id: DbId,
    pub author: DbId,
    pub content: String,
    pub image_url: Option<String>,
    /// None means the post lives on the global feed.
    pub community: Option<DbId>,
    /// Denormalized; owned by the store, never derived client-side.
    pub likes_count: i64,
    pub comments_count: i64,
    pub status: DbModerationStatus,
    pub published: DateTime<Utc>,
}

/// Client-supplied fields of a new post. The store assigns the id, the
/// timestamp, the moderation status and zeroed counters.
#[derive(Debug, Clone)]
pub struct PostInsert {
    pub author: DbId,
    pub content: String,
    pub image_url: Option<String>,
    pub community: Option<DbId>,
}
