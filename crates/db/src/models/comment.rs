use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Append-only from the client's perspective; no edit or delete is exposed.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Eq)]
pub struct CommentRecord {
    pub id: DbId,
    pub post_id: DbId,
    pub author: DbId,
    pub content: String,
    pub published: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommentInsert {
    pub post_id: DbId,
    pub author: DbId,
    pub content: String,
}
