use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// One like edge. Existence of the (actor, post) pair means "liked";
/// the pair is unique and only ever written for the acting user's own id.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Eq)]
pub struct PostLike {
    pub post_id: DbId,
    pub actor_id: DbId,
    pub published: DateTime<Utc>,
}
