use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// follower_id follows actor_id. The pair is unique.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Eq)]
pub struct UserFollower {
    pub actor_id: DbId,
    pub follower_id: DbId,
    pub published: DateTime<Utc>,
}
