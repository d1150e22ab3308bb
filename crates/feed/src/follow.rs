use std::sync::Arc;

use db::store::DataStore;
use db::types::DbId;
use tokio::sync::RwLock;

use crate::errors::FeedError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowState {
    pub following: bool,
    pub followers: i64,
    pub following_count: i64,
    pub is_loading: bool,
}

/// Follow relationship between the bound viewer and one target profile.
/// Writes are confirmed: local state only moves once the backend accepts
/// the write, so a failed toggle leaves the counters untouched.
pub struct FollowControl {
    target: DbId,
    identity: Option<DbId>,
    store: Arc<dyn DataStore>,
    state: RwLock<FollowState>,
}

impl FollowControl {
    pub fn new(store: Arc<dyn DataStore>, identity: Option<DbId>, target: DbId) -> Self {
        Self {
            target,
            identity,
            store,
            state: RwLock::new(FollowState {
                following: false,
                followers: 0,
                following_count: 0,
                is_loading: true,
            }),
        }
    }

    pub async fn state(&self) -> FollowState {
        self.state.read().await.clone()
    }

    /// Reads follow membership plus the target's denormalized counters.
    /// Membership is skipped for the target's own profile view.
    pub async fn load(&self) {
        let viewer = self.identity.as_ref().filter(|user| **user != self.target);
        let following = match viewer {
            Some(user) => self
                .store
                .follow_exists(&self.target, user)
                .await
                .unwrap_or_else(|err| {
                    log::error!("follow status read failed, {:#?}", err);
                    false
                }),
            None => false,
        };

        let profile = match self.store.profile_by_id(&self.target).await {
            Ok(profile) => profile,
            Err(err) => {
                log::error!("follow counters read failed, {:#?}", err);
                None
            }
        };

        let mut state = self.state.write().await;
        state.following = following;
        if let Some(profile) = profile {
            state.followers = profile.followers_count;
            state.following_count = profile.following_count;
        }
        state.is_loading = false;
    }

    /// Flips the follow edge for the bound viewer. Unauthenticated and
    /// self-follow calls are no-ops.
    pub async fn toggle(&self) {
        let Some(user) = self.identity.clone() else {
            log::debug!("follow toggle without a signed-in user");
            return;
        };
        if user == self.target {
            log::debug!("refusing to follow self");
            return;
        }

        let following = self.state.read().await.following;
        let write = if following {
            self.store.delete_follow(&self.target, &user).await
        } else {
            self.store.insert_follow(&self.target, &user).await
        };

        match write {
            Ok(_) => {
                let mut state = self.state.write().await;
                state.following = !following;
                state.followers = if following {
                    (state.followers - 1).max(0)
                } else {
                    state.followers + 1
                };
            }
            Err(err) => log::error!(
                "follow toggle failed, {:#?}",
                FeedError::WriteFailed(err)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::memory::MemoryStore;
    use db::models::ProfileRecord;

    use super::*;

    fn profile(id: &str, followers: i64) -> ProfileRecord {
        ProfileRecord {
            id: DbId::from(id),
            display_name: id.to_string(),
            avatar_url: String::new(),
            role: "Builder".to_string(),
            level: 1,
            followers_count: followers,
            following_count: 0,
        }
    }

    #[tokio::test]
    async fn toggle_follows_then_unfollows() {
        let store = Arc::new(MemoryStore::new());
        store.seed_profile(profile("target", 10)).await;
        store.seed_profile(profile("viewer", 0)).await;

        let control = FollowControl::new(
            store.clone(),
            Some(DbId::from("viewer")),
            DbId::from("target"),
        );
        control.load().await;
        let state = control.state().await;
        assert!(!state.following);
        assert_eq!(state.followers, 10);

        control.toggle().await;
        let state = control.state().await;
        assert!(state.following);
        assert_eq!(state.followers, 11);
        assert!(store
            .follow_exists(&DbId::from("target"), &DbId::from("viewer"))
            .await
            .unwrap());

        control.toggle().await;
        let state = control.state().await;
        assert!(!state.following);
        assert_eq!(state.followers, 10);
        assert!(!store
            .follow_exists(&DbId::from("target"), &DbId::from("viewer"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.seed_profile(profile("target", 10)).await;
        store.seed_profile(profile("viewer", 0)).await;

        let control = FollowControl::new(
            store.clone(),
            Some(DbId::from("viewer")),
            DbId::from("target"),
        );
        control.load().await;

        store.set_fail_writes(true);
        control.toggle().await;
        let state = control.state().await;
        assert!(!state.following);
        assert_eq!(state.followers, 10);
    }

    #[tokio::test]
    async fn self_follow_and_signed_out_are_no_ops() {
        let store = Arc::new(MemoryStore::new());
        store.seed_profile(profile("target", 10)).await;

        let own_profile = FollowControl::new(
            store.clone(),
            Some(DbId::from("target")),
            DbId::from("target"),
        );
        own_profile.load().await;
        own_profile.toggle().await;
        assert!(!own_profile.state().await.following);

        let signed_out = FollowControl::new(store.clone(), None, DbId::from("target"));
        signed_out.load().await;
        signed_out.toggle().await;
        let state = signed_out.state().await;
        assert!(!state.following);
        assert_eq!(state.followers, 10);
    }
}
