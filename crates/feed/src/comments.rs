use std::sync::Arc;

use db::models::CommentInsert;
use db::store::DataStore;
use db::types::DbId;
use tokio::sync::RwLock;

use crate::errors::FeedError;
use crate::view::CommentView;

struct ThreadState {
    comments: Vec<CommentView>,
    count: i64,
    is_loading: bool,
}

/// Lazily loaded comment list under one post. The thread keeps a local
/// count seeded from the feed's denormalized counter; the authoritative
/// value flows back through the posts watch on the next feed refresh.
pub struct CommentThread {
    post_id: DbId,
    identity: Option<DbId>,
    store: Arc<dyn DataStore>,
    state: RwLock<ThreadState>,
}

impl CommentThread {
    pub fn new(
        store: Arc<dyn DataStore>,
        identity: Option<DbId>,
        post_id: DbId,
        initial_count: i64,
    ) -> Self {
        Self {
            post_id,
            identity,
            store,
            state: RwLock::new(ThreadState {
                comments: Vec::new(),
                count: initial_count,
                is_loading: true,
            }),
        }
    }

    pub async fn comments(&self) -> Vec<CommentView> {
        self.state.read().await.comments.clone()
    }

    pub async fn count(&self) -> i64 {
        self.state.read().await.count
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    /// Fetches the thread in posting order. A failed read keeps whatever
    /// was already loaded.
    pub async fn load(&self) {
        let fetched = self.store.comments_by_post(&self.post_id).await;
        let mut state = self.state.write().await;
        match fetched {
            Ok(rows) => {
                state.comments = rows
                    .into_iter()
                    .map(|(comment, author)| CommentView::build(comment, author))
                    .collect();
            }
            Err(err) => log::error!(
                "comment load failed, {:#?}",
                FeedError::ReadFailed(err)
            ),
        }
        state.is_loading = false;
    }

    /// Inserts the comment and appends it locally right away. Whitespace is
    /// trimmed; an empty comment is a no-op. Returns the appended view.
    pub async fn add(&self, content: &str) -> Result<Option<CommentView>, FeedError> {
        let Some(user) = self.identity.clone() else {
            return Err(FeedError::Unauthenticated);
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let record = self
            .store
            .insert_comment(CommentInsert {
                post_id: self.post_id.clone(),
                author: user.clone(),
                content: content.to_string(),
            })
            .await
            .map_err(FeedError::WriteFailed)?;

        let author = match self.store.profile_by_id(&user).await {
            Ok(author) => author,
            Err(_) => None,
        };
        let view = CommentView::build(record, author);

        let mut state = self.state.write().await;
        state.comments.push(view.clone());
        state.count += 1;
        Ok(Some(view))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use db::memory::MemoryStore;
    use db::models::{CommentRecord, PostRecord, ProfileRecord};
    use db::types::{DbModerationStatus, DbScope};

    use super::*;

    fn seed_post(id: &str) -> PostRecord {
        PostRecord {
            id: DbId::from(id),
            author: DbId::from("u1"),
            content: "hi".to_string(),
            image_url: None,
            community: None,
            likes_count: 0,
            comments_count: 0,
            status: DbModerationStatus::Approved,
            published: Utc::now(),
        }
    }

    fn profile(id: &str, name: &str) -> ProfileRecord {
        ProfileRecord {
            id: DbId::from(id),
            display_name: name.to_string(),
            avatar_url: format!("https://example.com/{}.png", id),
            role: "Builder".to_string(),
            level: 2,
            followers_count: 0,
            following_count: 0,
        }
    }

    #[tokio::test]
    async fn load_joins_authors_in_posting_order() {
        let store = Arc::new(MemoryStore::new());
        store.seed_post(seed_post("a")).await;
        store.seed_profile(profile("u2", "Grace")).await;
        store
            .seed_comment(CommentRecord {
                id: DbId::from("c2"),
                post_id: DbId::from("a"),
                author: DbId::from("u2"),
                content: "second".to_string(),
                published: Utc.timestamp_opt(200, 0).unwrap(),
            })
            .await;
        store
            .seed_comment(CommentRecord {
                id: DbId::from("c1"),
                post_id: DbId::from("a"),
                author: DbId::from("ghost"),
                content: "first".to_string(),
                published: Utc.timestamp_opt(100, 0).unwrap(),
            })
            .await;

        let thread = CommentThread::new(store.clone(), None, DbId::from("a"), 2);
        assert!(thread.is_loading().await);
        thread.load().await;
        assert!(!thread.is_loading().await);

        let comments = thread.comments().await;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");
        assert_eq!(comments[0].author_name, "Anonymous");
        assert_eq!(comments[1].content, "second");
        assert_eq!(comments[1].author_name, "Grace");
    }

    #[tokio::test]
    async fn add_appends_locally_and_bumps_the_count() {
        let store = Arc::new(MemoryStore::new());
        store.seed_post(seed_post("a")).await;
        store.seed_profile(profile("u2", "Grace")).await;

        let thread = CommentThread::new(
            store.clone(),
            Some(DbId::from("u2")),
            DbId::from("a"),
            0,
        );
        thread.load().await;

        let view = thread.add("  nice post  ").await.unwrap().unwrap();
        assert_eq!(view.content, "nice post");
        assert_eq!(view.author_name, "Grace");
        assert_eq!(thread.count().await, 1);
        assert_eq!(thread.comments().await.len(), 1);

        // The store-side counter moved too.
        let rows = store.posts_by_scope(&DbScope::Global).await.unwrap();
        assert_eq!(rows[0].0.comments_count, 1);
    }

    #[tokio::test]
    async fn empty_and_unauthenticated_adds_write_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.seed_post(seed_post("a")).await;

        let signed_in = CommentThread::new(
            store.clone(),
            Some(DbId::from("u2")),
            DbId::from("a"),
            0,
        );
        assert!(signed_in.add("   ").await.unwrap().is_none());
        assert_eq!(signed_in.count().await, 0);

        let signed_out = CommentThread::new(store.clone(), None, DbId::from("a"), 0);
        assert!(matches!(
            signed_out.add("hello").await,
            Err(FeedError::Unauthenticated)
        ));

        let rows = store.posts_by_scope(&DbScope::Global).await.unwrap();
        assert_eq!(rows[0].0.comments_count, 0);
    }
}
