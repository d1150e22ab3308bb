use std::collections::HashSet;

use async_trait::async_trait;

use crate::models::{CommentInsert, CommentRecord, PostInsert, PostRecord, ProfileRecord};
use crate::streaming::{ChangeFeed, Watch};
use crate::types::{DbId, DbScope};

/// A post row joined with its author's profile, as the feed query returns it.
pub type PostWithAuthor = (PostRecord, Option<ProfileRecord>);
pub type CommentWithAuthor = (CommentRecord, Option<ProfileRecord>);

/// The hosted relational store the client runs against. Reads are filtered
/// and ordered server-side; writes are single rows; change notification is
/// push-based and payload-free.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Posts in one scope, author-joined, newest first. Ties on `published`
    /// keep the store's insertion order.
    async fn posts_by_scope(&self, scope: &DbScope) -> anyhow::Result<Vec<PostWithAuthor>>;

    /// Ids of every post the given user has liked.
    async fn liked_post_ids(&self, actor_id: &DbId) -> anyhow::Result<HashSet<DbId>>;

    async fn insert_post(&self, insert: PostInsert) -> anyhow::Result<PostRecord>;

    /// Returns whether a row was actually created (false: already liked).
    async fn insert_like(&self, actor_id: &DbId, post_id: &DbId) -> anyhow::Result<bool>;

    /// Returns whether a row was actually removed.
    async fn delete_like(&self, actor_id: &DbId, post_id: &DbId) -> anyhow::Result<bool>;

    /// Comments under one post in posting order, author-joined.
    async fn comments_by_post(&self, post_id: &DbId) -> anyhow::Result<Vec<CommentWithAuthor>>;

    async fn insert_comment(&self, insert: CommentInsert) -> anyhow::Result<CommentRecord>;

    async fn profile_by_id(&self, id: &DbId) -> anyhow::Result<Option<ProfileRecord>>;

    /// Whether follower_id currently follows actor_id.
    async fn follow_exists(&self, actor_id: &DbId, follower_id: &DbId) -> anyhow::Result<bool>;

    async fn insert_follow(&self, actor_id: &DbId, follower_id: &DbId) -> anyhow::Result<bool>;

    async fn delete_follow(&self, actor_id: &DbId, follower_id: &DbId) -> anyhow::Result<bool>;

    /// Opens one change subscription covering all given interests.
    fn watch(&self, watches: Vec<Watch>) -> ChangeFeed;
}

/// Blob storage addressed by bucket and path, serving public URLs derived
/// from the path convention.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> anyhow::Result<()>;

    /// Path-derived; performs no I/O.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
