use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{
    CommentInsert, CommentRecord, PostInsert, PostLike, PostRecord, ProfileRecord, UserFollower,
};
use crate::store::{CommentWithAuthor, DataStore, ObjectStore, PostWithAuthor};
use crate::streaming::{ChangeBus, ChangeFeed, RowOp, TableEvent, Watch};
use crate::types::{DbId, DbModerationStatus, DbScope};

#[derive(Default)]
struct Tables {
    /// Insertion order is preserved; it is the tiebreak for equal timestamps.
    posts: Vec<PostRecord>,
    profiles: HashMap<DbId, ProfileRecord>,
    likes: Vec<PostLike>,
    comments: Vec<CommentRecord>,
    followers: Vec<UserFollower>,
}

/// In-process reference store. It plays the backend's role in full: it owns
/// the denormalized counters, assigns ids and timestamps, and publishes a
/// change event for every write, including the counter updates a like or
/// comment causes on the posts table.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    bus: ChangeBus,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::default(),
            bus: ChangeBus::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent read fail until cleared.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Loads a fixture row as-is: counters and timestamp are trusted and no
    /// change event fires.
    pub async fn seed_profile(&self, profile: ProfileRecord) {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile);
    }

    pub async fn seed_post(&self, post: PostRecord) {
        self.tables.write().await.posts.push(post);
    }

    pub async fn seed_like(&self, like: PostLike) {
        self.tables.write().await.likes.push(like);
    }

    pub async fn seed_comment(&self, comment: CommentRecord) {
        self.tables.write().await.comments.push(comment);
    }

    /// External deletion; posts are never deleted through the client API.
    pub async fn remove_post(&self, id: &DbId) -> bool {
        let community = {
            let mut tables = self.tables.write().await;
            let Some(index) = tables.posts.iter().position(|post| &post.id == id) else {
                return false;
            };
            let removed = tables.posts.remove(index);
            tables.likes.retain(|like| &like.post_id != id);
            tables.comments.retain(|comment| &comment.post_id != id);
            removed.community
        };
        self.bus.publish(TableEvent::Posts {
            op: RowOp::Delete,
            community,
        });
        true
    }

    fn read_guard(&self) -> anyhow::Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("memory store: injected read failure");
        }
        Ok(())
    }

    fn write_guard(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("memory store: injected write failure");
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn posts_by_scope(&self, scope: &DbScope) -> anyhow::Result<Vec<PostWithAuthor>> {
        self.read_guard()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<PostRecord> = tables
            .posts
            .iter()
            .filter(|post| scope.includes(&post.community))
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep insertion order.
        rows.sort_by(|a, b| b.published.cmp(&a.published));
        Ok(rows
            .into_iter()
            .map(|post| {
                let author = tables.profiles.get(&post.author).cloned();
                (post, author)
            })
            .collect())
    }

    async fn liked_post_ids(&self, actor_id: &DbId) -> anyhow::Result<HashSet<DbId>> {
        self.read_guard()?;
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .iter()
            .filter(|like| &like.actor_id == actor_id)
            .map(|like| like.post_id.clone())
            .collect())
    }

    async fn insert_post(&self, insert: PostInsert) -> anyhow::Result<PostRecord> {
        self.write_guard()?;
        let record = PostRecord {
            id: DbId::default(),
            author: insert.author,
            content: insert.content,
            image_url: insert.image_url,
            community: insert.community,
            likes_count: 0,
            comments_count: 0,
            status: DbModerationStatus::Approved,
            published: Utc::now(),
        };
        let community = record.community.clone();
        self.tables.write().await.posts.push(record.clone());
        self.bus.publish(TableEvent::Posts {
            op: RowOp::Insert,
            community,
        });
        Ok(record)
    }

    async fn insert_like(&self, actor_id: &DbId, post_id: &DbId) -> anyhow::Result<bool> {
        self.write_guard()?;
        let community = {
            let mut tables = self.tables.write().await;
            let exists = tables
                .likes
                .iter()
                .any(|like| &like.actor_id == actor_id && &like.post_id == post_id);
            if exists {
                return Ok(false);
            }
            let Some(post) = tables.posts.iter_mut().find(|post| &post.id == post_id) else {
                bail!("like for unknown post {}", post_id);
            };
            post.likes_count += 1;
            let community = post.community.clone();
            tables.likes.push(PostLike {
                post_id: post_id.clone(),
                actor_id: actor_id.clone(),
                published: Utc::now(),
            });
            community
        };
        self.bus.publish(TableEvent::Likes { op: RowOp::Insert });
        self.bus.publish(TableEvent::Posts {
            op: RowOp::Update,
            community,
        });
        Ok(true)
    }

    async fn delete_like(&self, actor_id: &DbId, post_id: &DbId) -> anyhow::Result<bool> {
        self.write_guard()?;
        let community = {
            let mut tables = self.tables.write().await;
            let Some(index) = tables
                .likes
                .iter()
                .position(|like| &like.actor_id == actor_id && &like.post_id == post_id)
            else {
                return Ok(false);
            };
            tables.likes.remove(index);
            let Some(post) = tables.posts.iter_mut().find(|post| &post.id == post_id) else {
                bail!("like for unknown post {}", post_id);
            };
            post.likes_count = (post.likes_count - 1).max(0);
            post.community.clone()
        };
        self.bus.publish(TableEvent::Likes { op: RowOp::Delete });
        self.bus.publish(TableEvent::Posts {
            op: RowOp::Update,
            community,
        });
        Ok(true)
    }

    async fn comments_by_post(&self, post_id: &DbId) -> anyhow::Result<Vec<CommentWithAuthor>> {
        self.read_guard()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<CommentRecord> = tables
            .comments
            .iter()
            .filter(|comment| &comment.post_id == post_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.published.cmp(&b.published));
        Ok(rows
            .into_iter()
            .map(|comment| {
                let author = tables.profiles.get(&comment.author).cloned();
                (comment, author)
            })
            .collect())
    }

    async fn insert_comment(&self, insert: CommentInsert) -> anyhow::Result<CommentRecord> {
        self.write_guard()?;
        let (record, community) = {
            let mut tables = self.tables.write().await;
            let Some(post) = tables
                .posts
                .iter_mut()
                .find(|post| post.id == insert.post_id)
            else {
                bail!("comment for unknown post {}", insert.post_id);
            };
            post.comments_count += 1;
            let community = post.community.clone();
            let record = CommentRecord {
                id: DbId::default(),
                post_id: insert.post_id,
                author: insert.author,
                content: insert.content,
                published: Utc::now(),
            };
            tables.comments.push(record.clone());
            (record, community)
        };
        // The counter bump is a posts-row update, which is what feed
        // subscribers watch.
        self.bus.publish(TableEvent::Posts {
            op: RowOp::Update,
            community,
        });
        Ok(record)
    }

    async fn profile_by_id(&self, id: &DbId) -> anyhow::Result<Option<ProfileRecord>> {
        self.read_guard()?;
        Ok(self.tables.read().await.profiles.get(id).cloned())
    }

    async fn follow_exists(&self, actor_id: &DbId, follower_id: &DbId) -> anyhow::Result<bool> {
        self.read_guard()?;
        let tables = self.tables.read().await;
        Ok(tables
            .followers
            .iter()
            .any(|edge| &edge.actor_id == actor_id && &edge.follower_id == follower_id))
    }

    async fn insert_follow(&self, actor_id: &DbId, follower_id: &DbId) -> anyhow::Result<bool> {
        self.write_guard()?;
        let mut tables = self.tables.write().await;
        let exists = tables
            .followers
            .iter()
            .any(|edge| &edge.actor_id == actor_id && &edge.follower_id == follower_id);
        if exists {
            return Ok(false);
        }
        if !tables.profiles.contains_key(actor_id) || !tables.profiles.contains_key(follower_id) {
            bail!("follow between unknown profiles");
        }
        tables.followers.push(UserFollower {
            actor_id: actor_id.clone(),
            follower_id: follower_id.clone(),
            published: Utc::now(),
        });
        if let Some(target) = tables.profiles.get_mut(actor_id) {
            target.followers_count += 1;
        }
        if let Some(follower) = tables.profiles.get_mut(follower_id) {
            follower.following_count += 1;
        }
        Ok(true)
    }

    async fn delete_follow(&self, actor_id: &DbId, follower_id: &DbId) -> anyhow::Result<bool> {
        self.write_guard()?;
        let mut tables = self.tables.write().await;
        let Some(index) = tables
            .followers
            .iter()
            .position(|edge| &edge.actor_id == actor_id && &edge.follower_id == follower_id)
        else {
            return Ok(false);
        };
        tables.followers.remove(index);
        if let Some(target) = tables.profiles.get_mut(actor_id) {
            target.followers_count = (target.followers_count - 1).max(0);
        }
        if let Some(follower) = tables.profiles.get_mut(follower_id) {
            follower.following_count = (follower.following_count - 1).max(0);
        }
        Ok(true)
    }

    fn watch(&self, watches: Vec<Watch>) -> ChangeFeed {
        self.bus.watch(watches)
    }
}

/// Blob store counterpart of [`MemoryStore`]. URLs use the `mem://` scheme.
pub struct MemoryObjectStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::default(),
            fail_uploads: AtomicBool::new(false),
        }
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn object_count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            bail!("memory object store: injected upload failure");
        }
        self.blobs
            .write()
            .await
            .insert(format!("{}/{}", bucket, path), bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("mem://{}/{}", bucket, path)
    }
}
