use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use db::models::PostInsert;
use db::store::{DataStore, ObjectStore};
use db::streaming::Watch;
use db::types::{DbId, DbScope};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::FeedError;
use crate::mutation::{FeedMutation, ImageUpload};
use crate::view::FeedPost;

pub const IMAGE_BUCKET: &str = "post_images";

struct FeedState {
    items: Vec<FeedPost>,
    is_loading: bool,
}

struct Activation {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

/// Client-local view of one feed scope. The engine owns the only mutable
/// copy of the item list; the UI reads snapshots and issues intents.
///
/// `refresh` is the sole source of truth: it always replaces, never merges.
/// Concurrent refreshes are neither queued nor coalesced, so the last one
/// to complete wins even if it started earlier.
pub struct FeedEngine {
    scope: DbScope,
    identity: Option<DbId>,
    store: Arc<dyn DataStore>,
    objects: Arc<dyn ObjectStore>,
    state: RwLock<FeedState>,
    activation: Mutex<Option<Activation>>,
}

impl FeedEngine {
    pub fn new(
        scope: DbScope,
        identity: Option<DbId>,
        store: Arc<dyn DataStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            scope,
            identity,
            store,
            objects,
            state: RwLock::new(FeedState {
                items: Vec::new(),
                is_loading: true,
            }),
            activation: Mutex::new(None),
        }
    }

    pub fn scope(&self) -> &DbScope {
        &self.scope
    }

    pub fn identity(&self) -> Option<&DbId> {
        self.identity.as_ref()
    }

    pub async fn items(&self) -> Vec<FeedPost> {
        self.state.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    /// Full replace-from-source resynchronization. On a read failure the
    /// current items are kept as last-known-good and the error is only
    /// logged; callers retry by refreshing again.
    pub async fn refresh(&self) {
        let token = self.activation_token().await;

        let fetched = self.fetch_view().await;

        if let Some(token) = &token {
            if token.is_cancelled() {
                log::debug!("discarding a refresh that finished after deactivation");
                return;
            }
        }

        let mut state = self.state.write().await;
        match fetched {
            Ok(items) => state.items = items,
            Err(err) => log::error!("feed refresh failed, {:#?}", err),
        }
        state.is_loading = false;
    }

    async fn fetch_view(&self) -> Result<Vec<FeedPost>, FeedError> {
        let rows = self
            .store
            .posts_by_scope(&self.scope)
            .await
            .map_err(FeedError::ReadFailed)?;

        // The membership read is not transactional with the posts read; a
        // like landing in between stays invisible until the next refresh.
        let liked = match &self.identity {
            Some(user) => self
                .store
                .liked_post_ids(user)
                .await
                .map_err(FeedError::ReadFailed)?,
            None => HashSet::new(),
        };

        Ok(rows
            .into_iter()
            .map(|(post, author)| FeedPost::build(post, author, &liked, &self.scope))
            .collect())
    }

    /// Applies one mutation using the reconciliation strategy it declares.
    pub async fn mutate(&self, mutation: FeedMutation) -> Result<(), FeedError> {
        log::debug!(
            "feed mutation {} ({:?}) on {}",
            mutation.label(),
            mutation.strategy(),
            self.scope
        );
        match mutation {
            FeedMutation::CreatePost { content, image } => {
                self.create_post_inner(content, image).await
            }
            FeedMutation::ToggleLike { post_id, liked } => {
                self.toggle_like_inner(&post_id, liked).await;
                Ok(())
            }
        }
    }

    pub async fn create_post(
        &self,
        content: String,
        image: Option<ImageUpload>,
    ) -> Result<(), FeedError> {
        self.mutate(FeedMutation::CreatePost { content, image })
            .await
    }

    pub async fn toggle_like(&self, post_id: &DbId, currently_liked: bool) {
        // Like failures are absorbed; the arm always reports Ok.
        let _ = self
            .mutate(FeedMutation::ToggleLike {
                post_id: post_id.clone(),
                liked: currently_liked,
            })
            .await;
    }

    /// Refresh-driven: nothing is inserted locally. The new post becomes
    /// visible when the posts watch fires the next refresh.
    async fn create_post_inner(
        &self,
        content: String,
        image: Option<ImageUpload>,
    ) -> Result<(), FeedError> {
        let Some(user) = self.identity.clone() else {
            return Err(FeedError::Unauthenticated);
        };

        let image_url = match image {
            Some(image) => Some(self.upload_image(&user, image).await?),
            None => None,
        };

        self.store
            .insert_post(PostInsert {
                author: user,
                content,
                image_url,
                community: self.scope.community().cloned(),
            })
            .await
            .map(drop)
            .map_err(FeedError::WriteFailed)
    }

    /// An upload failure aborts the whole creation before any row write.
    async fn upload_image(&self, user: &DbId, image: ImageUpload) -> Result<String, FeedError> {
        let path = format!(
            "{}/{}.{}",
            user,
            Utc::now().timestamp_millis(),
            image.extension()
        );
        self.objects
            .upload(IMAGE_BUCKET, &path, image.bytes)
            .await
            .map_err(FeedError::UploadFailed)?;
        Ok(self.objects.public_url(IMAGE_BUCKET, &path))
    }

    /// Optimistic: the matching entry flips first, keyed on the like state
    /// the caller captured. Without a bound identity this is a silent no-op.
    async fn toggle_like_inner(&self, post_id: &DbId, currently_liked: bool) {
        let Some(user) = self.identity.clone() else {
            log::debug!("like toggle without a signed-in user");
            return;
        };

        {
            let mut state = self.state.write().await;
            for item in state.items.iter_mut().filter(|item| &item.id == post_id) {
                item.liked_by_me = !currently_liked;
                item.likes += if currently_liked { -1 } else { 1 };
            }
        }

        let write = if currently_liked {
            self.store.delete_like(&user, post_id).await
        } else {
            self.store.insert_like(&user, post_id).await
        };
        self.settle_optimistic_write(write).await;
    }

    /// Optimistic writes are never rolled back by hand; on failure the
    /// engine resynchronizes to ground truth instead.
    async fn settle_optimistic_write(&self, write: anyhow::Result<bool>) {
        if let Err(err) = write {
            log::error!(
                "optimistic write failed, resyncing, {:#?}",
                FeedError::WriteFailed(err)
            );
            self.refresh().await;
        }
    }

    /// Opens the scope's change subscription and starts the listener that
    /// keeps `items` synchronized: one posts watch restricted to the bound
    /// scope plus an unfiltered likes watch, every event answered with a
    /// full refresh. Calling this while already active is a no-op.
    pub async fn activate(self: &Arc<Self>) {
        let mut slot = self.activation.lock().await;
        if slot.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let mut feed = self
            .store
            .watch(vec![Watch::Posts(self.scope.clone()), Watch::Likes]);

        let engine = Arc::clone(self);
        let listener_token = token.clone();
        let listener = tokio::spawn(async move {
            engine.refresh().await;
            loop {
                tokio::select! {
                    _ = listener_token.cancelled() => break,
                    changed = feed.next() => match changed {
                        Some(()) => engine.refresh().await,
                        None => break,
                    },
                }
            }
        });

        *slot = Some(Activation { token, listener });
    }

    /// Closes the subscription and stops delivering late refresh results.
    /// Idempotent; harmless when never activated.
    pub async fn deactivate(&self) {
        let mut slot = self.activation.lock().await;
        if let Some(activation) = slot.take() {
            activation.token.cancel();
            activation.listener.abort();
        }
    }

    async fn activation_token(&self) -> Option<CancellationToken> {
        self.activation
            .lock()
            .await
            .as_ref()
            .map(|activation| activation.token.clone())
    }
}
