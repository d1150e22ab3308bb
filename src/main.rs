#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;
use std::time::Duration;

use db::memory::{MemoryObjectStore, MemoryStore};
use db::models::{PostInsert, ProfileRecord};
use db::store::{DataStore, ObjectStore};
use db::types::{DbId, DbScope};
use dotenvy::dotenv;
use feed::{CommentThread, FeedEngine, FollowControl};
use tokio::time::sleep;

/// Offline smoke harness: drives the engines against the in-memory backend
/// so the whole loop (writes, change feed, refresh) can be watched locally.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = config::process_config()?;

    let store = Arc::new(MemoryStore::new());
    let objects = Arc::new(MemoryObjectStore::new());

    let viewer = ProfileRecord {
        id: DbId::default(),
        display_name: config.demo.display_name.clone(),
        avatar_url: String::new(),
        role: String::from("Builder"),
        level: 3,
        followers_count: 0,
        following_count: 0,
    };
    let peer = ProfileRecord {
        id: DbId::default(),
        display_name: String::from("Grace"),
        avatar_url: String::new(),
        role: String::from("Mentor"),
        level: 7,
        followers_count: 12,
        following_count: 4,
    };
    store.seed_profile(viewer.clone()).await;
    store.seed_profile(peer.clone()).await;

    let scope = match &config.demo.community {
        Some(name) => DbScope::Community(DbId::from(name.as_str())),
        None => DbScope::Global,
    };

    let seeded = store
        .insert_post(PostInsert {
            author: peer.id.clone(),
            content: String::from("Welcome to the feed!"),
            image_url: None,
            community: scope.community().cloned(),
        })
        .await?;

    let data_store: Arc<dyn DataStore> = store.clone();
    let object_store: Arc<dyn ObjectStore> = objects.clone();
    let engine = Arc::new(FeedEngine::new(
        scope,
        Some(viewer.id.clone()),
        data_store.clone(),
        object_store,
    ));

    engine.activate().await;

    engine
        .create_post(format!("Hello from {}!", viewer.display_name), None)
        .await?;
    engine.toggle_like(&seeded.id, false).await;

    // Give the change feed a beat to drive the refreshes.
    sleep(Duration::from_millis(100)).await;

    for item in engine.items().await {
        log::info!(
            "{} [{}]: {} ({} likes{}, {} comments)",
            item.author.display_name,
            item.author.title,
            item.content,
            item.likes,
            if item.liked_by_me { ", liked" } else { "" },
            item.comments
        );
    }

    let thread = CommentThread::new(
        data_store.clone(),
        Some(viewer.id.clone()),
        seeded.id.clone(),
        0,
    );
    thread.load().await;
    thread.add("First!").await?;
    log::info!("comments on the welcome post: {}", thread.count().await);

    let follow = FollowControl::new(data_store, Some(viewer.id.clone()), peer.id.clone());
    follow.load().await;
    follow.toggle().await;
    let state = follow.state().await;
    log::info!(
        "now following {}: {} ({} followers)",
        peer.display_name,
        state.following,
        state.followers
    );

    engine.deactivate().await;
    Ok(())
}
