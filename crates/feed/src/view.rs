use std::collections::HashSet;

use chrono::{DateTime, Utc};
use db::models::{CommentRecord, PostRecord, ProfileRecord};
use db::types::{DbId, DbModerationStatus, DbScope};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedAuthor {
    pub id: DbId,
    pub display_name: String,
    pub avatar_url: String,
    pub title: String,
}

/// The shape the UI renders. Counters come from the store's denormalized
/// columns; the only client-side adjustment ever applied to them is the
/// optimistic like delta.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub id: DbId,
    pub author: FeedAuthor,
    pub content: String,
    pub image_url: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub published: DateTime<Utc>,
    pub liked_by_me: bool,
    pub status: DbModerationStatus,
    pub scope: DbScope,
}

impl FeedPost {
    /// Combines a post row, its author profile and the viewer's like
    /// membership. A missing profile degrades to an anonymous author rather
    /// than dropping the post.
    pub fn build(
        post: PostRecord,
        author: Option<ProfileRecord>,
        liked: &HashSet<DbId>,
        scope: &DbScope,
    ) -> Self {
        let author = match author {
            Some(profile) => FeedAuthor {
                id: profile.id,
                display_name: profile.display_name,
                avatar_url: profile.avatar_url,
                title: format!("Level {} Builder", profile.level),
            },
            None => FeedAuthor {
                id: post.author.clone(),
                display_name: String::from("Anonymous"),
                avatar_url: String::new(),
                title: String::from("Level 1 Builder"),
            },
        };

        FeedPost {
            liked_by_me: liked.contains(&post.id),
            id: post.id,
            author,
            content: post.content,
            image_url: post.image_url,
            likes: post.likes_count,
            comments: post.comments_count,
            published: post.published,
            status: post.status,
            scope: scope.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: DbId,
    pub content: String,
    pub published: DateTime<Utc>,
    pub author_name: String,
    pub author_avatar: String,
}

impl CommentView {
    pub fn build(comment: CommentRecord, author: Option<ProfileRecord>) -> Self {
        let (author_name, author_avatar) = match author {
            Some(profile) => (profile.display_name, profile.avatar_url),
            None => (String::from("Anonymous"), String::new()),
        };
        CommentView {
            id: comment.id,
            content: comment.content,
            published: comment.published,
            author_name,
            author_avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(id: &str) -> PostRecord {
        PostRecord {
            id: DbId::from(id),
            author: DbId::from("u1"),
            content: "hi".to_string(),
            image_url: None,
            community: None,
            likes_count: 3,
            comments_count: 1,
            status: DbModerationStatus::Approved,
            published: Utc::now(),
        }
    }

    #[test]
    fn missing_profile_degrades_to_anonymous() {
        let view = FeedPost::build(record("a"), None, &HashSet::new(), &DbScope::Global);
        assert_eq!(view.author.display_name, "Anonymous");
        assert_eq!(view.author.title, "Level 1 Builder");
        assert_eq!(view.author.id, DbId::from("u1"));
        assert!(!view.liked_by_me);
        assert_eq!(view.likes, 3);
    }

    #[test]
    fn author_title_reflects_level() {
        let profile = ProfileRecord {
            id: DbId::from("u1"),
            display_name: "Ada".to_string(),
            avatar_url: "https://example.com/a.png".to_string(),
            role: "Mentor".to_string(),
            level: 7,
            followers_count: 0,
            following_count: 0,
        };
        let liked = HashSet::from([DbId::from("a")]);
        let view = FeedPost::build(record("a"), Some(profile), &liked, &DbScope::Global);
        assert_eq!(view.author.title, "Level 7 Builder");
        assert!(view.liked_by_me);
    }
}
