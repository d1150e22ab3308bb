#![forbid(unsafe_code)]

pub mod comments;
pub mod engine;
pub mod errors;
pub mod follow;
pub mod mutation;
pub mod view;

pub use comments::CommentThread;
pub use engine::FeedEngine;
pub use errors::FeedError;
pub use follow::FollowControl;
pub use follow::FollowState;
pub use mutation::FeedMutation;
pub use mutation::ImageUpload;
pub use mutation::MutationStrategy;
pub use view::CommentView;
pub use view::FeedAuthor;
pub use view::FeedPost;
