use db::types::DbId;

/// How a mutation reconciles local state with the backend. Every mutation
/// declares one of these up front instead of improvising per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStrategy {
    /// Local state changes before the write; a failed write is corrected by
    /// an unconditional resync, not a manual rollback.
    Optimistic,
    /// The write happens first; local state only changes once the change
    /// feed triggers a refresh.
    RefreshDriven,
    /// The write happens first; local state is updated directly on success.
    Confirmed,
}

/// An image attached to a new post, as handed over by the UI layer.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub(crate) fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or("")
    }
}

pub enum FeedMutation {
    CreatePost {
        content: String,
        image: Option<ImageUpload>,
    },
    ToggleLike {
        post_id: DbId,
        /// The like state the caller observed; a stale capture over-counts
        /// until the next refresh.
        liked: bool,
    },
}

impl FeedMutation {
    pub fn strategy(&self) -> MutationStrategy {
        match self {
            FeedMutation::CreatePost { .. } => MutationStrategy::RefreshDriven,
            FeedMutation::ToggleLike { .. } => MutationStrategy::Optimistic,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedMutation::CreatePost { .. } => "create_post",
            FeedMutation::ToggleLike { .. } => "toggle_like",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_declare_their_strategy() {
        let create = FeedMutation::CreatePost {
            content: "hi".to_string(),
            image: None,
        };
        let toggle = FeedMutation::ToggleLike {
            post_id: DbId::from("a"),
            liked: false,
        };
        assert_eq!(create.strategy(), MutationStrategy::RefreshDriven);
        assert_eq!(toggle.strategy(), MutationStrategy::Optimistic);
    }

    #[test]
    fn image_extension_comes_from_the_file_name() {
        let image = ImageUpload {
            file_name: "shot.final.png".to_string(),
            bytes: vec![],
        };
        assert_eq!(image.extension(), "png");
    }
}
