use thiserror::Error;

/// Mutation-path failures are surfaced to the caller for user-visible
/// feedback. Reconciliation-path failures (feed reads, like writes) are
/// absorbed and logged; the next successful refresh resolves them.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no user identity is bound")]
    Unauthenticated,

    #[error("image upload failed")]
    UploadFailed(#[source] anyhow::Error),

    #[error("backend rejected the write")]
    WriteFailed(#[source] anyhow::Error),

    #[error("feed read failed")]
    ReadFailed(#[source] anyhow::Error),
}
