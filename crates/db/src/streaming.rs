use tokio::sync::broadcast;

use crate::types::{DbId, DbScope};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowOp {
    Insert,
    Update,
    Delete,
}

/// "Table X changed" notification. Carries no row payload; subscribers are
/// expected to refetch from source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableEvent {
    Posts { op: RowOp, community: Option<DbId> },
    Likes { op: RowOp },
}

/// A table interest a subscriber registers for.
#[derive(Clone, Debug)]
pub enum Watch {
    /// Post rows restricted to one scope.
    Posts(DbScope),
    /// Every like row, regardless of post.
    Likes,
}

impl Watch {
    pub fn matches(&self, event: &TableEvent) -> bool {
        match (self, event) {
            (Watch::Posts(scope), TableEvent::Posts { community, .. }) => scope.includes(community),
            (Watch::Likes, TableEvent::Likes { .. }) => true,
            _ => false,
        }
    }
}

pub struct ChangeBus {
    sender: broadcast::Sender<TableEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Fans the event out to every open feed. Sending with no subscribers is
    /// not an error.
    pub fn publish(&self, event: TableEvent) {
        let _ = self.sender.send(event);
    }

    pub fn watch(&self, watches: Vec<Watch>) -> ChangeFeed {
        ChangeFeed {
            watches,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One open change subscription. Dropping the feed closes it; a dropped or
/// never-polled feed never errors on the publishing side.
pub struct ChangeFeed {
    watches: Vec<Watch>,
    receiver: broadcast::Receiver<TableEvent>,
}

impl ChangeFeed {
    /// Resolves once any watched table changes. The event itself is not
    /// exposed: the subscriber contract is invalidate-and-refetch, so a
    /// lagged receiver reports a change the same way. Returns `None` when
    /// the publishing side is gone.
    pub async fn next(&mut self) -> Option<()> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.watches.iter().any(|watch| watch.matches(&event)) {
                        return Some(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(()),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_matching() {
        let global = Watch::Posts(DbScope::Global);
        let community = Watch::Posts(DbScope::Community(DbId::from("c1")));

        let global_event = TableEvent::Posts {
            op: RowOp::Insert,
            community: None,
        };
        let community_event = TableEvent::Posts {
            op: RowOp::Insert,
            community: Some(DbId::from("c1")),
        };
        let like_event = TableEvent::Likes { op: RowOp::Delete };

        assert!(global.matches(&global_event));
        assert!(!global.matches(&community_event));
        assert!(!global.matches(&like_event));

        assert!(community.matches(&community_event));
        assert!(!community.matches(&global_event));

        assert!(Watch::Likes.matches(&like_event));
        assert!(!Watch::Likes.matches(&global_event));
    }

    #[tokio::test]
    async fn feed_skips_unwatched_events() {
        let bus = ChangeBus::new();
        let mut feed = bus.watch(vec![Watch::Posts(DbScope::Global)]);

        bus.publish(TableEvent::Posts {
            op: RowOp::Insert,
            community: Some(DbId::from("c1")),
        });
        bus.publish(TableEvent::Posts {
            op: RowOp::Insert,
            community: None,
        });

        // The community event is consumed and skipped, the global one lands.
        assert_eq!(feed.next().await, Some(()));

        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), feed.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn feed_ends_when_bus_dropped() {
        let bus = ChangeBus::new();
        let mut feed = bus.watch(vec![Watch::Likes]);
        drop(bus);
        assert_eq!(feed.next().await, None);
    }
}
