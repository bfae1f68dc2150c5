//! ============================================================================
//! Bulletins - Administrator announcements with member broadcast
//! ============================================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::channel::MessageChannel;
use crate::dialog::BulletinDraft;
use crate::error::Result;
use crate::store::{BulletinRecord, GateStore};

/// Publishes announcements and fans them out to every registered member.
pub struct BulletinBoard {
    store: Arc<GateStore>,
    channel: Arc<dyn MessageChannel>,
}

impl BulletinBoard {
    pub fn new(store: Arc<GateStore>, channel: Arc<dyn MessageChannel>) -> Self {
        Self { store, channel }
    }

    /// Persist the bulletin, then broadcast it to all member channels.
    ///
    /// Per-recipient delivery failures are logged and swallowed; a dead
    /// channel never blocks the announcement or the remaining recipients.
    pub async fn publish(&self, draft: BulletinDraft) -> Result<BulletinRecord> {
        let bulletin = BulletinRecord {
            id: Uuid::new_v4(),
            title: draft.title,
            body: draft.body,
            attachment: draft.attachment,
            created_at: Utc::now().timestamp(),
        };
        self.store.append_bulletin(&bulletin)?;

        let text = format!("{}\n\n{}", bulletin.title, bulletin.body);
        let members = self.store.list_members()?;
        let mut delivered = 0usize;
        for member in &members {
            match self.channel.send_text(member.channel_id, &text).await {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(
                        "Bulletin delivery to channel {} failed: {error}",
                        member.channel_id
                    );
                }
            }
        }

        info!(
            "Published bulletin '{}' to {delivered}/{} members",
            bulletin.title,
            members.len()
        );
        Ok(bulletin)
    }

    /// Most recently published bulletin, if any.
    pub fn latest(&self) -> Result<Option<BulletinRecord>> {
        self.store.latest_bulletin()
    }

    /// All bulletins, newest first.
    pub fn list(&self) -> Result<Vec<BulletinRecord>> {
        self.store.list_bulletins()
    }

    /// Admin bulk reset.
    pub fn truncate(&self) -> Result<()> {
        self.store.truncate_bulletins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{self, RecordingChannel};

    fn draft(title: &str) -> BulletinDraft {
        BulletinDraft {
            title: title.to_string(),
            body: "body".to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn test_publish_broadcasts_to_all_members() {
        let (store, _dir) = testkit::temp_store();
        store
            .create_member(&testkit::member(10, "Ivanov Ivan Ivanovich", 111))
            .unwrap();
        store
            .create_member(&testkit::member(20, "Petrov Petr Petrovich", 222))
            .unwrap();
        let channel = Arc::new(RecordingChannel::default());
        let board = BulletinBoard::new(store, channel.clone());

        board.publish(draft("Maintenance")).await.unwrap();

        assert!(channel.texts_for(10)[0].contains("Maintenance"));
        assert!(channel.texts_for(20)[0].contains("Maintenance"));
    }

    #[tokio::test]
    async fn test_publish_survives_delivery_failures() {
        let (store, _dir) = testkit::temp_store();
        store
            .create_member(&testkit::member(10, "Ivanov Ivan Ivanovich", 111))
            .unwrap();
        let channel = Arc::new(RecordingChannel::failing());
        let board = BulletinBoard::new(store, channel);

        let bulletin = board.publish(draft("Still published")).await.unwrap();
        assert_eq!(board.latest().unwrap().unwrap().id, bulletin.id);
    }

    #[tokio::test]
    async fn test_latest_and_list_order() {
        let (store, _dir) = testkit::temp_store();
        let board = BulletinBoard::new(store, Arc::new(RecordingChannel::default()));

        board.publish(draft("first")).await.unwrap();
        board.publish(draft("second")).await.unwrap();

        assert_eq!(board.latest().unwrap().unwrap().title, "second");
        let all = board.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "second");

        board.truncate().unwrap();
        assert!(board.latest().unwrap().is_none());
    }
}
