//! Shared test fixtures: temp-backed stores, record builders, and recording
//! doubles for the channel and encoder seams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use crate::channel::{AdminPrompt, MessageChannel};
use crate::encoder::PassEncoder;
use crate::error::{GateError, Result};
use crate::store::{BulletinRecord, GateStore, GuestRecord, MemberRecord, PendingRequest};
use crate::types::{ChannelId, RequestVariant, TokenId};

pub(crate) fn temp_store() -> (Arc<GateStore>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = GateStore::open(Some(&dir.path().join("warden.redb"))).expect("open store");
    (Arc::new(store), dir)
}

pub(crate) fn member(channel_id: ChannelId, full_name: &str, token_id: TokenId) -> MemberRecord {
    MemberRecord {
        id: Uuid::new_v4(),
        channel_id,
        full_name: full_name.to_string(),
        vehicle: None,
        token_id,
        is_active: true,
        credential_image: None,
        created_at: 0,
    }
}

pub(crate) fn guest(token_id: TokenId, expires_at: i64) -> GuestRecord {
    GuestRecord {
        id: Uuid::new_v4(),
        token_id,
        expires_at,
        is_active: true,
        credential_image: None,
        created_at: 0,
    }
}

pub(crate) fn pending(token_id: TokenId, requester: ChannelId) -> PendingRequest {
    PendingRequest {
        token_id,
        requester,
        variant: RequestVariant::Guest,
        created_at: 0,
    }
}

pub(crate) fn bulletin(title: &str) -> BulletinRecord {
    BulletinRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        body: "body".to_string(),
        attachment: None,
        created_at: 0,
    }
}

/// Channel double that records everything sent through it and can be told
/// to fail deliveries.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub texts: Mutex<Vec<(ChannelId, String)>>,
    pub images: Mutex<Vec<(ChannelId, String)>>,
    pub prompts: Mutex<Vec<(ChannelId, AdminPrompt)>>,
    pub fail_deliveries: AtomicBool,
}

impl RecordingChannel {
    pub fn failing() -> Self {
        let channel = Self::default();
        channel.fail_deliveries.store(true, Ordering::SeqCst);
        channel
    }

    pub fn texts_for(&self, chat: ChannelId) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn prompts_for(&self, chat: ChannelId) -> Vec<AdminPrompt> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send_text(&self, chat: ChannelId, text: &str) -> Result<()> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(GateError::Delivery(format!("chat {chat} unreachable")));
        }
        self.texts.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }

    async fn send_image(&self, chat: ChannelId, _image: &[u8], caption: &str) -> Result<()> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(GateError::Delivery(format!("chat {chat} unreachable")));
        }
        self.images.lock().unwrap().push((chat, caption.to_string()));
        Ok(())
    }

    async fn send_admin_prompt(&self, chat: ChannelId, prompt: &AdminPrompt) -> Result<()> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(GateError::Delivery(format!("chat {chat} unreachable")));
        }
        self.prompts.lock().unwrap().push((chat, prompt.clone()));
        Ok(())
    }
}

/// Encoder double that returns the payload bytes unchanged.
pub(crate) struct StubEncoder;

impl PassEncoder for StubEncoder {
    fn encode(&self, payload: &str) -> Result<Vec<u8>> {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Encoder double that always fails.
pub(crate) struct BrokenEncoder;

impl PassEncoder for BrokenEncoder {
    fn encode(&self, _payload: &str) -> Result<Vec<u8>> {
        Err(GateError::Encoder("render backend offline".into()))
    }
}
