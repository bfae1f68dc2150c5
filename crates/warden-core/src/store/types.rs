//! ============================================================================
//! Record Types - Serializable records for redb storage
//! ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ChannelId, Outcome, RequestVariant, TokenId};

/// Registered member: self-registering identity bound to a messaging channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: Uuid,
    /// Externally-supplied requester id (messaging-channel user id).
    pub channel_id: ChannelId,
    pub full_name: String,
    pub vehicle: Option<String>,
    /// Bound credential: members may only present their own token.
    pub token_id: TokenId,
    pub is_active: bool,
    /// Encoded credential image, set once an administrator issues it.
    pub credential_image: Option<Vec<u8>>,
    pub created_at: i64,
}

/// Staff identity, managed by administrators only.
/// Staff never self-scan and carry no token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: Uuid,
    pub full_name: String,
    pub position: String,
    pub vehicle: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

/// Temporary guest pass: anonymous bearer credential with an absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestRecord {
    pub id: Uuid,
    pub token_id: TokenId,
    pub expires_at: i64,
    pub is_active: bool,
    pub credential_image: Option<Vec<u8>>,
    pub created_at: i64,
}

/// Ephemeral record bridging a scan event to an administrator's decision.
/// Keyed by token id; a new scan of the same token supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub token_id: TokenId,
    pub requester: ChannelId,
    pub variant: RequestVariant,
    pub created_at: i64,
}

/// Immutable append-only record of a completed decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Monotonic insertion order.
    pub seq: u64,
    pub variant: RequestVariant,
    /// Token id for guests, requester channel id for members.
    pub identity_ref: i64,
    pub outcome: Outcome,
    pub timestamp: i64,
}

/// Attachment kind accepted on a bulletin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Photo,
    Video,
    Document,
}

/// Opaque reference to a channel-hosted media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub file_ref: String,
}

/// Administrator-published announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub attachment: Option<Attachment>,
    pub created_at: i64,
}

/// Record counts across all tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub members: usize,
    pub staff: usize,
    pub guests: usize,
    pub pending: usize,
    pub log_entries: usize,
    pub bulletins: usize,
}
