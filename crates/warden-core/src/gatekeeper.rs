//! ============================================================================
//! Gatekeeper - Facade composing the full access-control workflow
//! ============================================================================
//! One entry point per user-visible operation. Administrative operations are
//! gated on the configured admin set; everything else is open to any channel.
//! The transport layer calls into this and nothing else.
//! ============================================================================

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::approval::ApprovalCoordinator;
use crate::audit::AccessLog;
use crate::bulletin::BulletinBoard;
use crate::channel::MessageChannel;
use crate::config::GateConfig;
use crate::dialog::{BulletinDraft, DialogTracker};
use crate::encoder::PassEncoder;
use crate::error::{GateError, Result};
use crate::issuer::{CredentialIssuer, IssuedGuestPass};
use crate::scanner::ScanValidator;
use crate::store::{
    AccessLogEntry, BulletinRecord, GateStore, MemberRecord, PendingRequest, StaffRecord,
    StoreStats,
};
use crate::types::{ChannelId, Decision, DecisionResult, MemberDraft, ScanOutcome, TokenId, ToggleKind};

/// Top-level service object wiring store, issuer, validator, coordinator,
/// audit log, bulletins, and dialog state together.
pub struct Gatekeeper {
    config: GateConfig,
    store: Arc<GateStore>,
    issuer: CredentialIssuer,
    scanner: ScanValidator,
    coordinator: ApprovalCoordinator,
    audit: AccessLog,
    bulletins: BulletinBoard,
    dialogs: DialogTracker,
}

impl Gatekeeper {
    /// Open the store at the configured path and wire the full service.
    pub fn open(
        config: GateConfig,
        channel: Arc<dyn MessageChannel>,
        encoder: Arc<dyn PassEncoder>,
    ) -> Result<Self> {
        let store = Arc::new(GateStore::open(config.db_path.as_deref())?);
        Ok(Self::new(config, store, channel, encoder))
    }

    pub fn new(
        config: GateConfig,
        store: Arc<GateStore>,
        channel: Arc<dyn MessageChannel>,
        encoder: Arc<dyn PassEncoder>,
    ) -> Self {
        let coordinator =
            ApprovalCoordinator::new(store.clone(), channel.clone(), config.admin_chat);
        Self {
            issuer: CredentialIssuer::new(store.clone(), encoder),
            scanner: ScanValidator::new(store.clone()),
            audit: AccessLog::new(store.clone()),
            bulletins: BulletinBoard::new(store.clone(), channel),
            dialogs: DialogTracker::new(),
            coordinator,
            config,
            store,
        }
    }

    fn require_admin(&self, channel: ChannelId) -> Result<()> {
        if self.config.is_admin(channel) {
            Ok(())
        } else {
            warn!("Channel {channel} attempted an administrative operation");
            Err(GateError::Unauthorized)
        }
    }

    /// Conversational state machines, driven by the transport.
    pub fn dialogs(&self) -> &DialogTracker {
        &self.dialogs
    }

    // ------------------------------------------------------------------------
    // Member-facing operations
    // ------------------------------------------------------------------------

    /// Complete a registration dialog: create the member with a fresh token.
    pub async fn register_member(
        &self,
        channel: ChannelId,
        draft: MemberDraft,
    ) -> Result<MemberRecord> {
        self.issuer.register_member(channel, draft).await
    }

    /// Return the caller's stored credential image.
    pub fn member_credential(&self, channel: ChannelId) -> Result<Vec<u8>> {
        let member = self
            .store
            .get_member(channel)?
            .ok_or_else(|| GateError::NotFound(format!("member for channel {channel}")))?;
        member.credential_image.ok_or_else(|| {
            GateError::InvalidState("credential has not been issued yet".into())
        })
    }

    /// Validate a scan. A valid scan leaves a pending request behind and
    /// pushes an approval prompt to the admin chat.
    pub async fn scan(&self, token: TokenId, requester: ChannelId) -> Result<ScanOutcome> {
        let outcome = self.scanner.validate(token, requester)?;
        if let ScanOutcome::Pending(request) = &outcome {
            // The request is already persisted; a dead admin channel must
            // not turn a valid scan into an error.
            if let Err(error) = self.coordinator.route(request).await {
                warn!("Approval prompt delivery failed: {error}");
            }
        }
        Ok(outcome)
    }

    /// Latest published bulletin, readable by any channel.
    pub fn latest_bulletin(&self) -> Result<Option<BulletinRecord>> {
        self.bulletins.latest()
    }

    // ------------------------------------------------------------------------
    // Administrative operations
    // ------------------------------------------------------------------------

    /// Resolve a pending request. Safe to call concurrently; losers of the
    /// race observe `DecisionResult::Stale`.
    pub async fn decide(
        &self,
        admin: ChannelId,
        token: TokenId,
        decision: Decision,
    ) -> Result<DecisionResult> {
        self.require_admin(admin)?;
        self.coordinator.decide(token, decision).await
    }

    /// Generate (or regenerate) a member credential, looked up by full name.
    pub fn issue_member_credential(
        &self,
        admin: ChannelId,
        full_name: &str,
    ) -> Result<(MemberRecord, Vec<u8>)> {
        self.require_admin(admin)?;
        self.issuer.issue_member_credential(full_name)
    }

    pub fn create_staff(
        &self,
        admin: ChannelId,
        full_name: &str,
        position: &str,
        vehicle: Option<String>,
    ) -> Result<StaffRecord> {
        self.require_admin(admin)?;
        self.issuer.create_staff(full_name, position, vehicle)
    }

    /// Mint a guest pass valid for `days` days.
    pub async fn create_guest_pass(&self, admin: ChannelId, days: i64) -> Result<IssuedGuestPass> {
        self.require_admin(admin)?;
        self.issuer.create_guest_pass(days).await
    }

    /// Flip the active flag on a staff record or guest pass.
    pub fn toggle_block(&self, admin: ChannelId, id: &Uuid, kind: ToggleKind) -> Result<bool> {
        self.require_admin(admin)?;
        let now_active = match kind {
            ToggleKind::Staff => {
                let mut staff = self
                    .store
                    .get_staff(id)?
                    .ok_or_else(|| GateError::NotFound(format!("staff {id}")))?;
                staff.is_active = !staff.is_active;
                self.store.update_staff(&staff)?;
                staff.is_active
            }
            ToggleKind::Guest => {
                let mut guest = self
                    .store
                    .find_guest_by_id(id)?
                    .ok_or_else(|| GateError::NotFound(format!("guest pass {id}")))?;
                guest.is_active = !guest.is_active;
                self.store.update_guest(&guest)?;
                guest.is_active
            }
        };
        info!("Toggled {id} to active={now_active}");
        Ok(now_active)
    }

    pub fn pending_requests(&self, admin: ChannelId) -> Result<Vec<PendingRequest>> {
        self.require_admin(admin)?;
        self.store.list_pending()
    }

    /// Last `n` audit entries, oldest first within the window.
    pub fn recent_log(&self, admin: ChannelId, n: usize) -> Result<Vec<AccessLogEntry>> {
        self.require_admin(admin)?;
        self.audit.recent(n)
    }

    pub fn truncate_log(&self, admin: ChannelId) -> Result<()> {
        self.require_admin(admin)?;
        self.audit.truncate()
    }

    /// Publish a bulletin and broadcast it to every member.
    pub async fn publish_bulletin(
        &self,
        admin: ChannelId,
        draft: BulletinDraft,
    ) -> Result<BulletinRecord> {
        self.require_admin(admin)?;
        self.bulletins.publish(draft).await
    }

    pub fn list_bulletins(&self, admin: ChannelId) -> Result<Vec<BulletinRecord>> {
        self.require_admin(admin)?;
        self.bulletins.list()
    }

    pub fn truncate_bulletins(&self, admin: ChannelId) -> Result<()> {
        self.require_admin(admin)?;
        self.bulletins.truncate()
    }

    pub fn stats(&self, admin: ChannelId) -> Result<StoreStats> {
        self.require_admin(admin)?;
        self.store.stats()
    }
}
