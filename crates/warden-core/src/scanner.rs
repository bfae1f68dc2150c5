//! ============================================================================
//! Scan Validator - Token resolution and pending request creation
//! ============================================================================
//! Resolves a scanned token to exactly one identity or rejects it. Guest
//! lookup runs FIRST and wins over the member self-check; this ordering is
//! load-bearing. Members hold bound credentials (the token must be their
//! own), guests are anonymous bearer-token holders (any scanning channel may
//! present a guest token). The asymmetry is intentional.
//! ============================================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{GateStore, PendingRequest};
use crate::types::{ChannelId, RejectionReason, RequestVariant, ScanOutcome, TokenId};

/// Validates scanned tokens and emits pending requests.
pub struct ScanValidator {
    store: Arc<GateStore>,
}

impl ScanValidator {
    pub fn new(store: Arc<GateStore>) -> Self {
        Self { store }
    }

    /// Validate a scan and persist the resulting pending request.
    ///
    /// Rejections are returned as values; only storage failures are errors.
    pub fn validate(&self, token: TokenId, requester: ChannelId) -> Result<ScanOutcome> {
        self.validate_at(token, requester, Utc::now().timestamp())
    }

    fn validate_at(&self, token: TokenId, requester: ChannelId, now: i64) -> Result<ScanOutcome> {
        // Guest passes first: bearer tokens, matched by the token itself.
        if let Some(guest) = self.store.get_guest(token)? {
            if !guest.is_active {
                debug!("Scan of blocked guest pass {token}");
                return Ok(ScanOutcome::Rejected(RejectionReason::Blocked));
            }
            // The deadline instant itself is already expired, so a pass
            // issued for zero days is rejected on an immediate scan.
            if now >= guest.expires_at {
                debug!("Scan of expired guest pass {token}");
                return Ok(ScanOutcome::Rejected(RejectionReason::Expired));
            }
            return self.emit_pending(token, requester, RequestVariant::Guest, now);
        }

        // Members are identified by the scanning channel, then the token is
        // checked against their own credential.
        let Some(member) = self.store.get_member(requester)? else {
            debug!("Scan from unregistered channel {requester}");
            return Ok(ScanOutcome::Rejected(RejectionReason::Unregistered));
        };
        if member.token_id != token {
            debug!("Channel {requester} presented a foreign token");
            return Ok(ScanOutcome::Rejected(RejectionReason::TokenMismatch));
        }
        if !member.is_active {
            debug!("Scan from blocked member channel {requester}");
            return Ok(ScanOutcome::Rejected(RejectionReason::Blocked));
        }
        self.emit_pending(token, requester, RequestVariant::Member, now)
    }

    fn emit_pending(
        &self,
        token: TokenId,
        requester: ChannelId,
        variant: RequestVariant,
        now: i64,
    ) -> Result<ScanOutcome> {
        let request = PendingRequest {
            token_id: token,
            requester,
            variant,
            created_at: now,
        };
        // A second scan of the same token supersedes the outstanding request.
        self.store.put_pending(&request)?;

        info!(
            "Pending {} request for token {} from channel {}",
            variant.as_str(),
            token,
            requester
        );
        Ok(ScanOutcome::Pending(request))
    }
}
