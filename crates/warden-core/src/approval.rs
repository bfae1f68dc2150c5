//! ============================================================================
//! Approval Coordinator - Human-in-the-loop decision handling
//! ============================================================================
//! Routes pending requests to the administrator channel and applies the
//! resulting allow/deny decision: identity mutation (guest blocking only),
//! audit log append, pending-request retirement, and requester notification.
//!
//! The read-decide-write-remove sequence runs inside a per-token-id mutex
//! scope so two administrators deciding the same request produce exactly one
//! log entry and one notification; the loser observes a stale request.
//! Notification happens outside the critical section and its failure never
//! rolls anything back: the decision is authoritative once the administrator
//! acts, independent of delivery.
//! ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tracing::{info, warn};

use crate::audit::AccessLog;
use crate::channel::{AdminPrompt, MessageChannel};
use crate::error::{GateError, Result};
use crate::store::{GateStore, PendingRequest};
use crate::types::{
    ChannelId, CompletedDecision, Decision, DecisionResult, RequestVariant, TokenId,
};

/// Maximum number of tracked per-token locks before idle entries are evicted
const MAX_TRACKED_LOCKS: usize = 1000;

const GRANTED_MESSAGE: &str = "Access granted. You may proceed.";
const DENIED_MESSAGE: &str = "Access denied. Contact the administrator.";

/// Applies administrator decisions to pending requests.
pub struct ApprovalCoordinator {
    store: Arc<GateStore>,
    audit: AccessLog,
    channel: Arc<dyn MessageChannel>,
    admin_chat: ChannelId,
    locks: tokio::sync::Mutex<HashMap<TokenId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ApprovalCoordinator {
    pub fn new(
        store: Arc<GateStore>,
        channel: Arc<dyn MessageChannel>,
        admin_chat: ChannelId,
    ) -> Self {
        Self {
            audit: AccessLog::new(store.clone()),
            store,
            channel,
            admin_chat,
            locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Push the approval prompt for a validated scan to the admin channel.
    pub async fn route(&self, request: &PendingRequest) -> Result<()> {
        let detail = match request.variant {
            RequestVariant::Guest => {
                let valid_until = self
                    .store
                    .get_guest(request.token_id)?
                    .map(|g| format_date(g.expires_at))
                    .unwrap_or_else(|| "unknown".to_string());
                format!("Valid until: {valid_until}")
            }
            RequestVariant::Member => self
                .store
                .get_member(request.requester)?
                .map(|m| m.full_name)
                .unwrap_or_else(|| "unknown member".to_string()),
        };

        let prompt = AdminPrompt::for_request(request, &detail);
        self.channel.send_admin_prompt(self.admin_chat, &prompt).await?;

        info!(
            "Routed {} request for token {} to admin chat",
            request.variant.as_str(),
            request.token_id
        );
        Ok(())
    }

    /// Apply an administrator decision to the pending request for `token`.
    ///
    /// Returns `DecisionResult::Stale` when the request no longer exists
    /// (already decided, or never created), an idempotent no-op.
    pub async fn decide(&self, token: TokenId, decision: Decision) -> Result<DecisionResult> {
        let lock = self.lock_for(token).await;
        let guard = lock.lock().await;

        let Some(pending) = self.store.get_pending(token)? else {
            drop(guard);
            info!("Decision on token {token} ignored: request no longer exists");
            return Ok(DecisionResult::Stale);
        };

        let outcome = decision.outcome();
        match pending.variant {
            RequestVariant::Guest => {
                // Guests get no further chances: a denial blocks the pass
                // permanently. An allow leaves state untouched.
                if decision == Decision::Deny {
                    if let Some(mut guest) = self.store.get_guest(token)? {
                        guest.is_active = false;
                        self.store.update_guest(&guest)?;
                    }
                }
                self.audit
                    .append(RequestVariant::Guest, token as i64, outcome)?;
            }
            RequestVariant::Member => {
                // Repeat denials never block a member.
                self.audit
                    .append(RequestVariant::Member, pending.requester, outcome)?;
            }
        }

        // Terminal transition regardless of notification success.
        self.store.remove_pending(token)?;
        drop(guard);

        // Notify outside the critical section so a slow or failed delivery
        // never stalls other decisions.
        let message = match outcome {
            crate::types::Outcome::Granted => GRANTED_MESSAGE,
            crate::types::Outcome::Denied => DENIED_MESSAGE,
        };
        let notified = match self.channel.send_text(pending.requester, message).await {
            Ok(()) => true,
            Err(GateError::Delivery(reason)) => {
                warn!("Could not notify requester {}: {reason}", pending.requester);
                false
            }
            Err(other) => {
                warn!("Could not notify requester {}: {other}", pending.requester);
                false
            }
        };

        info!(
            "Decision {} applied to {} request for token {}",
            outcome.as_str(),
            pending.variant.as_str(),
            token
        );
        Ok(DecisionResult::Completed(CompletedDecision {
            variant: pending.variant,
            outcome,
            requester: pending.requester,
            notified,
        }))
    }

    /// Per-token mutex, created on demand. Idle entries are evicted once the
    /// registry grows past its cap.
    async fn lock_for(&self, token: TokenId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().await;
        if locks.len() >= MAX_TRACKED_LOCKS {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(token)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

fn format_date(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format!("(invalid: {timestamp})"))
}
