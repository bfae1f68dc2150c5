//! ============================================================================
//! Core Types for Gatewarden
//! ============================================================================
//! Defines the vocabulary shared by the issuer, scan validator, approval
//! coordinator, and audit log: token ids, identity variants, scan outcomes,
//! and administrator decisions.
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::store::types::PendingRequest;

/// Messaging-channel identity of a requester or administrator chat.
pub type ChannelId = i64;

/// Numeric value embedded in a QR credential.
pub type TokenId = u64;

/// Token ids are drawn from a fixed-width 10-decimal-digit space.
pub const TOKEN_SPACE: u64 = 10_000_000_000;

/// Variant tag carried by a pending request and its audit entry.
///
/// Only members and guests reach the approval path, so staff is
/// unrepresentable here by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestVariant {
    Member,
    Guest,
}

impl RequestVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }
}

/// Administrator's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// The audit-log outcome this decision records.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Allow => Outcome::Granted,
            Self::Deny => Outcome::Denied,
        }
    }
}

/// Completed decision outcome as written to the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Granted,
    Denied,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

/// Why a scan was rejected before reaching an administrator.
///
/// Rejections are values, not errors: they are terminal for the triggering
/// request and never propagate past the scan validator boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    /// Identity's active flag is off.
    Blocked,
    /// Guest pass deadline has passed.
    Expired,
    /// Scanning channel has no member record.
    Unregistered,
    /// Member presented a token that is not their own credential.
    TokenMismatch,
}

impl RejectionReason {
    /// User-facing rejection message.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Blocked => "This pass is blocked.",
            Self::Expired => "This temporary pass has expired.",
            Self::Unregistered => "Invalid pass. Contact the administrator.",
            Self::TokenMismatch => "This is not your credential.",
        }
    }
}

/// Result of validating a scanned token.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Scan is valid; the pending request has been persisted and awaits
    /// routing to the administrator.
    Pending(PendingRequest),
    /// Scan was rejected with a specific reason.
    Rejected(RejectionReason),
}

/// Result of an administrator decision.
#[derive(Debug, Clone)]
pub enum DecisionResult {
    /// The decision was applied: state mutated, log entry written, requester
    /// notified (or notification failure swallowed).
    Completed(CompletedDecision),
    /// The pending request no longer exists; nothing was done.
    Stale,
}

/// Details of an applied decision.
#[derive(Debug, Clone)]
pub struct CompletedDecision {
    pub variant: RequestVariant,
    pub outcome: Outcome,
    pub requester: ChannelId,
    /// Whether the requester notification was actually delivered.
    pub notified: bool,
}

/// Identity kinds addressable by the admin block/unblock command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Staff,
    Guest,
}

/// Completed registration dialog output: a member waiting to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    pub full_name: String,
    pub vehicle: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_maps_to_outcome() {
        assert_eq!(Decision::Allow.outcome(), Outcome::Granted);
        assert_eq!(Decision::Deny.outcome(), Outcome::Denied);
    }

    #[test]
    fn test_variant_tags() {
        assert_eq!(RequestVariant::Member.as_str(), "member");
        assert_eq!(RequestVariant::Guest.as_str(), "guest");
        assert_eq!(Outcome::Granted.as_str(), "granted");
        assert_eq!(Outcome::Denied.as_str(), "denied");
    }

    #[test]
    fn test_rejection_messages_are_distinct() {
        let reasons = [
            RejectionReason::Blocked,
            RejectionReason::Expired,
            RejectionReason::Unregistered,
            RejectionReason::TokenMismatch,
        ];
        for (i, a) in reasons.iter().enumerate() {
            for b in reasons.iter().skip(i + 1) {
                assert_ne!(a.user_message(), b.user_message());
            }
        }
    }
}
