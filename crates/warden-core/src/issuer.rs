//! ============================================================================
//! Credential Issuer - Token minting and credential issuance
//! ============================================================================
//! Mints unique numeric token ids from the 10-digit space, associates them
//! with identity records, and asks the external encoder for the visual
//! credential. The collision-check-then-insert sequence is serialized by a
//! mint lock so no two live identities ever share a token.
//! ============================================================================

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::encoder::{guest_payload, member_payload, PassEncoder};
use crate::error::{GateError, Result};
use crate::store::{GateStore, GuestRecord, MemberRecord, StaffRecord};
use crate::types::{ChannelId, MemberDraft, TokenId, TOKEN_SPACE};

/// Result of minting a temporary guest pass. The caller needs both ids:
/// the internal id for image retrieval, the token for communicating the
/// credential.
#[derive(Debug, Clone)]
pub struct IssuedGuestPass {
    pub guest_id: Uuid,
    pub token_id: TokenId,
    pub expires_at: i64,
    pub image: Vec<u8>,
}

/// Mints tokens and issues member credentials and guest passes.
pub struct CredentialIssuer {
    store: Arc<GateStore>,
    encoder: Arc<dyn PassEncoder>,
    /// Serializes collision-check-then-insert across concurrent issuance.
    mint_lock: tokio::sync::Mutex<()>,
}

impl CredentialIssuer {
    pub fn new(store: Arc<GateStore>, encoder: Arc<dyn PassEncoder>) -> Self {
        Self {
            store,
            encoder,
            mint_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Register a new member with a freshly minted token. The credential
    /// image is generated later by an administrator.
    pub async fn register_member(
        &self,
        channel_id: ChannelId,
        draft: MemberDraft,
    ) -> Result<MemberRecord> {
        if draft.full_name.split_whitespace().count() < 3 {
            return Err(GateError::InvalidState(
                "full name must have at least 3 components".into(),
            ));
        }
        if self.store.get_member(channel_id)?.is_some() {
            return Err(GateError::AlreadyExists(format!(
                "member for channel {channel_id}"
            )));
        }

        let _guard = self.mint_lock.lock().await;
        let token_id = self.mint_token()?;
        let member = MemberRecord {
            id: Uuid::new_v4(),
            channel_id,
            full_name: draft.full_name,
            vehicle: draft.vehicle,
            token_id,
            is_active: true,
            credential_image: None,
            created_at: Utc::now().timestamp(),
        };
        self.store.create_member(&member)?;

        info!("Registered member for channel {channel_id}");
        Ok(member)
    }

    /// Create a staff record. Staff carry no token and never self-scan.
    pub fn create_staff(
        &self,
        full_name: &str,
        position: &str,
        vehicle: Option<String>,
    ) -> Result<StaffRecord> {
        let staff = StaffRecord {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            position: position.to_string(),
            vehicle,
            is_active: true,
            created_at: Utc::now().timestamp(),
        };
        self.store.create_staff(&staff)?;

        info!("Created staff record {}", staff.id);
        Ok(staff)
    }

    /// Issue (or re-issue) a member credential, looked up by full name.
    ///
    /// The payload is re-derived from current record state on every call, so
    /// re-issuing is idempotent in content but overwrites the stored image.
    pub fn issue_member_credential(&self, full_name: &str) -> Result<(MemberRecord, Vec<u8>)> {
        let mut member = self
            .store
            .find_member_by_name(full_name)?
            .ok_or_else(|| GateError::NotFound(format!("member named '{full_name}'")))?;

        let payload = member_payload(&member, Utc::now());
        let image = self.encoder.encode(&payload)?;

        member.credential_image = Some(image.clone());
        self.store.update_member(&member)?;

        info!("Issued credential for member channel {}", member.channel_id);
        Ok((member, image))
    }

    /// Mint a temporary guest pass valid for `days` days from now.
    pub async fn create_guest_pass(&self, days: i64) -> Result<IssuedGuestPass> {
        let now = Utc::now();
        let expires_at = (now + Duration::days(days)).timestamp();

        let _guard = self.mint_lock.lock().await;
        let token_id = self.mint_token()?;
        let mut guest = GuestRecord {
            id: Uuid::new_v4(),
            token_id,
            expires_at,
            is_active: true,
            credential_image: None,
            created_at: now.timestamp(),
        };
        self.store.create_guest(&guest)?;
        drop(_guard);

        let image = self.encoder.encode(&guest_payload(token_id))?;
        guest.credential_image = Some(image.clone());
        self.store.update_guest(&guest)?;

        info!("Created guest pass {} valid for {} days", token_id, days);
        Ok(IssuedGuestPass {
            guest_id: guest.id,
            token_id,
            expires_at,
            image,
        })
    }

    /// Sample the 10-digit space, retrying while the candidate collides with
    /// any live member or guest token. Caller must hold the mint lock.
    fn mint_token(&self) -> Result<TokenId> {
        loop {
            let candidate = rand::thread_rng().gen_range(0..TOKEN_SPACE);
            if !self.store.token_in_use(candidate)? {
                return Ok(candidate);
            }
            debug!("Token collision on {candidate}, re-sampling");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{self, BrokenEncoder, StubEncoder};
    use std::collections::HashSet;

    fn issuer(store: Arc<GateStore>) -> CredentialIssuer {
        CredentialIssuer::new(store, Arc::new(StubEncoder))
    }

    fn draft(name: &str) -> MemberDraft {
        MemberDraft {
            full_name: name.to_string(),
            vehicle: None,
        }
    }

    #[tokio::test]
    async fn test_issued_tokens_are_unique() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store.clone());

        let mut seen = HashSet::new();
        let member = issuer
            .register_member(100, draft("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();
        seen.insert(member.token_id);

        for _ in 0..50 {
            let pass = issuer.create_guest_pass(1).await.unwrap();
            assert!(pass.token_id < TOKEN_SPACE);
            assert!(seen.insert(pass.token_id), "token minted twice");
        }
    }

    #[tokio::test]
    async fn test_register_rejects_short_name() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store);

        let err = issuer
            .register_member(100, draft("Ivanov Ivan"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_channel() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store);

        issuer
            .register_member(100, draft("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();
        let err = issuer
            .register_member(100, draft("Petrov Petr Petrovich"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_issue_credential_unknown_name() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store);

        let err = issuer
            .issue_member_credential("Nobody At All")
            .unwrap_err();
        assert!(matches!(err, GateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_issue_credential_persists_image() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store.clone());

        let member = issuer
            .register_member(100, draft("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();
        assert!(member.credential_image.is_none());

        let (_, image) = issuer
            .issue_member_credential("Ivanov Ivan Ivanovich")
            .unwrap();
        let payload = String::from_utf8(image).unwrap();
        assert!(payload.contains(&format!("ID: {}", member.token_id)));

        let stored = store.get_member(100).unwrap().unwrap();
        assert!(stored.credential_image.is_some());
    }

    #[tokio::test]
    async fn test_encoder_failure_is_surfaced() {
        let (store, _dir) = testkit::temp_store();
        let issuer = CredentialIssuer::new(store.clone(), Arc::new(BrokenEncoder));

        issuer
            .register_member(100, draft("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();
        let err = issuer
            .issue_member_credential("Ivanov Ivan Ivanovich")
            .unwrap_err();
        assert!(matches!(err, GateError::Encoder(_)));
    }

    #[tokio::test]
    async fn test_zero_day_pass_expires_immediately() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store);

        let before = Utc::now().timestamp();
        let pass = issuer.create_guest_pass(0).await.unwrap();
        let after = Utc::now().timestamp();

        // Expiry computed at issuance equals "now"; the deadline instant
        // counts as expired, so even an immediate scan rejects.
        assert!(pass.expires_at >= before && pass.expires_at <= after);
        let image = String::from_utf8(pass.image).unwrap();
        assert_eq!(image, format!("TEMP PASS ID: {}", pass.token_id));
    }

    #[tokio::test]
    async fn test_staff_created_without_token() {
        let (store, _dir) = testkit::temp_store();
        let issuer = issuer(store.clone());

        let staff = issuer
            .create_staff("Sidorov Semen Semenovich", "security", None)
            .unwrap();
        let stored = store.get_staff(&staff.id).unwrap().unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.position, "security");
    }
}
