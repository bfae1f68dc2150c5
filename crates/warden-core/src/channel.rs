//! ============================================================================
//! Message Channel - Conversational front-end seam
//! ============================================================================
//! The transport (bot, console, test double) lives behind `MessageChannel`.
//! Admin prompts embed an allow/deny action pair keyed by token id; the
//! action-string format is what a callback-style transport round-trips.
//! ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::store::PendingRequest;
use crate::types::{ChannelId, Decision, RequestVariant, TokenId};

const ALLOW_PREFIX: &str = "access_allow_";
const DENY_PREFIX: &str = "access_deny_";

/// Outbound messaging surface. Delivery failures are `GateError::Delivery`
/// and are always caught, logged, and swallowed at the notification site.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send_text(&self, chat: ChannelId, text: &str) -> Result<()>;

    async fn send_image(&self, chat: ChannelId, image: &[u8], caption: &str) -> Result<()>;

    /// Admin-only push carrying the allow/deny action pair.
    async fn send_admin_prompt(&self, chat: ChannelId, prompt: &AdminPrompt) -> Result<()>;
}

/// Administrator approval prompt for one pending request.
#[derive(Debug, Clone)]
pub struct AdminPrompt {
    pub token_id: TokenId,
    pub text: String,
}

impl AdminPrompt {
    /// Build the prompt text for a freshly validated scan.
    pub fn for_request(request: &PendingRequest, detail: &str) -> Self {
        let text = match request.variant {
            RequestVariant::Guest => {
                format!("Guest access request\nToken: {}\n{}", request.token_id, detail)
            }
            RequestVariant::Member => {
                format!("Member access request\n{}\nToken: {}", detail, request.token_id)
            }
        };
        Self {
            token_id: request.token_id,
            text,
        }
    }

    /// Callback payload for the allow action.
    pub fn allow_action(&self) -> String {
        format!("{}{}", ALLOW_PREFIX, self.token_id)
    }

    /// Callback payload for the deny action.
    pub fn deny_action(&self) -> String {
        format!("{}{}", DENY_PREFIX, self.token_id)
    }
}

/// Parse a callback action string back into a decision and token id.
/// Returns None for anything that is not a well-formed action payload.
pub fn parse_action(data: &str) -> Option<(Decision, TokenId)> {
    let (decision, rest) = if let Some(rest) = data.strip_prefix(ALLOW_PREFIX) {
        (Decision::Allow, rest)
    } else if let Some(rest) = data.strip_prefix(DENY_PREFIX) {
        (Decision::Deny, rest)
    } else {
        return None;
    };
    rest.parse::<TokenId>().ok().map(|token| (decision, token))
}
