//! ============================================================================
//! WARDEN-CORE: Gatewarden's Brain
//! ============================================================================
//! This crate handles all backend logic for the Gatewarden access workflow:
//! - Token minting and credential issuance for members and guests
//! - Scan validation and pending-request creation
//! - Administrator approval handshake with requester notification
//! - Append-only access log, bulletins, and conversational dialogs
//! ============================================================================

pub mod approval;
pub mod audit;
pub mod bulletin;
pub mod channel;
pub mod config;
pub mod dialog;
pub mod encoder;
pub mod error;
pub mod gatekeeper;
pub mod issuer;
pub mod scanner;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testkit;

// Re-export main types for convenience
pub use channel::{parse_action, AdminPrompt, MessageChannel};
pub use config::GateConfig;
pub use encoder::PassEncoder;
pub use error::{GateError, Result};
pub use gatekeeper::Gatekeeper;
pub use store::GateStore;
pub use types::*;
