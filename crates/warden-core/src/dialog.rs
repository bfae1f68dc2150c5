//! ============================================================================
//! Dialogs - Multi-step conversational state machines
//! ============================================================================
//! Registration and bulletin entry are explicit finite-state machines keyed
//! by requester channel id, independent of the messaging transport. The
//! transport feeds inputs in; the tracker answers with the next prompt, a
//! validation complaint, or the completed draft.
//! ============================================================================

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{Attachment, AttachmentKind};
use crate::types::{ChannelId, MemberDraft};

const PROMPT_FULL_NAME: &str =
    "Registration: enter your full name (surname, given name, patronymic).";
const PROMPT_VEHICLE: &str = "Enter your vehicle plate (or 'none'):";
const PROMPT_TITLE: &str = "Enter the bulletin title:";
const PROMPT_BODY: &str = "Enter the bulletin text:";
const PROMPT_ATTACHMENT: &str = "Attach a photo, video, or document, or send 'skip':";
const INVALID_NAME: &str = "Please enter your complete full name.";
const EXPECTED_TEXT: &str = "Please answer with text.";
const INVALID_ATTACHMENT: &str =
    "Unsupported attachment. Send a photo, video, or document, or 'skip'.";

/// One transport event fed into an active dialog.
#[derive(Debug)]
pub enum DialogInput<'a> {
    Text(&'a str),
    Media { kind: AttachmentKind, file_ref: String },
}

/// Tracker's answer to an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogReply {
    /// Ask for the next field.
    Prompt(String),
    /// Input rejected; the dialog stays where it was.
    Invalid(String),
    /// Registration dialog finished.
    Registration(MemberDraft),
    /// Bulletin dialog finished.
    Bulletin(BulletinDraft),
}

/// Completed bulletin dialog output, waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinDraft {
    pub title: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

enum DialogState {
    Registration(RegistrationState),
    Bulletin(BulletinState),
}

enum RegistrationState {
    AwaitingFullName,
    AwaitingVehicle { full_name: String },
}

enum BulletinState {
    AwaitingTitle,
    AwaitingBody { title: String },
    AwaitingAttachment { title: String, body: String },
}

/// Per-channel dialog state, shared across transport workers.
#[derive(Default)]
pub struct DialogTracker {
    states: RwLock<HashMap<ChannelId, DialogState>>,
}

impl DialogTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the two-step registration dialog. Any dialog already active on
    /// this channel is replaced.
    pub async fn begin_registration(&self, chat: ChannelId) -> DialogReply {
        self.states.write().await.insert(
            chat,
            DialogState::Registration(RegistrationState::AwaitingFullName),
        );
        debug!("Started registration dialog for channel {chat}");
        DialogReply::Prompt(PROMPT_FULL_NAME.to_string())
    }

    /// Start the three-step bulletin entry dialog.
    pub async fn begin_bulletin(&self, chat: ChannelId) -> DialogReply {
        self.states
            .write()
            .await
            .insert(chat, DialogState::Bulletin(BulletinState::AwaitingTitle));
        debug!("Started bulletin dialog for channel {chat}");
        DialogReply::Prompt(PROMPT_TITLE.to_string())
    }

    /// Feed one input into the channel's active dialog. Returns None when no
    /// dialog is active (the transport falls through to command handling).
    pub async fn advance(&self, chat: ChannelId, input: DialogInput<'_>) -> Option<DialogReply> {
        let mut states = self.states.write().await;
        let state = states.remove(&chat)?;

        let (next, reply) = match state {
            DialogState::Registration(reg) => Self::advance_registration(reg, input),
            DialogState::Bulletin(bul) => Self::advance_bulletin(bul, input),
        };
        if let Some(next) = next {
            states.insert(chat, next);
        }
        Some(reply)
    }

    /// Abandon the channel's active dialog, if any.
    pub async fn cancel(&self, chat: ChannelId) -> bool {
        self.states.write().await.remove(&chat).is_some()
    }

    pub async fn is_active(&self, chat: ChannelId) -> bool {
        self.states.read().await.contains_key(&chat)
    }

    fn advance_registration(
        state: RegistrationState,
        input: DialogInput<'_>,
    ) -> (Option<DialogState>, DialogReply) {
        let DialogInput::Text(text) = input else {
            return (
                Some(DialogState::Registration(state)),
                DialogReply::Invalid(EXPECTED_TEXT.to_string()),
            );
        };

        match state {
            RegistrationState::AwaitingFullName => {
                if text.split_whitespace().count() < 3 {
                    return (
                        Some(DialogState::Registration(RegistrationState::AwaitingFullName)),
                        DialogReply::Invalid(INVALID_NAME.to_string()),
                    );
                }
                (
                    Some(DialogState::Registration(RegistrationState::AwaitingVehicle {
                        full_name: text.trim().to_string(),
                    })),
                    DialogReply::Prompt(PROMPT_VEHICLE.to_string()),
                )
            }
            RegistrationState::AwaitingVehicle { full_name } => {
                let vehicle = if text.trim().eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(text.trim().to_string())
                };
                (
                    None,
                    DialogReply::Registration(MemberDraft { full_name, vehicle }),
                )
            }
        }
    }

    fn advance_bulletin(
        state: BulletinState,
        input: DialogInput<'_>,
    ) -> (Option<DialogState>, DialogReply) {
        match state {
            BulletinState::AwaitingTitle => match input {
                DialogInput::Text(text) => (
                    Some(DialogState::Bulletin(BulletinState::AwaitingBody {
                        title: text.trim().to_string(),
                    })),
                    DialogReply::Prompt(PROMPT_BODY.to_string()),
                ),
                DialogInput::Media { .. } => (
                    Some(DialogState::Bulletin(BulletinState::AwaitingTitle)),
                    DialogReply::Invalid(EXPECTED_TEXT.to_string()),
                ),
            },
            BulletinState::AwaitingBody { title } => match input {
                DialogInput::Text(text) => (
                    Some(DialogState::Bulletin(BulletinState::AwaitingAttachment {
                        title,
                        body: text.trim().to_string(),
                    })),
                    DialogReply::Prompt(PROMPT_ATTACHMENT.to_string()),
                ),
                DialogInput::Media { .. } => (
                    Some(DialogState::Bulletin(BulletinState::AwaitingBody { title })),
                    DialogReply::Invalid(EXPECTED_TEXT.to_string()),
                ),
            },
            BulletinState::AwaitingAttachment { title, body } => match input {
                DialogInput::Text(text) if text.trim().eq_ignore_ascii_case("skip") => (
                    None,
                    DialogReply::Bulletin(BulletinDraft {
                        title,
                        body,
                        attachment: None,
                    }),
                ),
                DialogInput::Media { kind, file_ref } => (
                    None,
                    DialogReply::Bulletin(BulletinDraft {
                        title,
                        body,
                        attachment: Some(Attachment { kind, file_ref }),
                    }),
                ),
                DialogInput::Text(_) => (
                    Some(DialogState::Bulletin(BulletinState::AwaitingAttachment {
                        title,
                        body,
                    })),
                    DialogReply::Invalid(INVALID_ATTACHMENT.to_string()),
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registration_happy_path() {
        let tracker = DialogTracker::new();
        tracker.begin_registration(42).await;

        let reply = tracker
            .advance(42, DialogInput::Text("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();
        assert!(matches!(reply, DialogReply::Prompt(_)));

        let reply = tracker.advance(42, DialogInput::Text("A123BC")).await.unwrap();
        assert_eq!(
            reply,
            DialogReply::Registration(MemberDraft {
                full_name: "Ivanov Ivan Ivanovich".to_string(),
                vehicle: Some("A123BC".to_string()),
            })
        );
        assert!(!tracker.is_active(42).await);
    }

    #[tokio::test]
    async fn test_registration_rejects_short_name() {
        let tracker = DialogTracker::new();
        tracker.begin_registration(42).await;

        let reply = tracker
            .advance(42, DialogInput::Text("Ivanov Ivan"))
            .await
            .unwrap();
        assert!(matches!(reply, DialogReply::Invalid(_)));
        // Dialog stays on the same step and accepts a corrected name.
        let reply = tracker
            .advance(42, DialogInput::Text("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();
        assert!(matches!(reply, DialogReply::Prompt(_)));
    }

    #[tokio::test]
    async fn test_vehicle_none_means_no_vehicle() {
        let tracker = DialogTracker::new();
        tracker.begin_registration(42).await;
        tracker
            .advance(42, DialogInput::Text("Ivanov Ivan Ivanovich"))
            .await
            .unwrap();

        let reply = tracker.advance(42, DialogInput::Text("none")).await.unwrap();
        let DialogReply::Registration(draft) = reply else {
            panic!("expected completed registration");
        };
        assert_eq!(draft.vehicle, None);
    }

    #[tokio::test]
    async fn test_no_dialog_returns_none() {
        let tracker = DialogTracker::new();
        assert!(tracker.advance(42, DialogInput::Text("hello")).await.is_none());
    }

    #[tokio::test]
    async fn test_bulletin_with_attachment() {
        let tracker = DialogTracker::new();
        tracker.begin_bulletin(7).await;

        tracker.advance(7, DialogInput::Text("Maintenance")).await.unwrap();
        tracker
            .advance(7, DialogInput::Text("Gate closed on Friday"))
            .await
            .unwrap();
        let reply = tracker
            .advance(
                7,
                DialogInput::Media {
                    kind: AttachmentKind::Photo,
                    file_ref: "file-123".to_string(),
                },
            )
            .await
            .unwrap();

        let DialogReply::Bulletin(draft) = reply else {
            panic!("expected completed bulletin");
        };
        assert_eq!(draft.title, "Maintenance");
        assert_eq!(draft.body, "Gate closed on Friday");
        assert_eq!(
            draft.attachment,
            Some(Attachment {
                kind: AttachmentKind::Photo,
                file_ref: "file-123".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_bulletin_skip_and_bad_attachment() {
        let tracker = DialogTracker::new();
        tracker.begin_bulletin(7).await;
        tracker.advance(7, DialogInput::Text("Title")).await.unwrap();
        tracker.advance(7, DialogInput::Text("Body")).await.unwrap();

        let reply = tracker
            .advance(7, DialogInput::Text("not an attachment"))
            .await
            .unwrap();
        assert!(matches!(reply, DialogReply::Invalid(_)));

        let reply = tracker.advance(7, DialogInput::Text("skip")).await.unwrap();
        let DialogReply::Bulletin(draft) = reply else {
            panic!("expected completed bulletin");
        };
        assert_eq!(draft.attachment, None);
    }

    #[tokio::test]
    async fn test_cancel_clears_state() {
        let tracker = DialogTracker::new();
        tracker.begin_registration(42).await;
        assert!(tracker.cancel(42).await);
        assert!(!tracker.cancel(42).await);
        assert!(tracker.advance(42, DialogInput::Text("x")).await.is_none());
    }
}
