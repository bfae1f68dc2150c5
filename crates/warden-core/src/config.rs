//! ============================================================================
//! Configuration - Environment-sourced runtime settings
//! ============================================================================

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{GateError, Result};
use crate::types::ChannelId;

/// Runtime configuration, parsed once at startup.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Database file path. None means the per-user default location.
    pub db_path: Option<PathBuf>,
    /// Channel ids allowed to run administrative operations.
    pub admin_ids: HashSet<ChannelId>,
    /// Channel that receives approval prompts.
    pub admin_chat: ChannelId,
}

impl GateConfig {
    /// Read configuration from the environment.
    ///
    /// `WARDEN_ADMIN_IDS` is a comma-separated list of channel ids;
    /// `WARDEN_ADMIN_CHAT` defaults to the first listed admin.
    pub fn from_env() -> Result<Self> {
        let raw_ids = std::env::var("WARDEN_ADMIN_IDS")
            .map_err(|_| GateError::Config("WARDEN_ADMIN_IDS is not set".into()))?;
        let config = Self::parse(
            std::env::var("WARDEN_DB_PATH").ok().map(PathBuf::from),
            &raw_ids,
            std::env::var("WARDEN_ADMIN_CHAT").ok().as_deref(),
        )?;

        debug!(
            "Loaded config: {} admin(s), prompt chat {}",
            config.admin_ids.len(),
            config.admin_chat
        );
        Ok(config)
    }

    fn parse(db_path: Option<PathBuf>, raw_ids: &str, raw_chat: Option<&str>) -> Result<Self> {
        let mut admin_ids = HashSet::new();
        let mut first = None;
        for part in raw_ids.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let id: ChannelId = part
                .parse()
                .map_err(|_| GateError::Config(format!("invalid admin id '{part}'")))?;
            first.get_or_insert(id);
            admin_ids.insert(id);
        }
        if admin_ids.is_empty() {
            return Err(GateError::Config("WARDEN_ADMIN_IDS is empty".into()));
        }

        let admin_chat = match raw_chat {
            Some(raw) => raw
                .parse()
                .map_err(|_| GateError::Config(format!("invalid admin chat '{raw}'")))?,
            None => first.unwrap_or_default(),
        };

        Ok(Self {
            db_path,
            admin_ids,
            admin_chat,
        })
    }

    /// Membership check against the parsed admin set.
    pub fn is_admin(&self, channel: ChannelId) -> bool {
        self.admin_ids.contains(&channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_list_parsing() {
        let config = GateConfig::parse(None, "100, 200,300", None).unwrap();
        assert!(config.is_admin(100));
        assert!(config.is_admin(300));
        assert!(!config.is_admin(400));
        assert_eq!(config.admin_chat, 100);
    }

    #[test]
    fn test_explicit_admin_chat() {
        let config = GateConfig::parse(None, "100", Some("-500")).unwrap();
        assert_eq!(config.admin_chat, -500);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            GateConfig::parse(None, "abc", None),
            Err(GateError::Config(_))
        ));
        assert!(matches!(
            GateConfig::parse(None, " , ", None),
            Err(GateError::Config(_))
        ));
        assert!(matches!(
            GateConfig::parse(None, "1", Some("x")),
            Err(GateError::Config(_))
        ));
    }
}
