// crates/cli/src/auth.rs
//! Who may sweep, and whether the bot can.

use std::fmt;

use guild_sweep_core::SweepConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server-wide permissions the bot account may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageChannels,
    ManageRoles,
    ManageEmojisAndStickers,
    ManageWebhooks,
    ManageGuild,
    ManageMessages,
}

/// Every stage in the standard pipeline needs one of these.
pub const REQUIRED_PERMISSIONS: [Permission; 6] = [
    Permission::ManageChannels,
    Permission::ManageRoles,
    Permission::ManageEmojisAndStickers,
    Permission::ManageWebhooks,
    Permission::ManageGuild,
    Permission::ManageMessages,
];

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageChannels => "manage_channels",
            Self::ManageRoles => "manage_roles",
            Self::ManageEmojisAndStickers => "manage_emojis_and_stickers",
            Self::ManageWebhooks => "manage_webhooks",
            Self::ManageGuild => "manage_guild",
            Self::ManageMessages => "manage_messages",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("User {0} is not allowed to run sweeps")]
    NotAllowed(u64),

    #[error("Bot is missing required permissions: {}", join(.0))]
    MissingPermissions(Vec<Permission>),
}

fn join(perms: &[Permission]) -> String {
    perms
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Allow-list check, applied to both start and stop.
pub fn authorize(config: &SweepConfig, user_id: u64) -> Result<(), AuthError> {
    if config.is_allowed(user_id) {
        Ok(())
    } else {
        tracing::warn!(user_id, "Unauthorized sweep request");
        Err(AuthError::NotAllowed(user_id))
    }
}

pub fn check_permissions(granted: &[Permission]) -> Result<(), AuthError> {
    let missing: Vec<Permission> = REQUIRED_PERMISSIONS
        .iter()
        .copied()
        .filter(|p| !granted.contains(p))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::MissingPermissions(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_uses_allow_list() {
        let config = SweepConfig {
            allowed_users: vec![10, 20],
            ..SweepConfig::default()
        };
        assert!(authorize(&config, 20).is_ok());
        assert_eq!(authorize(&config, 30), Err(AuthError::NotAllowed(30)));
    }

    #[test]
    fn test_empty_allow_list_rejects_everyone() {
        assert!(authorize(&SweepConfig::default(), 1).is_err());
    }

    #[test]
    fn test_missing_permissions_are_listed() {
        let err = check_permissions(&[Permission::ManageChannels, Permission::ManageRoles]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bot is missing required permissions: manage_emojis_and_stickers, manage_webhooks, manage_guild, manage_messages"
        );
        assert!(check_permissions(&REQUIRED_PERMISSIONS).is_ok());
    }

    #[test]
    fn test_permission_names_round_trip_through_serde() {
        let parsed: Vec<Permission> =
            serde_json::from_str(r#"["manage_guild", "manage_emojis_and_stickers"]"#).unwrap();
        assert_eq!(parsed, vec![Permission::ManageGuild, Permission::ManageEmojisAndStickers]);
    }
}
