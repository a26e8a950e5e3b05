// crates/core/src/category.rs
//! Resource categories swept from a target, in pipeline order.
//!
//! | Category | Unit counted |
//! |----------|--------------|
//! | purged_messages | one per deleted message |
//! | reset_permissions | one per channel whose overwrites were cleared |
//! | removed_auto_roles | one per role removed from a member |
//! | webhooks, invites, events, channels, roles, emojis, stickers, sounds | one per deleted item |
//! | guild_assets | one per icon/banner reset call |
//! | guild_settings | one per name/description/verification update |

use serde::{Deserialize, Serialize};

/// One class of resource deleted or reset by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PurgedMessages,
    ResetPermissions,
    RemovedAutoRoles,
    Webhooks,
    Invites,
    Events,
    Channels,
    Roles,
    Emojis,
    Stickers,
    Sounds,
    GuildAssets,
    GuildSettings,
}

impl Category {
    /// Every category in the order a full sweep runs them.
    ///
    /// Messages and overwrites go first so that channels still exist while
    /// they are purged; server-level edits go last.
    pub const ALL: [Category; 13] = [
        Category::PurgedMessages,
        Category::ResetPermissions,
        Category::RemovedAutoRoles,
        Category::Webhooks,
        Category::Invites,
        Category::Events,
        Category::Channels,
        Category::Roles,
        Category::Emojis,
        Category::Stickers,
        Category::Sounds,
        Category::GuildAssets,
        Category::GuildSettings,
    ];

    /// Stable key used for progress counters and persisted state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PurgedMessages => "purged_messages",
            Category::ResetPermissions => "reset_permissions",
            Category::RemovedAutoRoles => "removed_auto_roles",
            Category::Webhooks => "webhooks",
            Category::Invites => "invites",
            Category::Events => "events",
            Category::Channels => "channels",
            Category::Roles => "roles",
            Category::Emojis => "emojis",
            Category::Stickers => "stickers",
            Category::Sounds => "sounds",
            Category::GuildAssets => "guild_assets",
            Category::GuildSettings => "guild_settings",
        }
    }

    /// Parse from a counter key.
    pub fn parse_str(s: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Get display label for summaries.
    pub fn display_label(&self) -> &'static str {
        match self {
            Category::PurgedMessages => "Messages",
            Category::ResetPermissions => "Permission resets",
            Category::RemovedAutoRoles => "Auto roles removed",
            Category::Webhooks => "Webhooks",
            Category::Invites => "Invites",
            Category::Events => "Scheduled events",
            Category::Channels => "Channels",
            Category::Roles => "Roles",
            Category::Emojis => "Emojis",
            Category::Stickers => "Stickers",
            Category::Sounds => "Soundboard sounds",
            Category::GuildAssets => "Server asset resets",
            Category::GuildSettings => "Server setting updates",
        }
    }

    /// Status line shown while the category's stage is running.
    pub fn status_label(&self) -> &'static str {
        match self {
            Category::PurgedMessages => "Purging messages",
            Category::ResetPermissions => "Resetting channel permissions",
            Category::RemovedAutoRoles => "Removing auto roles",
            Category::Webhooks => "Deleting webhooks",
            Category::Invites => "Deleting invites",
            Category::Events => "Deleting scheduled events",
            Category::Channels => "Deleting channels",
            Category::Roles => "Deleting roles",
            Category::Emojis => "Deleting emojis",
            Category::Stickers => "Deleting stickers",
            Category::Sounds => "Deleting soundboard sounds",
            Category::GuildAssets => "Resetting server assets",
            Category::GuildSettings => "Updating server settings",
        }
    }

    /// Whether a single item may account for more than one counted unit.
    pub fn is_weighted(&self) -> bool {
        matches!(self, Category::PurgedMessages | Category::RemovedAutoRoles)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}
