// crates/cli/src/fixture.rs
//! Simulated target loaded from JSON.
//!
//! A fixture lists the bot's permissions and, per category, the items a
//! real client would fetch. Each item may be slow, may fail, and (for
//! weighted categories) may affect more than one unit:
//!
//! ```json
//! {
//!   "name": "Test Server",
//!   "permissions": ["manage_channels", "manage_roles"],
//!   "categories": {
//!     "channels": { "items": [{ "name": "general", "latency_ms": 20 }] },
//!     "purged_messages": { "items": [{ "name": "general", "weight": 40 }] },
//!     "roles": { "fetch_error": "permission" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use guild_sweep_core::{Category, GuildSettings, ItemError};
use guild_sweep_jobs::{CategoryOperation, Pipeline, Stage};
use serde::{Deserialize, Serialize};

use crate::auth::Permission;

/// How a simulated call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    Permission,
    Transient,
    Missing,
}

impl Failure {
    fn into_error(self, category: &str) -> ItemError {
        match self {
            Self::Permission => ItemError::permission(category),
            Self::Transient => ItemError::transient("503 Service Unavailable"),
            Self::Missing => ItemError::NotFound,
        }
    }
}

fn one() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fail: Option<Failure>,
    /// Units affected by a successful call. Only read for weighted categories.
    #[serde(default = "one")]
    pub weight: u64,
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for FixtureItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            fail: None,
            weight: 1,
            latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCategory {
    #[serde(default)]
    pub fetch_error: Option<Failure>,
    #[serde(default)]
    pub items: Vec<FixtureItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Keyed by category key; absent categories have no items.
    #[serde(default)]
    pub categories: BTreeMap<String, FixtureCategory>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing fixture {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(raw)?;
        if let Some(key) = fixture
            .categories
            .keys()
            .find(|key| Category::parse_str(key).is_none())
        {
            bail!("unknown category {key:?}");
        }
        Ok(fixture)
    }

    pub fn category(&self, category: Category) -> FixtureCategory {
        self.categories
            .get(category.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Build the full thirteen-stage pipeline in catalogue order.
    pub fn pipeline(&self, settings: &GuildSettings) -> Pipeline {
        Category::ALL
            .into_iter()
            .map(|category| match category {
                Category::GuildAssets => self.single_stage(category, None),
                Category::GuildSettings => self.single_stage(category, Some(settings.clone())),
                _ => self.item_stage(category),
            })
            .collect()
    }

    fn item_stage(&self, category: Category) -> Box<dyn Stage> {
        let FixtureCategory { fetch_error, items } = self.category(category);
        let key = category.as_str();
        CategoryOperation::for_category(
            category,
            move || async move {
                match fetch_error {
                    Some(failure) => Err(failure.into_error(key)),
                    None => Ok(items),
                }
            },
            move |item: FixtureItem| async move {
                let units = if category.is_weighted() { item.weight } else { 1 };
                simulate(&item, key).await.map(|()| units)
            },
        )
        .boxed()
    }

    /// Server-level edits are one call; the first fixture item, if any,
    /// describes how that call behaves.
    fn single_stage(&self, category: Category, settings: Option<GuildSettings>) -> Box<dyn Stage> {
        let call = self.category(category).items.into_iter().next().unwrap_or_default();
        let key = category.as_str();
        CategoryOperation::<()>::single(key, category.status_label(), move || {
            let call = call.clone();
            let settings = settings.clone();
            async move {
                simulate(&call, key).await?;
                if let Some(settings) = settings {
                    tracing::info!(
                        name = %settings.name,
                        verification_level = ?settings.verification_level,
                        "Applied server settings"
                    );
                }
                Ok::<(), ItemError>(())
            }
        })
        .boxed()
    }
}

async fn simulate(item: &FixtureItem, category: &str) -> Result<(), ItemError> {
    if item.latency_ms > 0 {
        tokio::time::sleep(Duration::from_millis(item.latency_ms)).await;
    }
    match item.fail {
        Some(failure) => Err(failure.into_error(category)),
        None => Ok(()),
    }
}
