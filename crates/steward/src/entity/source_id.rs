//! Identifier of the adapter that produced a repository record.
//!
//! Stored as a lowercase string so the value is stable across backends and
//! readable in the database.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Upstream source kinds understood by the registry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Repositories hosted on github.com.
    #[sea_orm(string_value = "github")]
    GitHub,
    /// Projects hosted on a GitLab instance.
    #[sea_orm(string_value = "gitlab")]
    GitLab,
    /// A remote YAML descriptor file.
    #[sea_orm(string_value = "yml")]
    Yml,
}

impl SourceId {
    /// The identifier as it appears in configuration and storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::GitHub => "github",
            SourceId::GitLab => "gitlab",
            SourceId::Yml => "yml",
        }
    }

    /// Default registry order.
    #[must_use]
    pub fn all() -> [SourceId; 3] {
        [SourceId::GitHub, SourceId::GitLab, SourceId::Yml]
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(SourceId::GitHub),
            "gitlab" => Ok(SourceId::GitLab),
            "yml" | "yaml" | "yml_remote" => Ok(SourceId::Yml),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}
