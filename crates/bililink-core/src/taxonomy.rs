//! The two-level streaming-category taxonomy.
//!
//! A broadcaster picks a group (e.g. "Games") and then a leaf area
//! inside it. The list is fetched from the platform and cached for a
//! day; it is immutable once fetched and always replaced wholesale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Cached taxonomies older than this are treated as absent.
pub const TAXONOMY_FRESHNESS_MS: i64 = 24 * 60 * 60 * 1000;

/// A leaf category. Selecting an area is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    pub name: String,
}

/// A top-level category group with its ordered areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaGroup {
    pub id: String,
    pub name: String,
    pub areas: Vec<Area>,
}

/// The full ordered taxonomy as served by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Taxonomy {
    pub groups: Vec<AreaGroup>,
}

/// A restored or defaulted group/area pair for pre-populating selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub group_id: String,
    pub area_id: String,
}

impl Taxonomy {
    pub fn new(groups: Vec<AreaGroup>) -> Self {
        Self { groups }
    }

    /// A taxonomy with zero groups is a fetch failure, never cached.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Looks up a group by id.
    pub fn group(&self, id: &str) -> Option<&AreaGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Restores a remembered selection, falling back to the first entry.
    ///
    /// This is a pure lookup: a remembered id that is no longer present
    /// in the taxonomy is silently ignored. Returns `None` only when the
    /// taxonomy itself has no groups.
    pub fn restore_selection(
        &self,
        last_group_id: Option<&str>,
        last_area_id: Option<&str>,
    ) -> Option<Selection> {
        let group = last_group_id
            .and_then(|id| self.group(id))
            .or_else(|| self.groups.first())?;

        let area = last_area_id
            .and_then(|id| group.areas.iter().find(|a| a.id == id))
            .or_else(|| group.areas.first())?;

        Some(Selection {
            group_id: group.id.clone(),
            area_id: area.id.clone(),
        })
    }
}

/// A taxonomy paired with its fetch timestamp, persisted as one value
/// so a reader can never observe a new taxonomy with a stale timestamp
/// or vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTaxonomy {
    pub groups: Vec<AreaGroup>,
    /// Unix epoch milliseconds of the successful fetch.
    pub fetched_at_ms: i64,
}

impl CachedTaxonomy {
    pub fn new(taxonomy: Taxonomy, fetched_at_ms: i64) -> Self {
        Self {
            groups: taxonomy.groups,
            fetched_at_ms,
        }
    }

    /// True while the cache is younger than the 24-hour window.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.fetched_at_ms <= TAXONOMY_FRESHNESS_MS
    }

    pub fn into_taxonomy(self) -> Taxonomy {
        Taxonomy {
            groups: self.groups,
        }
    }
}

/// Remote lookup behind the category cache.
///
/// # Errors
///
/// Every failure mode (network error, malformed payload, embedded
/// failure code, empty list) is reported as
/// `LinkError::TaxonomyUnavailable` so the cache stays untouched and
/// the caller can offer a manual retry.
#[async_trait]
pub trait TaxonomyFetcher: Send + Sync {
    async fn fetch_taxonomy(&self) -> Result<Taxonomy>;
}
