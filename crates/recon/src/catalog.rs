//! Catalog handling — dedup-by-latest, freshness windowing, the lookup
//! query surface, and the process-wide snapshot cache.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::model::{CatalogSource, PriceCatalogEntry};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// All rows loaded from one catalog source, duplicates included. Dedup to
/// one live entry per part number happens per query or per cutoff window,
/// never destructively — windowing with an earlier cutoff must still see
/// superseded rows.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub source: CatalogSource,
    pub entries: Vec<PriceCatalogEntry>,
}

impl Catalog {
    pub fn new(source: CatalogSource, entries: Vec<PriceCatalogEntry>) -> Self {
        Self { source, entries }
    }

    /// One entry per part number: the one with the maximum `as_of`.
    /// Ties keep the first-seen entry, matching load order.
    pub fn latest_per_part(&self) -> PriceIndex {
        Self::index(self.source, self.entries.iter())
    }

    /// Restrict to entries with `as_of` date ≤ `cutoff`, then dedup to the
    /// most recent entry per part number within that window.
    pub fn windowed(&self, cutoff: NaiveDate) -> PriceIndex {
        Self::index(
            self.source,
            self.entries.iter().filter(|e| e.as_of.date() <= cutoff),
        )
    }

    fn index<'a>(
        source: CatalogSource,
        entries: impl Iterator<Item = &'a PriceCatalogEntry>,
    ) -> PriceIndex {
        let mut by_part: BTreeMap<String, PriceCatalogEntry> = BTreeMap::new();
        for entry in entries {
            match by_part.get(&entry.part_number) {
                Some(existing) if existing.as_of >= entry.as_of => {}
                _ => {
                    by_part.insert(entry.part_number.clone(), entry.clone());
                }
            }
        }
        PriceIndex { source, by_part }
    }
}

/// Deduplicated view of a catalog: exactly one row per part number.
#[derive(Debug, Clone)]
pub struct PriceIndex {
    pub source: CatalogSource,
    by_part: BTreeMap<String, PriceCatalogEntry>,
}

impl PriceIndex {
    pub fn get(&self, part_number: &str) -> Option<&PriceCatalogEntry> {
        self.by_part.get(part_number)
    }

    pub fn len(&self) -> usize {
        self.by_part.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_part.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PriceCatalogEntry> {
        self.by_part.values()
    }
}

// ---------------------------------------------------------------------------
// Snapshot + cache
// ---------------------------------------------------------------------------

/// Both catalogs as loaded in one complete-or-fail fetch.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub catalog_a: Catalog,
    pub catalog_b: Catalog,
    pub loaded_at: chrono::NaiveDateTime,
}

impl CatalogSnapshot {
    fn catalog(&self, source: CatalogSource) -> &Catalog {
        match source {
            CatalogSource::CatalogA => &self.catalog_a,
            CatalogSource::CatalogB => &self.catalog_b,
        }
    }

    /// Lookup query surface: the single most-recent-by-date row for a part
    /// number in the selected catalog, over the full deduplicated catalog
    /// (no cutoff — this serves ad-hoc queries, not pipeline pricing).
    pub fn lookup(&self, source: CatalogSource, part_number: &str) -> Option<PriceCatalogEntry> {
        self.catalog(source)
            .latest_per_part()
            .get(part_number.trim())
            .cloned()
    }
}

/// Process-wide catalog cache. A refresh replaces the snapshot atomically;
/// cached rows are never mutated in place, so a pipeline run holding an
/// `Arc` keeps a consistent view even across a concurrent refresh.
#[derive(Debug, Default)]
pub struct CatalogCache {
    inner: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<CatalogSnapshot>> {
        self.inner.read().expect("catalog cache poisoned").clone()
    }

    /// Install a freshly loaded snapshot, returning the shared handle.
    pub fn replace(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.inner.write().expect("catalog cache poisoned") = Some(snapshot.clone());
        snapshot
    }

    pub fn invalidate(&self) {
        *self.inner.write().expect("catalog cache poisoned") = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
