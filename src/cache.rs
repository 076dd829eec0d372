//! Filter-keyed cache of cluster indexes.
//!
//! Each distinct [`FilterSignature`] owns at most one [`CacheEntry`]: the
//! built [`ClusterIndex`] plus the exact point slice it was built from, so leaf
//! ids can be resolved back to the original records. The unfiltered ("all")
//! point set is kept resident once built; filtered subsets are then derived
//! in memory instead of going back to the loader.
//!
//! Builds for one signature are single-flight. Concurrent callers for the same
//! signature wait for the first build and share its `Arc`, while different
//! signatures build in parallel.

use crate::cluster::{ClusterIndex, ClusterIndexBuilder};
use crate::config::CacheConfig;
use crate::error::{ClusterError, Result};
use crate::filter::{FilterPredicate, FilterSignature};
use crate::loader::{PointLoader, load_points};
use dashmap::DashMap;
use geocluster_types::point::GeoPoint;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A built index together with the points it was built from.
pub struct CacheEntry {
    signature: FilterSignature,
    index: Arc<ClusterIndex>,
    records: Arc<[GeoPoint]>,
    built_at: Instant,
    last_access: Mutex<Instant>,
}

impl CacheEntry {
    fn new(signature: FilterSignature, index: Arc<ClusterIndex>, records: Arc<[GeoPoint]>) -> Self {
        let now = Instant::now();
        Self {
            signature,
            index,
            records,
            built_at: now,
            last_access: Mutex::new(now),
        }
    }

    pub fn signature(&self) -> &FilterSignature {
        &self.signature
    }

    pub fn index(&self) -> &Arc<ClusterIndex> {
        &self.index
    }

    /// Points in the order the index numbers its leaves.
    pub fn records(&self) -> &Arc<[GeoPoint]> {
        &self.records
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    pub fn last_access(&self) -> Instant {
        *self.last_access.lock()
    }

    fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("signature", &self.signature)
            .field("points", &self.records.len())
            .field("built_at", &self.built_at)
            .finish()
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached_indexes: usize,
    /// `None` until the first lookup.
    pub hit_ratio: Option<f64>,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits: {}, misses: {}, cached indexes: {}, hit ratio: ",
            self.cache_hits, self.cache_misses, self.cached_indexes
        )?;
        match self.hit_ratio {
            Some(ratio) => write!(f, "{:.2}", ratio),
            None => f.write_str("N/A"),
        }
    }
}

/// Process-wide map from filter signature to built cluster index.
///
/// Construct one with [`CacheBuilder`](crate::CacheBuilder) and share it by
/// `Arc`; every method takes `&self`.
pub struct IndexCache {
    loader: Arc<dyn PointLoader>,
    config: CacheConfig,
    entries: RwLock<FxHashMap<FilterSignature, Arc<CacheEntry>>>,
    /// Points of the "all" entry, used as the superset for filtered builds.
    universe: RwLock<Option<Arc<[GeoPoint]>>>,
    flights: DashMap<FilterSignature, Arc<Mutex<()>>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IndexCache {
    /// Create an empty cache. Fails when `config` does not validate.
    pub fn new(loader: Arc<dyn PointLoader>, config: CacheConfig) -> Result<Self> {
        config.validate().map_err(ClusterError::InvalidInput)?;
        Ok(Self {
            loader,
            config,
            entries: RwLock::new(FxHashMap::default()),
            universe: RwLock::new(None),
            flights: DashMap::new(),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the index for `predicate`, building it on a miss.
    ///
    /// With `force_refresh` the entry is rebuilt even if present, unless a
    /// concurrent caller finished a rebuild after this call started.
    pub fn get_or_build(
        &self,
        predicate: &FilterPredicate,
        force_refresh: bool,
    ) -> Result<(FilterSignature, Arc<ClusterIndex>)> {
        let entry = self.get_or_build_entry(predicate, force_refresh)?;
        Ok((entry.signature.clone(), Arc::clone(&entry.index)))
    }

    /// Like [`get_or_build`](Self::get_or_build) but returns the whole entry,
    /// so the index and its records are observed together.
    pub fn get_or_build_entry(
        &self,
        predicate: &FilterPredicate,
        force_refresh: bool,
    ) -> Result<Arc<CacheEntry>> {
        let signature = predicate.signature();

        if !force_refresh && let Some(entry) = self.lookup(&signature) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache hit for '{}'", signature);
            return Ok(entry);
        }

        let requested_at = Instant::now();
        let flight = Arc::clone(self.flights.entry(signature.clone()).or_default().value());

        let result = {
            let _guard = flight.lock();
            match self.lookup(&signature) {
                Some(entry) if !force_refresh || entry.built_at >= requested_at => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    log::debug!("Reusing index for '{}' built by a concurrent request", signature);
                    Ok(entry)
                }
                _ => self.build_entry(predicate, signature.clone()),
            }
        };

        drop(flight);
        self.flights
            .remove_if(&signature, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    /// Points retained for `signature`, or an empty slice when it is not cached.
    pub fn get_original_records(&self, signature: &FilterSignature) -> Arc<[GeoPoint]> {
        match self.entries.read().get(signature) {
            Some(entry) => Arc::clone(&entry.records),
            None => {
                log::warn!("No cached records for '{}'", signature);
                Arc::from(Vec::new())
            }
        }
    }

    /// The entry for `signature`, without touching the counters.
    pub fn entry(&self, signature: &FilterSignature) -> Option<Arc<CacheEntry>> {
        self.entries.read().get(signature).cloned()
    }

    /// Drop every entry and the resident superset.
    ///
    /// Builds already in flight still return their index to their caller but
    /// are not stored.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = entries.len();
        entries.clear();
        *self.universe.write() = None;
        log::info!("Cleared index cache ({} entries)", dropped);
    }

    pub fn stats(&self) -> CacheStats {
        let cache_hits = self.hits.load(Ordering::Relaxed);
        let cache_misses = self.misses.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;
        CacheStats {
            cache_hits,
            cache_misses,
            cached_indexes: self.len(),
            hit_ratio: (lookups > 0).then(|| cache_hits as f64 / lookups as f64),
        }
    }

    pub fn contains(&self, signature: &FilterSignature) -> bool {
        self.entries.read().contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Cached signatures in lexical order.
    pub fn signatures(&self) -> Vec<FilterSignature> {
        let mut signatures: Vec<_> = self.entries.read().keys().cloned().collect();
        signatures.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        signatures
    }

    fn lookup(&self, signature: &FilterSignature) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.read().get(signature).cloned()?;
        entry.touch();
        Some(entry)
    }

    fn build_entry(
        &self,
        predicate: &FilterPredicate,
        signature: FilterSignature,
    ) -> Result<Arc<CacheEntry>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::SeqCst);
        log::info!("Cache miss for '{}', building index", signature);

        let records: Arc<[GeoPoint]> = self.materialize(predicate, &signature)?.into();
        let index = ClusterIndexBuilder::new()
            .config(self.config.cluster.clone())
            .signature(signature.clone())
            .build(&records)?;

        let entry = Arc::new(CacheEntry::new(signature, Arc::new(index), records));
        self.store(Arc::clone(&entry), generation);
        Ok(entry)
    }

    /// Points matching `predicate`, from the resident superset when possible.
    fn materialize(
        &self,
        predicate: &FilterPredicate,
        signature: &FilterSignature,
    ) -> Result<Vec<GeoPoint>> {
        if !predicate.is_empty() {
            let universe = self.universe.read().clone();
            if let Some(universe) = universe {
                let started = Instant::now();
                let subset: Vec<GeoPoint> = universe
                    .par_iter()
                    .filter(|point| predicate.matches(point))
                    .cloned()
                    .collect();
                log::debug!(
                    "Filtered {} resident points to {} for '{}' in {:.2?}",
                    universe.len(),
                    subset.len(),
                    signature,
                    started.elapsed()
                );
                return Ok(subset);
            }
        }

        load_points(
            self.loader.as_ref(),
            predicate,
            signature,
            self.config.load_page_size,
            self.config.max_records,
        )
    }

    fn store(&self, entry: Arc<CacheEntry>, generation: u64) {
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!(
                "Cache cleared while building '{}'; discarding result",
                entry.signature
            );
            return;
        }

        if entry.signature.is_all() {
            *self.universe.write() = Some(Arc::clone(&entry.records));
        }
        let signature = entry.signature.clone();
        entries.insert(signature.clone(), entry);

        if let Some(max_entries) = self.config.max_entries {
            self.evict(&mut entries, max_entries, &signature);
        }
    }

    /// Drop least recently used entries until at most `max_entries` remain.
    fn evict(
        &self,
        entries: &mut FxHashMap<FilterSignature, Arc<CacheEntry>>,
        max_entries: usize,
        keep: &FilterSignature,
    ) {
        while entries.len() > max_entries {
            let victim = entries
                .values()
                .filter(|entry| &entry.signature != keep)
                .min_by_key(|entry| entry.last_access())
                .map(|entry| entry.signature.clone());
            let Some(victim) = victim else {
                break;
            };
            entries.remove(&victim);
            if victim.is_all() {
                *self.universe.write() = None;
            }
            log::debug!("Evicted cluster index '{}'", victim);
        }
    }
}

impl fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexCache")
            .field("config", &self.config)
            .field("signatures", &self.signatures())
            .field("stats", &self.stats())
            .finish()
    }
}
