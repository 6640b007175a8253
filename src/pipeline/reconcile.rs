//! Decides, per preset, whether the cached annotation can be reused or a new
//! one must be generated, and keeps the cache file in step with the results.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::generator::{AnnotationGenerator, Generated};
use crate::annotation::Annotation;
use crate::cache::{CacheEntry, CacheStore};
use crate::catalog::PresetRecord;
use crate::fingerprint::fingerprint;
use crate::limiter::RateLimiter;
use crate::preset::PresetDocument;
use crate::retry::with_retry;

/// Default number of tries per preset.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

#[derive(Debug, PartialEq)]
pub enum Freshness<'a> {
    /// Cached annotation can be reused as-is
    Cached(&'a CacheEntry),
    /// No entry, or the preset changed since it was generated
    Stale,
}

/// With `trust_cache` set any entry is reused without hashing the text.
/// Otherwise the entry must have been generated from identical text.
pub fn classify<'a>(
    cached: Option<&'a CacheEntry>,
    trust_cache: bool,
    text: &str,
) -> Freshness<'a> {
    match cached {
        Some(entry) if trust_cache || entry.fingerprint == fingerprint(text) => {
            Freshness::Cached(entry)
        }
        _ => Freshness::Stale,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub reused: usize,
    pub regenerated: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct Reconciler {
    store: CacheStore,
    generator: AnnotationGenerator,
    limiter: Arc<RateLimiter>,
    max_attempts: usize,
    trust_cache: bool,
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new(
        store: CacheStore,
        generator: AnnotationGenerator,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            store,
            generator,
            limiter,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            trust_cache: false,
            stats: ReconcileStats::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Reuse cache entries without comparing fingerprints (unattended runs).
    pub fn with_trusted_cache(mut self, trust: bool) -> Self {
        self.trust_cache = trust;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    /// Produce one record per document, in order. Only a failure to write
    /// the cache file is returned as an error.
    pub async fn reconcile(&mut self, documents: &[PresetDocument]) -> Result<Vec<PresetRecord>> {
        let mut records = Vec::with_capacity(documents.len());
        for doc in documents {
            let annotation = self.annotate(doc).await?;
            records.push(PresetRecord::new(doc, annotation));
        }
        Ok(records)
    }

    async fn annotate(&mut self, doc: &PresetDocument) -> Result<Option<Annotation>> {
        let cached = self.store.find(&doc.raw_path);
        if let Freshness::Cached(entry) = classify(cached, self.trust_cache, &doc.raw_text) {
            debug!("Reusing cached annotation for {}", doc.raw_path);
            self.stats.reused += 1;
            return Ok(Some(entry.annotation.clone()));
        }

        if !self.generator.is_enabled() {
            self.stats.skipped += 1;
            return Ok(None);
        }

        info!("Generating description for {} ({})", doc.name, doc.kind.as_str());
        let generator = &self.generator;
        let text = doc.raw_text.as_str();
        let outcome = with_retry(&self.limiter, self.max_attempts, &doc.raw_path, move || {
            generator.generate(text)
        })
        .await;

        match outcome {
            Some(Generated::Annotation(annotation)) => {
                self.store.upsert(CacheEntry {
                    annotation: annotation.clone(),
                    fingerprint: fingerprint(text),
                    identifier: doc.raw_path.clone(),
                });
                self.store.persist()?;
                self.stats.regenerated += 1;
                Ok(Some(annotation))
            }
            Some(Generated::Skipped) => {
                self.stats.skipped += 1;
                Ok(None)
            }
            None => {
                warn!("No description for {}, publishing without one", doc.raw_path);
                self.stats.failed += 1;
                Ok(None)
            }
        }
    }

    /// Optionally prune entries not in `live`, then persist the full working set.
    pub fn finish(mut self, live: Option<&HashSet<&str>>) -> Result<(CacheStore, usize)> {
        let pruned = match live {
            Some(live) => self.store.prune(live),
            None => 0,
        };
        if pruned > 0 {
            info!("Pruned {} cache entries for removed presets", pruned);
        }
        self.store.persist()?;
        info!(
            "Annotations: {} reused, {} generated, {} failed, {} skipped",
            self.stats.reused, self.stats.regenerated, self.stats.failed, self.stats.skipped
        );
        Ok((self.store, pruned))
    }
}
