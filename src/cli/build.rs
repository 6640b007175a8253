use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cache::source::default_sources;
use crate::cache::CacheStore;
use crate::catalog::{write_catalog, PresetRecord};
use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::llm::factory;
use crate::pipeline::generator::AnnotationGenerator;
use crate::pipeline::reconcile::{ReconcileStats, Reconciler};
use crate::preset;

/// What a build produced, for callers and tests.
#[derive(Debug)]
pub struct BuildSummary {
    pub records: Vec<PresetRecord>,
    pub stats: ReconcileStats,
    pub cache_entries: usize,
    pub pruned: usize,
}

pub async fn run(path: String, config_path: Option<String>) -> Result<()> {
    let root = Path::new(&path);
    info!("Preset root: {}", root.display());
    if let Some(ref cfg) = config_path {
        info!("Config: {}", cfg);
    }

    let config = Config::load_with_path(root, config_path)?;
    let generator = AnnotationGenerator::from_client(factory::create_client(&config.llm)?);
    let limiter = Arc::new(RateLimiter::per_minute(
        config.generation.requests_per_minute,
    ));
    if generator.is_enabled() {
        info!(
            "Spacing model requests {}ms apart, up to {} attempts each",
            limiter.interval().as_millis(),
            config.generation.max_attempts
        );
    }

    build(root, &config, generator, limiter).await?;
    Ok(())
}

/// Load presets and cache, reconcile every preset, then write the catalog
/// and the cache file.
pub async fn build(
    root: &Path,
    config: &Config,
    generator: AnnotationGenerator,
    limiter: Arc<RateLimiter>,
) -> Result<BuildSummary> {
    let automated = config.generation.is_automated();
    if automated {
        info!("Unattended run: trusting cached annotations without fingerprint checks");
    }

    let groups = preset::load_all(root, &config.catalog).await?;

    let sources = default_sources(root, &config.cache, config.llm.timeout_secs)?;
    let store = CacheStore::bootstrap(root.join(&config.cache.path), &sources).await;

    let mut reconciler = Reconciler::new(store, generator, limiter)
        .with_max_attempts(config.generation.max_attempts)
        .with_trusted_cache(automated);

    let mut records = Vec::new();
    for group in &groups {
        records.extend(reconciler.reconcile(group).await?);
    }

    write_catalog(&root.join(&config.catalog.output), &records)?;

    let stats = reconciler.stats().clone();
    let live: HashSet<&str> = records.iter().map(|r| r.raw_path.as_str()).collect();
    let (store, pruned) = reconciler.finish(config.cache.prune_stale.then_some(&live))?;

    Ok(BuildSummary {
        cache_entries: store.len(),
        records,
        stats,
        pruned,
    })
}
