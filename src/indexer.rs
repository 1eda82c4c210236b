use anyhow::Result;
use chrono::Local;
use log::info;

use crate::{
    config::{Config, Options},
    index::IndexStore,
    pipeline::Counters,
    registry::Registry,
    report::write_summary,
    runtime::Runtime,
};

/// Builds or refreshes the index described by `options`.
///
/// Fails only for run-level problems (unreadable registry or index, failed
/// save) or when the configured strictness is violated. Per-package failures
/// are reported and counted.
#[tracing::instrument(skip(runtime, options))]
pub async fn build_index<R: Runtime>(runtime: R, options: Options) -> Result<Counters> {
    let config = Config::new(runtime, options)?;
    run(&config).await
}

pub async fn run<R: Runtime>(config: &Config<R>) -> Result<Counters> {
    let registry = Registry::load(&config.runtime, &config.registry_path)?;
    info!(
        "Loaded {} packages from {:?}",
        registry.package_count(),
        config.registry_path
    );

    let store = IndexStore::new(&config.runtime, &config.index_path);
    let mut index = store.load()?;

    config.github.probe_rate_limit().await;

    let counters = config.pipeline.run(&registry, &mut index).await;

    index.stamp(&Local::now());
    store.save(&index)?;

    write_summary(
        &mut std::io::stdout().lock(),
        &counters,
        index.indexed_count(),
        &config.pipeline.fetcher().budgets(),
    )?;

    counters.check(&config.strictness)?;
    Ok(counters)
}
