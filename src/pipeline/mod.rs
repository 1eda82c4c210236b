//! Pipeline driver: walks the registry and folds every entry into the index.
//!
//! Each (name, version) entry runs inside its own failure boundary:
//! [`Pipeline::process_entry`] returns a typed outcome, and [`Pipeline::run`]
//! turns errors into counters and moves on. Nothing a single entry does can
//! abort the run.

mod counters;

use log::{debug, info};

use crate::error::{EntryError, error_chain};
use crate::fetch::ManifestFetcher;
use crate::index::{IndexedPackage, PackageIndex};
use crate::manifest::validate_manifest;
use crate::registry::{RawEntry, Registry, validate_entry};

pub use counters::{Counters, EntryOutcome, Failure, Strictness};

pub struct Pipeline {
    fetcher: ManifestFetcher,
}

impl Pipeline {
    pub fn new(fetcher: ManifestFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &ManifestFetcher {
        &self.fetcher
    }

    /// Processes every registry entry in stored order, mutating `index` in place.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, registry: &Registry, index: &mut PackageIndex) -> Counters {
        let mut counters = Counters::default();
        let mut current_package = None;

        for raw in registry.entries() {
            if current_package != Some(raw.name) {
                info!("Package: {}", raw.name);
                current_package = Some(raw.name);
            }
            info!("    Version: {}", raw.version);

            let indexed_before = index.contains(raw.name, raw.version);
            let result = match self.process_entry(&raw, index).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    report_failure(&raw, &e);
                    Err(if indexed_before {
                        Failure::Broken
                    } else {
                        Failure::Failed
                    })
                }
            };
            counters.record(result);
        }

        counters
    }

    /// Validates, fetches, and merges one entry.
    ///
    /// The index is only touched after the manifest passed validation, so a
    /// failure leaves any previous record for the key in place.
    pub async fn process_entry(
        &self,
        raw: &RawEntry<'_>,
        index: &mut PackageIndex,
    ) -> Result<EntryOutcome, EntryError> {
        let entry = validate_entry(raw.name, raw.version, raw.value)?;
        let reference = entry.reference.as_ref();

        if index.should_skip(&entry.name, &entry.version, reference) {
            info!("        Package version already indexed and up-to-date, skipping.");
            return Ok(EntryOutcome::Skipped);
        }

        let raw_manifest = self.fetcher.fetch(&entry.location, reference).await?;
        let manifest = validate_manifest(&raw_manifest)?;

        let version = entry.version.as_str();
        let outcome = if index.contains(&entry.name, version) {
            EntryOutcome::Updated
        } else {
            EntryOutcome::Added
        };
        debug!("{} -> {:?}", raw.id(), outcome);

        index.merge(
            &entry.name,
            version,
            IndexedPackage::new(manifest.record, &entry.location, reference),
        );
        Ok(outcome)
    }
}

fn report_failure(raw: &RawEntry<'_>, error: &EntryError) {
    println!(
        "        (!) Error processing package '{}', skipping.",
        raw.id()
    );
    println!("{}", error_chain(error));
    println!();
    debug!("{:?}", error);
}
