//! Import pipeline: extract, normalize, batch, upsert.
//!
//! Batches run strictly one after another, each in its own transaction.
//! The first failing batch stops the run; nothing is retried. Re-running the
//! whole import is safe because every graph write is a merge.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, error, info};

use filmgraph_common::{CanonicalFilmRecord, FieldMap};
use filmgraph_graph::{
    ensure_identity_constraints, link_project_members, upsert_batch, FilmGraphStore, StoreError,
    WriteCounters,
};

use crate::batch::BatchAccumulator;
use crate::normalize::{Normalized, Normalizer};
use crate::progress::{Progress, ProgressSink};
use crate::source::{DocumentSource, SourceError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("batch {index} failed after {processed} records were imported: {source}")]
    Batch {
        index: usize,
        processed: u64,
        skipped: u64,
        source: StoreError,
    },

    #[error("reading the source failed after {processed} records were imported: {source}")]
    Source {
        processed: u64,
        skipped: u64,
        source: SourceError,
    },
}

/// Final tally of a successful import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub processed: u64,
    pub skipped: u64,
    pub batches: usize,
    /// Skip reason code → count.
    pub skip_reasons: BTreeMap<&'static str, u64>,
    pub counters: WriteCounters,
    /// Constraints that could not be established (non-fatal).
    pub constraint_failures: usize,
}

impl ImportSummary {
    /// Totals so far; `batch_index` is the batch currently being filled.
    fn progress(&self, total_estimate: Option<u64>) -> Progress {
        Progress {
            batch_index: self.batches,
            processed: self.processed,
            skipped: self.skipped,
            total_estimate,
        }
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} skipped={} batches={} ({})",
            self.processed, self.skipped, self.batches, self.counters
        )?;
        for (reason, count) in &self.skip_reasons {
            write!(f, " {reason}={count}")?;
        }
        Ok(())
    }
}

/// Orchestrates one import run against a graph store.
pub struct ImportPipeline<'a> {
    store: &'a dyn FilmGraphStore,
    normalizer: Normalizer,
    batch_size: usize,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(store: &'a dyn FilmGraphStore, fields: FieldMap, batch_size: usize) -> Self {
        Self {
            store,
            normalizer: Normalizer::new(fields),
            batch_size: batch_size.max(1),
        }
    }

    /// Run the import to completion or to the first failing batch.
    pub async fn run(
        &self,
        source: &mut dyn DocumentSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportSummary, ImportError> {
        info!(batch_size = self.batch_size, "Import starting");

        let constraints = ensure_identity_constraints(self.store).await;
        let mut summary = ImportSummary {
            constraint_failures: constraints.failed.len(),
            ..Default::default()
        };
        let total_estimate = source.estimated_total();
        let mut acc = BatchAccumulator::new(self.batch_size);

        loop {
            let raw = match source.next_record().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) => {
                    error!(
                        processed = summary.processed,
                        pending = acc.pending(),
                        error = %e,
                        "Source read failed, stopping import"
                    );
                    let err = ImportError::Source {
                        processed: summary.processed,
                        skipped: summary.skipped,
                        source: e,
                    };
                    progress.failed(&summary.progress(total_estimate), &err);
                    return Err(err);
                }
            };

            match self.normalizer.normalize(&raw) {
                Normalized::Record(record) => {
                    if let Some(batch) = acc.push(record) {
                        self.commit(batch, &mut summary, total_estimate, progress)
                            .await?;
                    }
                }
                Normalized::Skip(reason) => {
                    debug!(%reason, "Skipped record");
                    summary.skipped += 1;
                    *summary.skip_reasons.entry(reason.as_str()).or_default() += 1;
                }
            }
        }

        if let Some(batch) = acc.finish() {
            self.commit(batch, &mut summary, total_estimate, progress)
                .await?;
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            batches = summary.batches,
            nodes_created = summary.counters.nodes_created,
            relationships_created = summary.counters.relationships_created,
            "Import complete"
        );
        progress.finished(&summary);
        Ok(summary)
    }

    async fn commit(
        &self,
        batch: Vec<CanonicalFilmRecord>,
        summary: &mut ImportSummary,
        total_estimate: Option<u64>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ImportError> {
        let index = summary.batches;

        match upsert_batch(self.store, &batch).await {
            Ok(counters) => {
                summary.batches += 1;
                summary.processed += batch.len() as u64;
                summary.counters += counters;
                debug!(index, size = batch.len(), %counters, "Batch committed");
                progress.batch_committed(&Progress {
                    batch_index: index,
                    ..summary.progress(total_estimate)
                });
                Ok(())
            }
            Err(e) => {
                error!(
                    index,
                    size = batch.len(),
                    processed = summary.processed,
                    error = %e,
                    "Batch failed, stopping import"
                );
                let err = ImportError::Batch {
                    index,
                    processed: summary.processed,
                    skipped: summary.skipped,
                    source: e,
                };
                progress.failed(&summary.progress(total_estimate), &err);
                Err(err)
            }
        }
    }
}

/// Run the project-membership linker and log the store's counters.
pub async fn run_linker(
    store: &dyn FilmGraphStore,
    members: &[String],
    film_title: &str,
) -> Result<WriteCounters, StoreError> {
    let counters = link_project_members(store, members, film_title).await?;
    if counters.relationships_created == 0 {
        info!(film_title, members = members.len(), %counters, "Linker matched no new film edges");
    } else {
        info!(film_title, members = members.len(), %counters, "Project members linked");
    }
    Ok(counters)
}
