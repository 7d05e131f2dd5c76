//! Sequential and partitioned-parallel drivers for evidence feature extraction and filtering
//!
//! Each partition of the evidence stream is processed independently with its own crossing
//! checker, so results don't depend on the thread count.
//!

use std::sync::mpsc::channel;

use log::debug;

use crate::breakpoint_evidence::BreakpointEvidence;
use crate::classifier::{EvidenceScorer, check_feature_schema};
use crate::errors::{FilterError, ScoreError};
use crate::evidence_features::EvidenceFeatures;
use crate::evidence_filter::{ClassifyingFilter, EvidenceFeatureStream, FilterCounts};
use crate::filter_settings::EvidenceFilterSettings;
use crate::partition_crossing::PartitionCrossingChecker;
use crate::read_metadata::ReadMetadata;

/// Filtering results from one partition of the evidence stream
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitionFilterResult {
    pub partition_index: usize,
    pub passed: Vec<BreakpointEvidence>,
    pub counts: FilterCounts,
}

/// Split the evidence stream into one shard per read metadata partition
///
/// Each record goes to the partition containing its location start. Records between or beyond
/// all partitions go to the next partition in genome order, or to the last partition. Without
/// partitions all evidence goes into a single shard. Record order is preserved within each
/// shard.
///
pub fn split_evidence_by_partition(
    evidence: impl IntoIterator<Item = BreakpointEvidence>,
    read_metadata: &ReadMetadata,
) -> Vec<Vec<BreakpointEvidence>> {
    let partition_count = read_metadata.partition_count();
    let mut shards = vec![Vec::new(); std::cmp::max(partition_count, 1)];
    for x in evidence {
        let partition_index = match read_metadata.partition_index(x.location()) {
            Some(x) => x,
            None => {
                let loc = x.location();
                let pos = (loc.contig, loc.start);
                (0..partition_count)
                    .find(|&i| {
                        let bounds = read_metadata.partition_bounds(i);
                        pos < (bounds.last_contig, bounds.last_end)
                    })
                    .unwrap_or(shards.len() - 1)
            }
        };
        shards[partition_index].push(x);
    }
    shards
}

fn get_partition_crossing_checker(
    partition_index: usize,
    read_metadata: &ReadMetadata,
    gap_size: i32,
) -> PartitionCrossingChecker {
    PartitionCrossingChecker::new(partition_index, read_metadata, gap_size).unwrap_or_default()
}

/// Run a function over each shard on a worker pool, returning results in shard order
///
fn run_on_shards<T, F>(shards: Vec<Vec<BreakpointEvidence>>, thread_count: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, Vec<BreakpointEvidence>) -> T + Sync,
{
    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();
    let f = &f;
    worker_pool.scope(move |scope| {
        for (partition_index, shard) in shards.into_iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = f(partition_index, shard);
                debug!("Finished processing evidence partition {partition_index}");
                tx.send((partition_index, result)).unwrap();
            });
        }
    });

    let mut results = rx.into_iter().collect::<Vec<_>>();
    results.sort_by_key(|x| x.0);
    results.into_iter().map(|x| x.1).collect()
}

/// Filter the evidence of a single partition
///
pub fn filter_evidence_partition<S: EvidenceScorer + ?Sized>(
    partition_index: usize,
    shard: Vec<BreakpointEvidence>,
    read_metadata: &ReadMetadata,
    scorer: &S,
    settings: &EvidenceFilterSettings,
    gap_size: i32,
) -> Result<PartitionFilterResult, FilterError> {
    let crossing_checker = get_partition_crossing_checker(partition_index, read_metadata, gap_size);
    let mut filter = ClassifyingFilter::new(
        shard.into_iter(),
        read_metadata,
        scorer,
        settings,
        crossing_checker,
    )?;
    let mut passed = Vec::new();
    for x in filter.by_ref() {
        passed.push(x?);
    }
    Ok(PartitionFilterResult {
        partition_index,
        passed,
        counts: filter.counts().clone(),
    })
}

/// Filter each evidence shard in parallel
///
/// Results are returned in shard order, and are identical for any thread count.
///
pub fn filter_evidence_partitions<S: EvidenceScorer + ?Sized>(
    shards: Vec<Vec<BreakpointEvidence>>,
    read_metadata: &ReadMetadata,
    scorer: &S,
    settings: &EvidenceFilterSettings,
    gap_size: i32,
    thread_count: usize,
) -> Result<Vec<PartitionFilterResult>, FilterError> {
    check_feature_schema(scorer)?;
    run_on_shards(shards, thread_count, |partition_index, shard| {
        filter_evidence_partition(
            partition_index,
            shard,
            read_metadata,
            scorer,
            settings,
            gap_size,
        )
    })
    .into_iter()
    .collect()
}

/// Extract features for each evidence shard in parallel
///
/// Results are returned in shard order.
///
pub fn extract_features_by_partition(
    shards: Vec<Vec<BreakpointEvidence>>,
    read_metadata: &ReadMetadata,
    settings: &EvidenceFilterSettings,
    gap_size: i32,
    thread_count: usize,
) -> Result<Vec<Vec<(BreakpointEvidence, EvidenceFeatures)>>, FilterError> {
    run_on_shards(shards, thread_count, |partition_index, shard| {
        let crossing_checker =
            get_partition_crossing_checker(partition_index, read_metadata, gap_size);
        EvidenceFeatureStream::new(shard.into_iter(), read_metadata, settings, crossing_checker)
            .collect::<Result<Vec<_>, _>>()
    })
    .into_iter()
    .collect()
}

/// Score a batch of feature vectors, split into chunks scored in parallel
///
/// The output probability order matches the input order.
///
pub fn score_features_in_parallel<S: EvidenceScorer + ?Sized>(
    features: &[EvidenceFeatures],
    scorer: &S,
    thread_count: usize,
    chunk_size: usize,
) -> Result<Vec<f64>, ScoreError> {
    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();
    worker_pool.scope(move |scope| {
        for (chunk_index, chunk) in features.chunks(std::cmp::max(chunk_size, 1)).enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = chunk
                    .iter()
                    .map(|x| scorer.score(x.values()))
                    .collect::<Result<Vec<_>, _>>();
                tx.send((chunk_index, result)).unwrap();
            });
        }
    });

    let mut results = rx.into_iter().collect::<Vec<_>>();
    results.sort_by_key(|x| x.0);
    let mut probabilities = Vec::with_capacity(features.len());
    for (_, result) in results {
        probabilities.extend(result?);
    }
    Ok(probabilities)
}
