//! Top-level runners for the filter and features commands
//!

use std::error;
use std::time::Instant;

use log::info;
use sv_evidence_filter::breakpoint_evidence::BreakpointEvidence;
use sv_evidence_filter::classifier::{
    BUNDLED_MODEL_LABEL, EvidenceScorer, GradientBoostedClassifier, check_feature_schema,
    load_classifier,
};
use sv_evidence_filter::errors::FilterError;
use sv_evidence_filter::evidence_codec::EvidenceDecoder;
use sv_evidence_filter::evidence_filter::FilterCounts;
use sv_evidence_filter::evidence_io::{read_evidence_file, write_evidence_file};
use sv_evidence_filter::filter_settings::EvidenceFilterSettings;
use sv_evidence_filter::globals::PROGRAM_VERSION;
use sv_evidence_filter::partitioned_filter::{
    extract_features_by_partition, filter_evidence_partitions, score_features_in_parallel,
    split_evidence_by_partition,
};
use sv_evidence_filter::read_metadata::{ReadMetadata, read_metadata_file};
use sv_evidence_filter::run_stats::{
    EvidenceFeatureTable, FilterRunStats, write_evidence_feature_table, write_filter_run_stats,
};
use thousands::Separable;

use crate::cli::{FilterCommandSettings, write_filter_command_settings};

pub const SETTINGS_FILENAME: &str = "filter.settings.json";
pub const PASSED_EVIDENCE_FILENAME: &str = "passed.evidence.txt";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";
pub const FEATURES_FILENAME: &str = "evidence.features.json";

/// Number of feature vectors scored together by one worker thread
const SCORING_CHUNK_SIZE: usize = 1000;

/// Run inputs shared by the filter and features commands
///
struct RunInputs {
    read_metadata: ReadMetadata,
    scorer: GradientBoostedClassifier,
    filter_settings: EvidenceFilterSettings,
    evidence_shards: Vec<Vec<BreakpointEvidence>>,
}

fn read_run_inputs(settings: &FilterCommandSettings) -> Result<RunInputs, Box<dyn error::Error>> {
    write_filter_command_settings(&settings.output_dir.join(SETTINGS_FILENAME), settings);

    let filter_settings = settings.evidence_filter_settings()?;
    let scorer = load_classifier(settings.model_filename.as_deref())?;
    let read_metadata = read_metadata_file(&settings.read_metadata_filename)?;
    if read_metadata
        .library_statistics_for_read_group(&settings.read_group)
        .is_none()
    {
        return Err(FilterError::UnknownReadGroup(settings.read_group.clone()).into());
    }

    let decoder = EvidenceDecoder::new(&read_metadata, &settings.read_group);
    let evidence = read_evidence_file(&settings.evidence_filename, &decoder)?;
    let evidence_shards = split_evidence_by_partition(evidence, &read_metadata);

    Ok(RunInputs {
        read_metadata,
        scorer,
        filter_settings,
        evidence_shards,
    })
}

fn get_model_source(settings: &FilterCommandSettings) -> String {
    match &settings.model_filename {
        Some(x) => x.to_string(),
        None => BUNDLED_MODEL_LABEL.to_string(),
    }
}

/// Filter all input evidence and write the passing evidence to the output directory
///
pub fn run_filter(
    settings: &FilterCommandSettings,
    thread_count: usize,
) -> Result<(), Box<dyn error::Error>> {
    let start = Instant::now();
    let inputs = read_run_inputs(settings)?;
    let partition_count = inputs.evidence_shards.len();

    info!("Filtering breakpoint evidence in {partition_count} partitions");
    let results = filter_evidence_partitions(
        inputs.evidence_shards,
        &inputs.read_metadata,
        &inputs.scorer,
        &inputs.filter_settings,
        settings.partition_gap_size,
        thread_count,
    )?;

    let mut counts = FilterCounts::default();
    for result in results.iter() {
        counts.merge(&result.counts);
    }
    info!(
        "{} of {} breakpoint evidence records passed the classifier threshold",
        counts.total_passed().separate_with_commas(),
        counts.total_evidence().separate_with_commas()
    );

    write_evidence_file(
        &settings.output_dir.join(PASSED_EVIDENCE_FILENAME),
        results.iter().flat_map(|x| x.passed.iter()),
        &inputs.read_metadata,
        inputs.filter_settings.min_evidence_mapq(),
    );

    let run_stats = FilterRunStats {
        program_version: PROGRAM_VERSION.to_string(),
        model_source: get_model_source(settings),
        threshold_probability: inputs.filter_settings.threshold_probability(),
        min_evidence_mapq: inputs.filter_settings.min_evidence_mapq(),
        partition_count,
        total_evidence_count: counts.total_evidence(),
        total_passed_count: counts.total_passed(),
        counts,
        total_run_time_secs: start.elapsed().as_secs_f64(),
    };
    write_filter_run_stats(&settings.output_dir.join(RUN_STATS_FILENAME), &run_stats);
    Ok(())
}

/// Write feature vectors and classifier probabilities for all input evidence
///
pub fn run_features(
    settings: &FilterCommandSettings,
    thread_count: usize,
) -> Result<(), Box<dyn error::Error>> {
    let inputs = read_run_inputs(settings)?;
    check_feature_schema(&inputs.scorer)?;
    let min_evidence_mapq = inputs.filter_settings.min_evidence_mapq();

    info!(
        "Extracting breakpoint evidence features in {} partitions",
        inputs.evidence_shards.len()
    );
    let evidence_features = extract_features_by_partition(
        inputs.evidence_shards,
        &inputs.read_metadata,
        &inputs.filter_settings,
        settings.partition_gap_size,
        thread_count,
    )?
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    let (evidence, features): (Vec<_>, Vec<_>) = evidence_features.into_iter().unzip();
    let proba = score_features_in_parallel(
        &features,
        &inputs.scorer,
        thread_count,
        SCORING_CHUNK_SIZE,
    )?;
    info!(
        "Scored {} breakpoint evidence records",
        proba.len().separate_with_commas()
    );

    let table = EvidenceFeatureTable {
        feature_names: inputs.scorer.feature_names().to_vec(),
        features: features.into_iter().map(|x| x.into_values()).collect(),
        proba,
        string_reps: evidence
            .iter()
            .map(|x| x.string_rep(&inputs.read_metadata, min_evidence_mapq))
            .collect(),
    };
    write_evidence_feature_table(&settings.output_dir.join(FEATURES_FILENAME), &table);
    Ok(())
}
