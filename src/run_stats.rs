//! Track stats for the whole filtering run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::evidence_filter::FilterCounts;

#[derive(Default, Deserialize, Serialize)]
pub struct FilterRunStats {
    pub program_version: String,

    /// Either the classifier model filename or the bundled model label
    pub model_source: String,

    pub threshold_probability: f64,
    pub min_evidence_mapq: i32,
    pub partition_count: usize,

    pub total_evidence_count: usize,
    pub total_passed_count: usize,

    /// Evidence and passing evidence counts per evidence kind
    pub counts: FilterCounts,

    pub total_run_time_secs: f64,
}

/// Feature vectors and classifier probabilities for every evidence record
///
#[derive(Default, Deserialize, Serialize)]
pub struct EvidenceFeatureTable {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub proba: Vec<f64>,
    pub string_reps: Vec<String>,
}

fn write_json<T: Serialize>(filename: &Utf8Path, label: &str, value: &T) {
    info!("Writing {label} to file: '{filename}'");

    let f = unwrap!(
        File::create(filename),
        "Unable to create {} json file: '{}'",
        label,
        filename
    );

    serde_json::to_writer_pretty(&f, value).unwrap();
}

/// Write run_stats structure out in json format
pub fn write_filter_run_stats(filename: &Utf8Path, run_stats: &FilterRunStats) {
    write_json(filename, "run statistics", run_stats);
}

pub fn write_evidence_feature_table(filename: &Utf8Path, table: &EvidenceFeatureTable) {
    write_json(filename, "evidence feature table", table);
}
