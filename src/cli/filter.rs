use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use sv_evidence_filter::evidence_codec::DEFAULT_READ_GROUP;
use sv_evidence_filter::filter_settings::{
    DEFAULT_MAX_CONTEXT_EVIDENCE, DEFAULT_MIN_EVIDENCE_MAPQ, DEFAULT_THRESHOLD_PROBABILITY,
    EvidenceFilterSettings,
};
use sv_evidence_filter::partition_crossing::DEFAULT_PARTITION_GAP_SIZE;
use unwrap::unwrap;

use super::utils::{check_optional_filename, check_required_filename};

/// Settings shared by the filter and features commands
///
#[derive(Args, Clone, Default, Deserialize, Serialize)]
pub struct FilterCommandSettings {
    /// Directory for all command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Breakpoint evidence input, in tab-delimited evidence text format (optionally gzipped)
    #[arg(long = "evidence", value_name = "FILE")]
    pub evidence_filename: Utf8PathBuf,

    /// Read metadata input, in JSON format
    ///
    /// This provides the contig list, library template size distributions, coverage and evidence
    /// partition table used for feature extraction.
    ///
    #[arg(long = "read-metadata", value_name = "FILE")]
    pub read_metadata_filename: Utf8PathBuf,

    /// Classifier model in JSON or MessagePack format. The bundled model is used by default.
    #[arg(long = "model", value_name = "FILE")]
    pub model_filename: Option<Utf8PathBuf>,

    /// Evidence is kept if the classifier probability is greater than this value
    #[arg(long = "threshold", value_name = "PROB", default_value_t = DEFAULT_THRESHOLD_PROBABILITY)]
    pub threshold_probability: f64,

    /// Distal targets with mapping quality below this value are ignored
    #[arg(long, value_name = "MAPQ", default_value_t = DEFAULT_MIN_EVIDENCE_MAPQ)]
    pub min_evidence_mapq: i32,

    /// Read group assigned to all input evidence
    ///
    /// The evidence text format does not record read groups, so all evidence is treated as coming
    /// from this read group. It must be listed in the read metadata.
    ///
    #[arg(long, default_value = DEFAULT_READ_GROUP)]
    pub read_group: String,

    /// Maximum number of evidence records before and after each record used as feature context
    #[arg(hide = true, long, default_value_t = DEFAULT_MAX_CONTEXT_EVIDENCE)]
    pub max_context_evidence: usize,

    /// Evidence within this distance of an evidence partition edge is not combined with other
    /// evidence as feature context
    #[arg(hide = true, long, default_value_t = DEFAULT_PARTITION_GAP_SIZE)]
    pub partition_gap_size: i32,
}

impl FilterCommandSettings {
    pub fn evidence_filter_settings(&self) -> SimpleResult<EvidenceFilterSettings> {
        match EvidenceFilterSettings::new(
            self.min_evidence_mapq,
            self.threshold_probability,
            self.max_context_evidence,
        ) {
            Ok(x) => Ok(x),
            Err(e) => bail!("{e}"),
        }
    }
}

pub fn validate_and_fix_filter_settings(
    mut settings: FilterCommandSettings,
) -> SimpleResult<FilterCommandSettings> {
    check_required_filename(&settings.evidence_filename, "evidence")?;
    check_required_filename(&settings.read_metadata_filename, "read metadata")?;
    check_optional_filename(settings.model_filename.as_deref(), "classifier model")?;

    settings.evidence_filter_settings()?;

    if settings.partition_gap_size < 0 {
        bail!("--partition-gap-size argument must not be negative");
    }
    if settings.read_group.is_empty() {
        bail!("--read-group argument must not be empty");
    }

    // Canonicalize paths so that the settings written to the output directory are unambiguous
    settings.evidence_filename = canonicalize_path(&settings.evidence_filename)?;
    settings.read_metadata_filename = canonicalize_path(&settings.read_metadata_filename)?;
    if let Some(x) = settings.model_filename.as_deref() {
        settings.model_filename = Some(canonicalize_path(x)?);
    }

    Ok(settings)
}

fn canonicalize_path(path: &Utf8Path) -> SimpleResult<Utf8PathBuf> {
    match path.canonicalize_utf8() {
        Ok(x) => Ok(x),
        Err(e) => bail!("Can't resolve path '{path}': {e}"),
    }
}

/// Write command settings out in json format
pub fn write_filter_command_settings(filename: &Utf8Path, settings: &FilterCommandSettings) {
    let f = unwrap!(
        std::fs::File::create(filename),
        "Unable to create settings json file: '{}'",
        filename
    );
    serde_json::to_writer_pretty(&f, &settings).unwrap();
}
