use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_MIN_EVIDENCE_MAPQ: i32 = 20;
pub const DEFAULT_THRESHOLD_PROBABILITY: f64 = 0.92;
pub const DEFAULT_MAX_CONTEXT_EVIDENCE: usize = 50;

/// Settings shared by every evidence filter in a run
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EvidenceFilterSettings {
    /// Distal targets with mapping quality below this value are not reported
    min_evidence_mapq: i32,

    /// Evidence is accepted if its classifier probability is strictly greater than this value
    threshold_probability: f64,

    /// Maximum number of records buffered on either side of the record being classified
    max_context_evidence: usize,
}

impl Default for EvidenceFilterSettings {
    fn default() -> Self {
        Self {
            min_evidence_mapq: DEFAULT_MIN_EVIDENCE_MAPQ,
            threshold_probability: DEFAULT_THRESHOLD_PROBABILITY,
            max_context_evidence: DEFAULT_MAX_CONTEXT_EVIDENCE,
        }
    }
}

impl EvidenceFilterSettings {
    pub fn new(
        min_evidence_mapq: i32,
        threshold_probability: f64,
        max_context_evidence: usize,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold_probability) {
            return Err(ConfigError::ThresholdProbability(threshold_probability));
        }
        if min_evidence_mapq < 0 {
            return Err(ConfigError::MinEvidenceMapq(min_evidence_mapq));
        }
        if max_context_evidence == 0 {
            return Err(ConfigError::ContextEvidenceCount);
        }
        Ok(Self {
            min_evidence_mapq,
            threshold_probability,
            max_context_evidence,
        })
    }

    pub fn min_evidence_mapq(&self) -> i32 {
        self.min_evidence_mapq
    }

    pub fn threshold_probability(&self) -> f64 {
        self.threshold_probability
    }

    pub fn max_context_evidence(&self) -> usize {
        self.max_context_evidence
    }
}
