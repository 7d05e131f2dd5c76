//! Error types for evidence decoding, classifier loading and filtering
//!

use std::path::PathBuf;

/// Violations of the evidence construction contract
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvidenceError {
    #[error("breakpoint evidence must have 0 or 1 distal targets, found {0}")]
    TooManyDistalTargets(usize),

    #[error("unexpected segment in SA tag: '{0}'")]
    MalformedSaTag(String),

    #[error("invalid CIGAR string: '{0}'")]
    InvalidCigar(String),
}

/// Failure to reconstruct evidence from its textual representation
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("expected at least {expected} tab-delimited fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("unknown BreakpointEvidence type: '{0}'")]
    UnknownEvidenceType(String),

    #[error("unknown template fragment ordinal: '/{0}'")]
    UnknownFragmentOrdinal(String),

    #[error("can't parse {label} from '{value}'")]
    Malformed { label: &'static str, value: String },

    #[error("{label} '{value}' is empty or inverted")]
    EmptyInterval { label: &'static str, value: String },

    #[error("evidence weight must be non-negative, found {0}")]
    NegativeWeight(i32),

    #[error("{0} evidence should have no distal targets")]
    UnexpectedDistalTarget(&'static str),

    #[error("no contig with index {0} in read metadata")]
    UnknownContigIndex(i32),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

impl DecodeError {
    pub fn malformed(label: &'static str, value: &str) -> Self {
        Self::Malformed {
            label,
            value: value.to_string(),
        }
    }
}

/// Classifier input layout does not match the feature extractor
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchemaMismatchError {
    #[error("classifier expects {expected} features, evidence feature schema has {found}")]
    FeatureCount { expected: usize, found: usize },

    #[error("classifier feature {index} is '{expected}', evidence feature schema has '{found}'")]
    FeatureName {
        index: usize,
        expected: String,
        found: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("can't read classifier model file '{path}': {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("can't parse classifier model from {origin}: {msg}")]
    Parse { origin: String, msg: String },

    #[error("invalid classifier model from {origin}: {msg}")]
    Invalid { origin: String, msg: String },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("evidence filter threshold probability must be in [0,1], found {0}")]
    ThresholdProbability(f64),

    #[error("minimum evidence MAPQ must be non-negative, found {0}")]
    MinEvidenceMapq(i32),

    #[error("context evidence count must be greater than 0")]
    ContextEvidenceCount,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MetadataError {
    #[error("template size distribution for library '{0}' is empty")]
    EmptyTemplateSizeDistribution(String),

    #[error("read group '{read_group}' refers to unknown library '{library}'")]
    UnknownLibrary { read_group: String, library: String },

    #[error("partition bounds table is not in genome order at partition {0}")]
    PartitionOrder(usize),

    #[error("coverage must be positive and finite, found {0}")]
    Coverage(f32),

    #[error("average read length must be positive, found {0}")]
    AvgReadLength(i32),

    #[error("can't parse read metadata: {0}")]
    Parse(String),
}

/// Errors occurring while scoring a single feature vector
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoreError {
    #[error("feature vector has {found} values, classifier expects {expected}")]
    FeatureCount { expected: usize, found: usize },
}

/// Fatal errors which abort an entire filtering run
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FilterError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("no library statistics found for read group '{0}'")]
    UnknownReadGroup(String),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

/// Failure to read an evidence text file
#[derive(Debug, thiserror::Error)]
pub enum EvidenceFileError {
    #[error("can't read evidence file '{path}': {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("evidence file '{path}' line {line_number}: {source}")]
    Decode {
        source: DecodeError,
        path: PathBuf,
        line_number: usize,
    },
}
