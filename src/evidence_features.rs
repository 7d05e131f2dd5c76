//! Fixed-length numeric feature vector for breakpoint evidence classification
//!

use strum::{EnumCount, IntoEnumIterator};

/// Each dimension of the evidence feature vector, in classifier input order
///
/// The snake_case name of each feature must match the corresponding entry of the classifier's
/// feature name list.
///
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    strum::EnumCount,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EvidenceFeature {
    EvidenceType,
    MappingQuality,
    TemplateSize,
    BasesMatched,
    ReferenceLength,
    Weight,
    FragmentOrdinal,
    ForwardStrand,
    HasDistalTarget,
    DistalTargetForwardStrand,
    NumOverlap,
    OverlapMappingQuality,
    MeanOverlapMappingQuality,
    NumCoherent,
    CoherentMappingQuality,
}

impl EvidenceFeature {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Names of all features in vector order
pub fn feature_names() -> Vec<&'static str> {
    EvidenceFeature::iter().map(|x| x.name()).collect()
}

/// One evidence record's feature vector
///
/// Values are set by feature during extraction, then read as a slice for scoring.
///
#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceFeatures {
    values: Vec<f64>,
}

impl Default for EvidenceFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceFeatures {
    /// A zero-filled vector with one entry per feature
    pub fn new() -> Self {
        Self {
            values: vec![0.0; EvidenceFeature::COUNT],
        }
    }

    /// Wrap an existing vector in the classifier's input layout
    ///
    /// Returns None if the length does not match the feature count.
    ///
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        if values.len() == EvidenceFeature::COUNT {
            Some(Self { values })
        } else {
            None
        }
    }

    pub fn set(&mut self, feature: EvidenceFeature, value: f64) {
        self.values[feature as usize] = value;
    }

    pub fn get(&self, feature: EvidenceFeature) -> f64 {
        self.values[feature as usize]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
