use serde::{Deserialize, Serialize};

use crate::errors::MetadataError;

/// Empirical cumulative distribution of template sizes for one library
///
/// Bin `i` holds the fraction of observed templates with size <= i. All template sizes at or
/// beyond the last bin are lumped into the last bin.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TemplateSizeCdf {
    fractions: Vec<f32>,
    total_observations: u64,
}

impl TemplateSizeCdf {
    pub fn new(fractions: Vec<f32>, total_observations: u64) -> Self {
        Self {
            fractions,
            total_observations,
        }
    }

    /// Build the CDF from cumulative observation counts per template size bin
    ///
    /// The last count is the total observation count.
    ///
    pub fn from_cumulative_counts(cumulative_counts: &[u64]) -> Self {
        let total_observations = cumulative_counts.last().copied().unwrap_or(0);
        let fractions = cumulative_counts
            .iter()
            .map(|&x| {
                if total_observations == 0 {
                    0f32
                } else {
                    x as f32 / total_observations as f32
                }
            })
            .collect();
        Self {
            fractions,
            total_observations,
        }
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    pub fn total_observations(&self) -> u64 {
        self.total_observations
    }

    pub fn fraction(&self, bin: usize) -> f32 {
        self.fractions[bin]
    }

    /// Fraction of templates with size <= |template_size|, clamped to the last bin
    ///
    /// CDF must not be empty
    ///
    pub fn template_size_fraction(&self, template_size: i32) -> f32 {
        let bin = std::cmp::min(template_size.unsigned_abs() as usize, self.fractions.len() - 1);
        self.fractions[bin]
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LibraryStatistics {
    pub template_size_cdf: TemplateSizeCdf,
    pub total_bases: u64,
    pub total_reads: u64,
    pub total_fragment_pairs: u64,
    pub total_templates: u64,
}

impl LibraryStatistics {
    pub fn new(
        template_size_cdf: TemplateSizeCdf,
        total_bases: u64,
        total_reads: u64,
        total_fragment_pairs: u64,
        total_templates: u64,
    ) -> Self {
        Self {
            template_size_cdf,
            total_bases,
            total_reads,
            total_fragment_pairs,
            total_templates,
        }
    }

    pub fn validate(&self, library: &str) -> Result<(), MetadataError> {
        if self.template_size_cdf.is_empty() {
            return Err(MetadataError::EmptyTemplateSizeDistribution(
                library.to_string(),
            ));
        }
        Ok(())
    }
}
