//! Map each breakpoint evidence record and its local context to a classifier feature vector
//!

use crate::breakpoint_evidence::{BreakpointEvidence, TemplateFragmentOrdinal};
use crate::cigar_utils::CigarSummary;
use crate::errors::FilterError;
use crate::evidence_features::{EvidenceFeature, EvidenceFeatures};
use crate::partition_crossing::PartitionCrossingChecker;
use crate::read_metadata::ReadMetadata;
use crate::sv_interval::StrandedInterval;

fn fragment_ordinal_code(ordinal: TemplateFragmentOrdinal) -> f64 {
    use TemplateFragmentOrdinal::*;
    match ordinal {
        Unpaired => 0.,
        PairedInterior => 1.,
        PairedFirst => 2.,
        PairedSecond => 3.,
        PairedUnknown => 4.,
    }
}

fn bool_feature(x: bool) -> f64 {
    if x { 1. } else { 0. }
}

/// True if both target lists have a target with matching strand and overlapping location
fn is_coherent(targets1: &[StrandedInterval], targets2: &[StrandedInterval]) -> bool {
    targets1.iter().any(|t1| {
        targets2.iter().any(|t2| {
            t1.is_forward_strand == t2.is_forward_strand && t1.interval.overlaps(&t2.interval)
        })
    })
}

/// Summary of the overlapping evidence in a record's context window
#[derive(Default)]
struct OverlapSummary {
    num_overlap: usize,
    overlap_mapq_sum: f64,
    num_coherent: usize,
    coherent_mapq_sum: f64,
}

/// Extracts evidence features for classification
///
/// Extraction is a pure function of the evidence record, the read metadata and the supplied
/// context. The extractor holds no mutable state and can be shared across threads.
///
pub struct EvidenceFeatureExtractor<'a> {
    read_metadata: &'a ReadMetadata,
    min_evidence_mapq: i32,
}

impl<'a> EvidenceFeatureExtractor<'a> {
    pub fn new(read_metadata: &'a ReadMetadata, min_evidence_mapq: i32) -> Self {
        Self {
            read_metadata,
            min_evidence_mapq,
        }
    }

    pub fn read_metadata(&self) -> &ReadMetadata {
        self.read_metadata
    }

    pub fn min_evidence_mapq(&self) -> i32 {
        self.min_evidence_mapq
    }

    /// Compute the feature vector for one evidence record
    ///
    /// # Arguments
    /// * `context` - evidence records near `evidence` in the stream, excluding `evidence` itself,
    ///   in stream order
    /// * `crossing_checker` - context records which can't be combined with `evidence` per this
    ///   checker are ignored
    ///
    pub fn get_features(
        &self,
        evidence: &BreakpointEvidence,
        context: &[&BreakpointEvidence],
        crossing_checker: &PartitionCrossingChecker,
    ) -> Result<EvidenceFeatures, FilterError> {
        use EvidenceFeature::*;

        let mut features = EvidenceFeatures::new();
        let coverage = self.read_metadata.coverage() as f64;

        features.set(EvidenceType, evidence.kind() as usize as f64);
        features.set(Weight, evidence.weight() as f64);

        match (evidence, evidence.read_evidence()) {
            (BreakpointEvidence::TemplateSizeAnomaly(x), _) => {
                features.set(TemplateSize, x.read_count as f64 / coverage);
                features.set(ReferenceLength, x.location.len() as f64);
            }
            (_, Some(read)) => {
                let library_stats = self
                    .read_metadata
                    .library_statistics_for_read_group(&read.read_group)
                    .ok_or_else(|| FilterError::UnknownReadGroup(read.read_group.clone()))?;
                let cigar_summary = CigarSummary::from_cigar_str(&read.cigar)?;
                features.set(MappingQuality, read.mapping_quality as f64);
                features.set(
                    TemplateSize,
                    library_stats
                        .template_size_cdf
                        .template_size_fraction(read.template_size) as f64,
                );
                features.set(BasesMatched, cigar_summary.bases_matched as f64);
                features.set(ReferenceLength, cigar_summary.reference_length as f64);
                features.set(FragmentOrdinal, fragment_ordinal_code(read.fragment_ordinal));
                features.set(ForwardStrand, bool_feature(read.is_forward_strand));
            }
            (_, None) => {}
        }

        let distal_targets = evidence.distal_targets(self.read_metadata, self.min_evidence_mapq);
        if let Some(target) = distal_targets.first() {
            features.set(HasDistalTarget, 1.);
            features.set(
                DistalTargetForwardStrand,
                bool_feature(target.is_forward_strand),
            );
        }

        let overlap = self.get_overlap_summary(evidence, &distal_targets, context, crossing_checker);
        features.set(NumOverlap, overlap.num_overlap as f64 / coverage);
        features.set(OverlapMappingQuality, overlap.overlap_mapq_sum / coverage);
        if overlap.num_overlap > 0 {
            features.set(
                MeanOverlapMappingQuality,
                overlap.overlap_mapq_sum / overlap.num_overlap as f64,
            );
        }
        features.set(NumCoherent, overlap.num_coherent as f64 / coverage);
        features.set(CoherentMappingQuality, overlap.coherent_mapq_sum / coverage);

        Ok(features)
    }

    fn get_overlap_summary(
        &self,
        evidence: &BreakpointEvidence,
        distal_targets: &[StrandedInterval],
        context: &[&BreakpointEvidence],
        crossing_checker: &PartitionCrossingChecker,
    ) -> OverlapSummary {
        let location = evidence.location();
        let mut summary = OverlapSummary::default();
        for neighbor in context {
            let neighbor_location = neighbor.location();
            if !location.overlaps(neighbor_location)
                || crossing_checker.crosses(location, neighbor_location)
            {
                continue;
            }
            let mapq = neighbor.mapping_quality().unwrap_or(0) as f64;
            summary.num_overlap += 1;
            summary.overlap_mapq_sum += mapq;

            if !distal_targets.is_empty() {
                let neighbor_targets =
                    neighbor.distal_targets(self.read_metadata, self.min_evidence_mapq);
                if is_coherent(distal_targets, &neighbor_targets) {
                    summary.num_coherent += 1;
                    summary.coherent_mapq_sum += mapq;
                }
            }
        }
        summary
    }
}
