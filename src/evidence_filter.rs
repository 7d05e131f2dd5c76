//! Lazy classifier-based filtering of a breakpoint evidence stream
//!

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::breakpoint_evidence::{BreakpointEvidence, EvidenceKind};
use crate::classifier::{EvidenceScorer, check_feature_schema};
use crate::errors::{FilterError, SchemaMismatchError};
use crate::evidence_features::EvidenceFeatures;
use crate::feature_extractor::EvidenceFeatureExtractor;
use crate::filter_settings::EvidenceFilterSettings;
use crate::partition_crossing::PartitionCrossingChecker;
use crate::read_metadata::ReadMetadata;

/// Evidence and passing evidence counts by evidence kind
///
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FilterCounts {
    pub evidence: BTreeMap<String, usize>,
    pub passed: BTreeMap<String, usize>,
}

impl FilterCounts {
    pub fn record(&mut self, kind: EvidenceKind, is_passed: bool) {
        *self.evidence.entry(kind.to_string()).or_default() += 1;
        if is_passed {
            *self.passed.entry(kind.to_string()).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: &Self) {
        for (kind, count) in other.evidence.iter() {
            *self.evidence.entry(kind.clone()).or_default() += count;
        }
        for (kind, count) in other.passed.iter() {
            *self.passed.entry(kind.clone()).or_default() += count;
        }
    }

    pub fn total_evidence(&self) -> usize {
        self.evidence.values().sum()
    }

    pub fn total_passed(&self) -> usize {
        self.passed.values().sum()
    }
}

/// Compute features for each record of an evidence stream
///
/// Each record's context is the window of up to `max_context_evidence` records before and after
/// it in the stream. Records are pulled from the source only as far ahead as this window
/// requires.
///
/// After an extraction error is returned, the stream ends.
///
pub struct EvidenceFeatureStream<'a, I> {
    source: I,
    is_source_exhausted: bool,
    extractor: EvidenceFeatureExtractor<'a>,
    crossing_checker: PartitionCrossingChecker,
    max_context_evidence: usize,
    lookbehind: VecDeque<BreakpointEvidence>,
    lookahead: VecDeque<BreakpointEvidence>,
    is_failed: bool,
}

impl<'a, I> EvidenceFeatureStream<'a, I>
where
    I: Iterator<Item = BreakpointEvidence>,
{
    pub fn new(
        source: I,
        read_metadata: &'a ReadMetadata,
        settings: &EvidenceFilterSettings,
        crossing_checker: PartitionCrossingChecker,
    ) -> Self {
        let max_context_evidence = settings.max_context_evidence();
        Self {
            source,
            is_source_exhausted: false,
            extractor: EvidenceFeatureExtractor::new(read_metadata, settings.min_evidence_mapq()),
            crossing_checker,
            max_context_evidence,
            lookbehind: VecDeque::with_capacity(max_context_evidence),
            lookahead: VecDeque::with_capacity(max_context_evidence + 1),
            is_failed: false,
        }
    }

    /// Pull from the source until the next record has a full lookahead window
    fn fill_lookahead(&mut self) {
        while !self.is_source_exhausted && self.lookahead.len() <= self.max_context_evidence {
            match self.source.next() {
                Some(x) => self.lookahead.push_back(x),
                None => self.is_source_exhausted = true,
            }
        }
    }
}

impl<I> Iterator for EvidenceFeatureStream<'_, I>
where
    I: Iterator<Item = BreakpointEvidence>,
{
    type Item = Result<(BreakpointEvidence, EvidenceFeatures), FilterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_failed {
            return None;
        }
        self.fill_lookahead();
        let evidence = self.lookahead.pop_front()?;
        let context = self
            .lookbehind
            .iter()
            .chain(self.lookahead.iter())
            .collect::<Vec<_>>();
        match self
            .extractor
            .get_features(&evidence, &context, &self.crossing_checker)
        {
            Ok(features) => {
                if self.lookbehind.len() == self.max_context_evidence {
                    self.lookbehind.pop_front();
                }
                self.lookbehind.push_back(evidence.clone());
                Some(Ok((evidence, features)))
            }
            Err(e) => {
                self.is_failed = true;
                Some(Err(e))
            }
        }
    }
}

enum FilterState {
    HasNextUnknown,
    HasNextTrue(Result<BreakpointEvidence, FilterError>),
    Exhausted,
}

/// Iterator over the evidence in a source stream which the classifier accepts
///
/// Evidence is accepted when its classifier probability is strictly greater than the threshold.
/// Accepted evidence is returned in source order.
///
/// Any feature extraction or scoring error is returned in place of the next accepted record, and
/// ends the iteration.
///
pub struct ClassifyingFilter<'a, I, S: ?Sized> {
    feature_stream: EvidenceFeatureStream<'a, I>,
    scorer: &'a S,
    threshold_probability: f64,
    state: FilterState,
    counts: FilterCounts,
}

impl<'a, I, S> ClassifyingFilter<'a, I, S>
where
    I: Iterator<Item = BreakpointEvidence>,
    S: EvidenceScorer + ?Sized,
{
    /// Create a new filter
    ///
    /// The scorer input layout is checked against the evidence feature layout before any evidence
    /// is read.
    ///
    pub fn new(
        source: I,
        read_metadata: &'a ReadMetadata,
        scorer: &'a S,
        settings: &EvidenceFilterSettings,
        crossing_checker: PartitionCrossingChecker,
    ) -> Result<Self, SchemaMismatchError> {
        check_feature_schema(scorer)?;
        Ok(Self {
            feature_stream: EvidenceFeatureStream::new(
                source,
                read_metadata,
                settings,
                crossing_checker,
            ),
            scorer,
            threshold_probability: settings.threshold_probability(),
            state: FilterState::HasNextUnknown,
            counts: FilterCounts::default(),
        })
    }

    /// True if another accepted record (or an error) is available
    ///
    /// Repeated calls without an intervening `next` don't read further from the source.
    ///
    pub fn has_next(&mut self) -> bool {
        if let FilterState::HasNextUnknown = self.state {
            self.state = self.advance();
        }
        matches!(self.state, FilterState::HasNextTrue(_))
    }

    /// Evidence counts for all records classified so far
    pub fn counts(&self) -> &FilterCounts {
        &self.counts
    }

    fn advance(&mut self) -> FilterState {
        for result in self.feature_stream.by_ref() {
            let (evidence, features) = match result {
                Ok(x) => x,
                Err(e) => return FilterState::HasNextTrue(Err(e)),
            };
            let probability = match self.scorer.score(features.values()) {
                Ok(x) => x,
                Err(e) => return FilterState::HasNextTrue(Err(e.into())),
            };
            let is_passed = probability > self.threshold_probability;
            self.counts.record(evidence.kind(), is_passed);
            if is_passed {
                return FilterState::HasNextTrue(Ok(evidence));
            }
        }
        FilterState::Exhausted
    }
}

impl<I, S> Iterator for ClassifyingFilter<'_, I, S>
where
    I: Iterator<Item = BreakpointEvidence>,
    S: EvidenceScorer + ?Sized,
{
    type Item = Result<BreakpointEvidence, FilterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        match std::mem::replace(&mut self.state, FilterState::HasNextUnknown) {
            FilterState::HasNextTrue(Ok(evidence)) => Some(Ok(evidence)),
            FilterState::HasNextTrue(Err(e)) => {
                self.state = FilterState::Exhausted;
                Some(Err(e))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::classifier::test_utils::FnScorer;
    use crate::errors::ScoreError;
    use crate::evidence_codec::EvidenceDecoder;
    use crate::evidence_features::{EvidenceFeature, feature_names};
    use crate::read_metadata::test_utils::{TEST_READ_GROUP, get_test_read_metadata};
    use approx::assert_abs_diff_eq;

    /// Template size anomaly evidence at successive non-overlapping locations with the given
    /// weights
    fn get_weighted_evidence(md: &ReadMetadata, weights: &[i32]) -> Vec<BreakpointEvidence> {
        let decoder = EvidenceDecoder::new(md, TEST_READ_GROUP);
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let start = 1000 * (i + 1);
                let string_rep = format!(
                    "0[{start}:{}]\t{w}\tTemplateSizeAnomaly\t\t5",
                    start + 100
                );
                decoder.decode(&string_rep).unwrap()
            })
            .collect()
    }

    /// Scorer returning the evidence weight as a percentage
    fn weight_percent(features: &[f64]) -> f64 {
        features[EvidenceFeature::Weight as usize] / 100.
    }

    #[test]
    fn test_threshold_gate() {
        let md = get_test_read_metadata();
        let evidence = get_weighted_evidence(&md, &[90, 10, 51, 50, 99]);
        let scorer = FnScorer::new(weight_percent);
        let settings = EvidenceFilterSettings::new(20, 0.5, 50).unwrap();

        let filter = ClassifyingFilter::new(
            evidence.clone().into_iter(),
            &md,
            &scorer,
            &settings,
            PartitionCrossingChecker::empty(),
        )
        .unwrap();
        let passed = filter.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(
            passed,
            vec![
                evidence[0].clone(),
                evidence[2].clone(),
                evidence[4].clone()
            ]
        );
    }

    #[test]
    fn test_filter_counts() {
        let md = get_test_read_metadata();
        let evidence = get_weighted_evidence(&md, &[90, 10, 51, 50, 99]);
        let scorer = FnScorer::new(weight_percent);
        let settings = EvidenceFilterSettings::new(20, 0.5, 50).unwrap();
        let mut filter = ClassifyingFilter::new(
            evidence.into_iter(),
            &md,
            &scorer,
            &settings,
            PartitionCrossingChecker::empty(),
        )
        .unwrap();
        while let Some(x) = filter.next() {
            x.unwrap();
        }
        let counts = filter.counts();
        assert_eq!(counts.total_evidence(), 5);
        assert_eq!(counts.total_passed(), 3);
        assert_eq!(counts.passed.get("TemplateSizeAnomaly"), Some(&3));
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let md = get_test_read_metadata();
        let evidence = get_weighted_evidence(&md, &[10, 90, 20, 95]);
        let scorer = FnScorer::new(weight_percent);
        let settings = EvidenceFilterSettings::new(20, 0.5, 1).unwrap();

        let pulled = Cell::new(0);
        let source = evidence.clone().into_iter().inspect(|_| pulled.set(pulled.get() + 1));
        let mut filter = ClassifyingFilter::new(
            source,
            &md,
            &scorer,
            &settings,
            PartitionCrossingChecker::empty(),
        )
        .unwrap();

        assert!(filter.has_next());
        let pulled_after_first_check = pulled.get();
        assert!(filter.has_next());
        assert!(filter.has_next());
        assert_eq!(pulled.get(), pulled_after_first_check);

        // With a context window of 1, finding record 1 requires reading through record 2
        assert_eq!(pulled_after_first_check, 3);

        assert_eq!(filter.next().unwrap().unwrap(), evidence[1]);
        assert!(filter.has_next());
        assert_eq!(filter.next().unwrap().unwrap(), evidence[3]);
        assert!(!filter.has_next());
        assert!(!filter.has_next());
        assert!(filter.next().is_none());
        assert_eq!(pulled.get(), 4);
    }

    #[test]
    fn test_empty_source() {
        let md = get_test_read_metadata();
        let scorer = FnScorer::new(weight_percent);
        let settings = EvidenceFilterSettings::default();
        let mut filter = ClassifyingFilter::new(
            std::iter::empty(),
            &md,
            &scorer,
            &settings,
            PartitionCrossingChecker::empty(),
        )
        .unwrap();
        assert!(!filter.has_next());
        assert!(filter.next().is_none());
    }

    #[test]
    fn test_schema_mismatch_is_found_before_filtering() {
        let md = get_test_read_metadata();
        let mut names = feature_names()
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<_>>();
        names.pop();
        let scorer = FnScorer::with_feature_names(names, weight_percent);
        let settings = EvidenceFilterSettings::default();
        let result = ClassifyingFilter::new(
            std::iter::empty(),
            &md,
            &scorer,
            &settings,
            PartitionCrossingChecker::empty(),
        );
        assert!(matches!(
            result,
            Err(SchemaMismatchError::FeatureCount {
                expected: 14,
                found: 15
            })
        ));
    }

    struct FailingScorer {
        feature_names: Vec<String>,
    }

    impl EvidenceScorer for FailingScorer {
        fn feature_names(&self) -> &[String] {
            &self.feature_names
        }

        fn score(&self, features: &[f64]) -> Result<f64, ScoreError> {
            if features[EvidenceFeature::Weight as usize] == 13. {
                Err(ScoreError::FeatureCount {
                    expected: 0,
                    found: features.len(),
                })
            } else {
                Ok(1.)
            }
        }
    }

    #[test]
    fn test_scoring_error_ends_filtering() {
        let md = get_test_read_metadata();
        let evidence = get_weighted_evidence(&md, &[90, 13, 99]);
        let scorer = FailingScorer {
            feature_names: feature_names().iter().map(|x| x.to_string()).collect(),
        };
        let settings = EvidenceFilterSettings::new(20, 0.5, 50).unwrap();
        let mut filter = ClassifyingFilter::new(
            evidence.clone().into_iter(),
            &md,
            &scorer,
            &settings,
            PartitionCrossingChecker::empty(),
        )
        .unwrap();

        assert_eq!(filter.next().unwrap().unwrap(), evidence[0]);
        assert!(matches!(filter.next(), Some(Err(FilterError::Score(_)))));
        assert!(!filter.has_next());
        assert!(filter.next().is_none());
    }

    #[test]
    fn test_bounded_context_window() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);

        // Five mutually overlapping records
        let evidence = (0..5)
            .map(|i| {
                let string_rep = format!(
                    "0[{}:{})\t1\tMateUnmapped\t\tr{i}/1\t1\t0\t100M\t60",
                    15000 + i,
                    15100 + i
                );
                decoder.decode(&string_rep).unwrap()
            })
            .collect::<Vec<_>>();

        let settings = EvidenceFilterSettings::new(20, 0.5, 1).unwrap();
        let stream = EvidenceFeatureStream::new(
            evidence.clone().into_iter(),
            &md,
            &settings,
            PartitionCrossingChecker::empty(),
        );
        let num_overlap = stream
            .map(|x| x.unwrap().1.get(EvidenceFeature::NumOverlap))
            .collect::<Vec<_>>();
        let expected = [0.1, 0.2, 0.2, 0.2, 0.1];
        for (value, expected_value) in num_overlap.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*value, *expected_value, epsilon = 1e-5);
        }

        let settings = EvidenceFilterSettings::new(20, 0.5, 50).unwrap();
        let stream = EvidenceFeatureStream::new(
            evidence.into_iter(),
            &md,
            &settings,
            PartitionCrossingChecker::empty(),
        );
        for result in stream {
            let (_, features) = result.unwrap();
            assert_abs_diff_eq!(
                features.get(EvidenceFeature::NumOverlap),
                0.4,
                epsilon = 1e-5
            );
        }
    }
}
