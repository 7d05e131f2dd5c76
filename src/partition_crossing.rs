//! Decide whether two evidence records may be combined for context-dependent features
//!
//! When the evidence stream is split into partitions and each partition is filtered
//! independently, records near a partition edge can't see their neighbors in the adjacent
//! partition. Context between such records is disallowed everywhere, so that results are
//! identical however the stream is partitioned.
//!

use crate::read_metadata::ReadMetadata;
use crate::sv_interval::SVInterval;

/// Default distance from a partition edge within which records are treated as on the boundary
pub const DEFAULT_PARTITION_GAP_SIZE: i32 = 1000;

#[derive(Clone, Debug)]
struct PartitionZones {
    /// Region within the gap size of the partition start
    left_boundary: SVInterval,

    /// Region within the gap size of the partition end
    right_boundary: SVInterval,

    first: (i32, i32),
    last: (i32, i32),
}

impl PartitionZones {
    fn on_boundary(&self, loc: &SVInterval) -> bool {
        loc.overlaps(&self.left_boundary) || loc.overlaps(&self.right_boundary)
    }

    fn is_in_partition(&self, loc: &SVInterval) -> bool {
        (loc.contig, loc.end) > self.first && (loc.contig, loc.start) < self.last
    }
}

/// Predicate over pairs of evidence locations
///
/// The empty checker never reports a crossing.
///
#[derive(Clone, Debug, Default)]
pub struct PartitionCrossingChecker {
    zones: Option<PartitionZones>,
}

impl PartitionCrossingChecker {
    /// A checker which allows all evidence combinations
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checker for evidence within the given partition of the read metadata partition table
    ///
    /// Returns None if the partition index is out of range.
    ///
    pub fn new(partition_index: usize, read_metadata: &ReadMetadata, gap_size: i32) -> Option<Self> {
        if partition_index >= read_metadata.partition_count() {
            return None;
        }
        let bounds = read_metadata.partition_bounds(partition_index);
        let zones = PartitionZones {
            left_boundary: SVInterval::new(
                bounds.first_contig,
                bounds.first_start - gap_size,
                bounds.first_start + gap_size,
            ),
            right_boundary: SVInterval::new(
                bounds.last_contig,
                bounds.last_end - gap_size,
                bounds.last_end + gap_size,
            ),
            first: (bounds.first_contig, bounds.first_start),
            last: (bounds.last_contig, bounds.last_end),
        };
        Some(Self { zones: Some(zones) })
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_none()
    }

    /// True if the location is within the gap size of either partition edge
    pub fn on_boundary(&self, loc: &SVInterval) -> bool {
        self.zones.as_ref().is_some_and(|x| x.on_boundary(loc))
    }

    /// True if the location intersects the partition span, always true for the empty checker
    pub fn is_in_partition(&self, loc: &SVInterval) -> bool {
        self.zones.as_ref().is_none_or(|x| x.is_in_partition(loc))
    }

    /// True if records at these two locations must not be combined
    pub fn crosses(&self, loc1: &SVInterval, loc2: &SVInterval) -> bool {
        match &self.zones {
            None => false,
            Some(zones) => {
                zones.on_boundary(loc1)
                    || zones.on_boundary(loc2)
                    || zones.is_in_partition(loc1) != zones.is_in_partition(loc2)
            }
        }
    }
}
