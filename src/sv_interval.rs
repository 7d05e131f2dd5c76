use std::fmt;

use serde::{Deserialize, Serialize};

/// A contig-relative genomic interval
///
/// All intervals follow the bed file range convention: 0-indexed, half-closed, [start,end)
///
/// Ordering is by (contig, start, end), which is the order evidence streams are expected to
/// arrive in.
///
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub struct SVInterval {
    /// contig index as defined by the contig list in the read metadata
    pub contig: i32,
    pub start: i32,
    pub end: i32,
}

impl SVInterval {
    /// Create an interval without checking that start < end
    ///
    /// Intervals from external input should be checked with `is_empty` by the caller.
    ///
    pub fn new(contig: i32, start: i32, end: i32) -> Self {
        Self { contig, start, end }
    }

    pub fn len(&self) -> i32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Return true if the intervals intersect (adjacency does not count)
    ///
    pub fn overlaps(&self, other: &SVInterval) -> bool {
        self.contig == other.contig && other.start < self.end && self.start < other.end
    }
}

/// Format as `contig[start:end)`
impl fmt::Display for SVInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}:{})", self.contig, self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub struct StrandedInterval {
    pub interval: SVInterval,
    pub is_forward_strand: bool,
}

impl StrandedInterval {
    pub fn new(interval: SVInterval, is_forward_strand: bool) -> Self {
        Self {
            interval,
            is_forward_strand,
        }
    }
}

/// Format as `contig[start:end):strand_bit`
impl fmt::Display for StrandedInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.interval,
            if self.is_forward_strand { 1 } else { 0 }
        )
    }
}
