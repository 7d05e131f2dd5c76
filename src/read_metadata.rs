//! Read group, library and partition data shared by all feature extraction calls
//!

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::MetadataError;
use crate::library_stats::LibraryStatistics;
use crate::sv_interval::SVInterval;

/// The genome span assigned to one partition of the evidence stream
///
/// Partitions are ordered in genome order and cover the range from
/// (first_contig, first_start) to (last_contig, last_end).
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PartitionBounds {
    pub first_contig: i32,
    pub first_start: i32,
    pub last_contig: i32,
    pub last_end: i32,
    pub span: i32,
}

impl PartitionBounds {
    pub fn new(first_contig: i32, first_start: i32, last_contig: i32, last_end: i32, span: i32) -> Self {
        Self {
            first_contig,
            first_start,
            last_contig,
            last_end,
            span,
        }
    }

    /// True if the start of the interval falls in this partition
    pub fn contains_start(&self, loc: &SVInterval) -> bool {
        let pos = (loc.contig, loc.start);
        pos >= (self.first_contig, self.first_start) && pos < (self.last_contig, self.last_end)
    }
}

/// Serialized form of ReadMetadata
#[derive(Deserialize, Serialize)]
struct ReadMetadataData {
    contig_names: Vec<String>,
    #[serde(default)]
    cross_contigs_to_ignore: BTreeSet<i32>,
    read_group_to_library: BTreeMap<String, String>,
    library_statistics: BTreeMap<String, LibraryStatistics>,
    partition_bounds: Vec<PartitionBounds>,
    avg_read_length: i32,
    coverage: f32,
}

/// Immutable per-run summary of the input alignments
///
#[derive(Clone, Debug)]
pub struct ReadMetadata {
    contig_names: Vec<String>,
    contig_name_to_index: HashMap<String, i32>,
    cross_contigs_to_ignore: BTreeSet<i32>,
    read_group_to_library: BTreeMap<String, String>,
    library_statistics: BTreeMap<String, LibraryStatistics>,
    partition_bounds: Vec<PartitionBounds>,
    avg_read_length: i32,
    coverage: f32,
}

impl ReadMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contig_names: Vec<String>,
        cross_contigs_to_ignore: BTreeSet<i32>,
        read_group_to_library: BTreeMap<String, String>,
        library_statistics: BTreeMap<String, LibraryStatistics>,
        partition_bounds: Vec<PartitionBounds>,
        avg_read_length: i32,
        coverage: f32,
    ) -> Result<Self, MetadataError> {
        if !(coverage.is_finite() && coverage > 0.) {
            return Err(MetadataError::Coverage(coverage));
        }
        if avg_read_length <= 0 {
            return Err(MetadataError::AvgReadLength(avg_read_length));
        }
        for (library, stats) in library_statistics.iter() {
            stats.validate(library)?;
        }
        for (read_group, library) in read_group_to_library.iter() {
            if !library_statistics.contains_key(library) {
                return Err(MetadataError::UnknownLibrary {
                    read_group: read_group.clone(),
                    library: library.clone(),
                });
            }
        }
        for (index, (b1, b2)) in partition_bounds
            .iter()
            .zip(partition_bounds.iter().skip(1))
            .enumerate()
        {
            if (b2.first_contig, b2.first_start) < (b1.last_contig, b1.last_end) {
                return Err(MetadataError::PartitionOrder(index + 1));
            }
        }

        let contig_name_to_index = contig_names
            .iter()
            .enumerate()
            .map(|(i, x)| (x.clone(), i as i32))
            .collect();

        Ok(Self {
            contig_names,
            contig_name_to_index,
            cross_contigs_to_ignore,
            read_group_to_library,
            library_statistics,
            partition_bounds,
            avg_read_length,
            coverage,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        let data: ReadMetadataData =
            serde_json::from_str(json).map_err(|e| MetadataError::Parse(e.to_string()))?;
        Self::from_data(data)
    }

    fn from_data(data: ReadMetadataData) -> Result<Self, MetadataError> {
        Self::new(
            data.contig_names,
            data.cross_contigs_to_ignore,
            data.read_group_to_library,
            data.library_statistics,
            data.partition_bounds,
            data.avg_read_length,
            data.coverage,
        )
    }

    pub fn contig_count(&self) -> usize {
        self.contig_names.len()
    }

    pub fn contig_name(&self, contig: i32) -> Option<&str> {
        usize::try_from(contig)
            .ok()
            .and_then(|i| self.contig_names.get(i))
            .map(|x| x.as_str())
    }

    pub fn contig_index(&self, contig_name: &str) -> Option<i32> {
        self.contig_name_to_index.get(contig_name).copied()
    }

    /// Distal targets pointing at one of these contigs are not reported
    pub fn ignore_cross_contig(&self, contig: i32) -> bool {
        self.cross_contigs_to_ignore.contains(&contig)
    }

    pub fn library_statistics_for_read_group(&self, read_group: &str) -> Option<&LibraryStatistics> {
        self.read_group_to_library
            .get(read_group)
            .and_then(|library| self.library_statistics.get(library))
    }

    pub fn partition_count(&self) -> usize {
        self.partition_bounds.len()
    }

    pub fn partition_bounds(&self, partition_index: usize) -> &PartitionBounds {
        &self.partition_bounds[partition_index]
    }

    /// Find the partition containing the start of the given interval
    ///
    pub fn partition_index(&self, loc: &SVInterval) -> Option<usize> {
        let pos = (loc.contig, loc.start);
        let index = self
            .partition_bounds
            .partition_point(|x| (x.last_contig, x.last_end) <= pos);
        self.partition_bounds
            .get(index)
            .filter(|x| x.contains_start(loc))
            .map(|_| index)
    }

    pub fn avg_read_length(&self) -> i32 {
        self.avg_read_length
    }

    pub fn coverage(&self) -> f32 {
        self.coverage
    }
}

/// Read the read metadata json file
pub fn read_metadata_file(filename: &Utf8Path) -> Result<ReadMetadata, MetadataError> {
    info!("Reading read metadata from file: '{filename}'");

    let file = File::open(filename)
        .map_err(|e| MetadataError::Parse(format!("can't open file '{filename}': {e}")))?;
    let reader = BufReader::new(file);
    let data: ReadMetadataData = serde_json::from_reader(reader)
        .map_err(|e| MetadataError::Parse(format!("file '{filename}': {e}")))?;
    ReadMetadata::from_data(data)
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;

    #[test]
    fn test_contig_lookup() {
        let md = get_test_read_metadata();
        assert_eq!(md.contig_count(), 3);
        assert_eq!(md.contig_name(1), Some("chr2"));
        assert_eq!(md.contig_name(3), None);
        assert_eq!(md.contig_name(-1), None);
        assert_eq!(md.contig_index("chr3"), Some(2));
        assert_eq!(md.contig_index("chrX"), None);
    }

    #[test]
    fn test_library_lookup() {
        let md = get_test_read_metadata();
        assert!(md.library_statistics_for_read_group(TEST_READ_GROUP).is_some());
        assert!(md.library_statistics_for_read_group("foo").is_none());
    }

    #[test]
    fn test_partition_index() {
        let md = get_test_read_metadata();
        assert_eq!(md.partition_index(&SVInterval::new(0, 5, 10)), Some(0));
        assert_eq!(md.partition_index(&SVInterval::new(0, 9999, 10100)), Some(0));
        assert_eq!(md.partition_index(&SVInterval::new(0, 10000, 10100)), None);
        assert_eq!(md.partition_index(&SVInterval::new(0, 10001, 10100)), Some(1));
        assert_eq!(md.partition_index(&SVInterval::new(0, 29000, 29100)), Some(2));
        assert_eq!(md.partition_index(&SVInterval::new(1, 5, 10)), None);
    }

    #[test]
    fn test_unknown_library() {
        let mut read_group_to_library = BTreeMap::new();
        read_group_to_library.insert("rg1".to_string(), "missing".to_string());
        let result = ReadMetadata::new(
            vec!["chr1".to_string()],
            BTreeSet::new(),
            read_group_to_library,
            BTreeMap::new(),
            Vec::new(),
            100,
            10.,
        );
        assert_eq!(
            result.unwrap_err(),
            MetadataError::UnknownLibrary {
                read_group: "rg1".to_string(),
                library: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_partition_order() {
        let result = ReadMetadata::new(
            vec!["chr1".to_string()],
            BTreeSet::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            vec![
                PartitionBounds::new(0, 1, 0, 10000, 9999),
                PartitionBounds::new(0, 5000, 0, 20000, 15000),
            ],
            100,
            10.,
        );
        assert_eq!(result.unwrap_err(), MetadataError::PartitionOrder(1));
    }

    #[test]
    fn test_invalid_coverage() {
        for coverage in [0., -1., f32::NAN, f32::INFINITY] {
            let result = ReadMetadata::new(
                vec!["chr1".to_string()],
                BTreeSet::new(),
                BTreeMap::new(),
                BTreeMap::new(),
                Vec::new(),
                100,
                coverage,
            );
            assert!(matches!(result, Err(MetadataError::Coverage(_))));
        }
    }

    #[test]
    fn test_invalid_avg_read_length() {
        for avg_read_length in [0, -100] {
            let result = ReadMetadata::new(
                vec!["chr1".to_string()],
                BTreeSet::new(),
                BTreeMap::new(),
                BTreeMap::new(),
                Vec::new(),
                avg_read_length,
                10.,
            );
            assert_eq!(
                result.unwrap_err(),
                MetadataError::AvgReadLength(avg_read_length)
            );
        }
    }

    #[test]
    fn test_zero_coverage_json_is_rejected() {
        let json = r#"{
            "contig_names": ["chr1"],
            "read_group_to_library": {},
            "library_statistics": {},
            "partition_bounds": [],
            "avg_read_length": 100,
            "coverage": 0.0
        }"#;
        assert_eq!(
            ReadMetadata::from_json_str(json).unwrap_err(),
            MetadataError::Coverage(0.)
        );
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "contig_names": ["chr1", "chr2"],
            "read_group_to_library": {"rg1": "lib1"},
            "library_statistics": {
                "lib1": {
                    "template_size_cdf": {"fractions": [0.0, 0.5, 1.0], "total_observations": 2},
                    "total_bases": 1000,
                    "total_reads": 10,
                    "total_fragment_pairs": 5,
                    "total_templates": 5
                }
            },
            "partition_bounds": [
                {"first_contig": 0, "first_start": 1, "last_contig": 1, "last_end": 500, "span": 1499}
            ],
            "avg_read_length": 100,
            "coverage": 30.0
        }"#;
        let md = ReadMetadata::from_json_str(json).unwrap();
        assert_eq!(md.contig_index("chr2"), Some(1));
        assert_eq!(md.avg_read_length(), 100);
        assert_eq!(md.partition_count(), 1);
        assert_eq!(md.partition_index(&SVInterval::new(1, 20, 30)), Some(0));
        let stats = md.library_statistics_for_read_group("rg1").unwrap();
        assert_eq!(stats.template_size_cdf.len(), 3);
    }
}
