//! Parse and synthesize supplementary alignment (SA) tag text for split-read evidence
//!

use itertools::Itertools;

use crate::cigar_utils::{get_cigar_from_string, get_cigar_ref_offset};
use crate::errors::EvidenceError;
use crate::read_metadata::ReadMetadata;
use crate::sv_interval::{SVInterval, StrandedInterval};

/// Uncertainty in bases on either side of a split read's distal breakpoint
pub const SPLIT_READ_UNCERTAINTY: i32 = 3;

/// Object to directly represent one segment from a split alignment SA tag
#[derive(Clone, Debug, PartialEq)]
pub struct SplitReadSegment {
    /// reference sequence name
    pub rname: String,

    /// reference zero-indexed alignment start position
    pub pos: i32,

    pub is_fwd_strand: bool,

    /// Reference length of the segment alignment, taken from the segment CIGAR
    pub ref_len: i32,

    /// mapping quality
    pub mapq: i32,

    /// alignment edit distance
    pub nm: i32,
}

/// Parse one segment from the SA tag string into a split alignment object
///
pub fn parse_sa_segment(seg: &str) -> Result<SplitReadSegment, EvidenceError> {
    let malformed = || EvidenceError::MalformedSaTag(seg.to_string());

    let sa_fields = seg.split_terminator(',').collect::<Vec<_>>();
    if sa_fields.len() != 6 {
        return Err(malformed());
    }
    let rname = sa_fields[0].to_string();
    let pos = sa_fields[1].parse::<i32>().map_err(|_| malformed())? - 1;
    let is_fwd_strand = match sa_fields[2] {
        "+" => true,
        "-" => false,
        _ => return Err(malformed()),
    };
    let cigar = get_cigar_from_string(sa_fields[3])?;
    let ref_len = get_cigar_ref_offset(&cigar);
    let mapq = sa_fields[4].parse::<i32>().map_err(|_| malformed())?;
    let nm = sa_fields[5].parse::<i32>().map_err(|_| malformed())?;
    Ok(SplitReadSegment {
        rname,
        pos,
        is_fwd_strand,
        ref_len,
        mapq,
        nm,
    })
}

/// Split the SA tag into each supplementary alignment, and parse each into a split alignment object
///
pub fn parse_sa_tag(sa_tag: &str) -> Result<Vec<SplitReadSegment>, EvidenceError> {
    sa_tag.split_terminator(';').map(parse_sa_segment).collect()
}

/// Strand of the distal target implied by a supplementary segment
///
/// The target keeps the supplementary strand when the primary alignment is clipped on the side
/// matching its own orientation, and is flipped otherwise.
///
pub fn get_distal_target_strand(
    segment: &SplitReadSegment,
    primary_alignment_clipped_at_start: bool,
    primary_alignment_forward_strand: bool,
) -> bool {
    segment.is_fwd_strand ^ (primary_alignment_clipped_at_start != primary_alignment_forward_strand)
}

/// Find the distal target interval of a supplementary segment
///
/// Returns None if the segment's contig is unknown or ignored.
///
pub fn get_distal_target(
    read_metadata: &ReadMetadata,
    segment: &SplitReadSegment,
    primary_alignment_clipped_at_start: bool,
    primary_alignment_forward_strand: bool,
) -> Option<StrandedInterval> {
    let contig = read_metadata.contig_index(&segment.rname)?;
    if read_metadata.ignore_cross_contig(contig) {
        return None;
    }
    let is_forward_strand = get_distal_target_strand(
        segment,
        primary_alignment_clipped_at_start,
        primary_alignment_forward_strand,
    );
    let pos = if is_forward_strand {
        segment.pos + segment.ref_len
    } else {
        segment.pos
    };
    let interval = SVInterval::new(
        contig,
        pos - SPLIT_READ_UNCERTAINTY,
        pos + SPLIT_READ_UNCERTAINTY + 1,
    );
    Some(StrandedInterval::new(interval, is_forward_strand))
}

/// Create a plausible SA tag segment reproducing the given distal target
///
/// The original supplementary alignment can't be recovered from a distal target, so this
/// creates a self-consistent alignment which maps back to the same target, assuming the primary
/// alignment is clipped on the side matching its orientation:
/// - The alignment reference span is the target length, with the rest of an average length read
///   soft-clipped on the side away from the breakpoint.
/// - Mapping quality is the maximum value and the edit distance is zero.
///
pub fn distal_target_to_sa_segment(
    read_metadata: &ReadMetadata,
    distal_target: &StrandedInterval,
) -> Option<String> {
    let interval = &distal_target.interval;
    let contig_name = read_metadata.contig_name(interval.contig)?;
    let is_forward_strand = distal_target.is_forward_strand;
    let reference_length = interval.len();
    let pos = interval.end - 1 - SPLIT_READ_UNCERTAINTY;
    let start = if is_forward_strand {
        pos - reference_length
    } else {
        pos
    };
    let avg_read_length = read_metadata.avg_read_length();
    let clip_length = avg_read_length - reference_length;
    let cigar = if reference_length >= avg_read_length {
        format!("{reference_length}M")
    } else if is_forward_strand {
        format!("{reference_length}M{clip_length}S")
    } else {
        format!("{clip_length}S{reference_length}M")
    };
    let mapq = i32::MAX;
    let mismatches = 0;
    Some(format!(
        "{contig_name},{},{},{cigar},{mapq},{mismatches};",
        start + 1,
        if is_forward_strand { "+" } else { "-" },
    ))
}

/// Create a complete SA tag from a list of distal targets
///
/// Returns None if there are no targets, or if any target contig is unknown.
///
pub fn distal_targets_to_sa_tag(
    read_metadata: &ReadMetadata,
    distal_targets: &[StrandedInterval],
) -> Option<String> {
    if distal_targets.is_empty() {
        return None;
    }
    let segments = distal_targets
        .iter()
        .map(|x| distal_target_to_sa_segment(read_metadata, x))
        .collect::<Option<Vec<_>>>()?;
    Some(segments.into_iter().join(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_metadata::test_utils::get_test_read_metadata;

    #[test]
    fn test_parse_sa_tag() {
        let test_val = "chr3,10001,+,5535S10=1D39=2X11438S,60,192;\
        chr3,10001,+,3073S15=2D20=2X11=1X5=1I23=1X5=14798S,22,44;\
        chr4,106872270,-,23=1I226=1I195=1X147=1D1021=7362S,60,19;";

        let result = parse_sa_tag(test_val).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[2].rname, "chr4");
        assert_eq!(result[1].pos, 10_000);
        assert_eq!(result[0].ref_len, 52);
        assert!(!result[2].is_fwd_strand);
        assert_eq!(result[2].nm, 19);
    }

    #[test]
    fn test_parse_malformed_sa_tag() {
        assert_eq!(
            parse_sa_tag("chr3,10001,+,50M,60;"),
            Err(EvidenceError::MalformedSaTag("chr3,10001,+,50M,60".to_string()))
        );
        assert_eq!(
            parse_sa_tag("chr3,10001,x,50M,60,0;"),
            Err(EvidenceError::MalformedSaTag("chr3,10001,x,50M,60,0".to_string()))
        );
        assert_eq!(
            parse_sa_tag("chr3,10001,+,50Q,60,0;"),
            Err(EvidenceError::InvalidCigar("50Q".to_string()))
        );
    }

    #[test]
    fn test_distal_target_to_sa_segment() {
        let md = get_test_read_metadata();

        let fwd = StrandedInterval::new(SVInterval::new(1, 1000, 1007), true);
        assert_eq!(
            distal_target_to_sa_segment(&md, &fwd).unwrap(),
            format!("chr2,997,+,7M93S,{},0;", i32::MAX)
        );

        let rev = StrandedInterval::new(SVInterval::new(2, 1000, 1007), false);
        assert_eq!(
            distal_target_to_sa_segment(&md, &rev).unwrap(),
            format!("chr3,1004,-,93S7M,{},0;", i32::MAX)
        );

        // Target spans are larger than the read
        let wide = StrandedInterval::new(SVInterval::new(0, 1000, 1200), true);
        assert_eq!(
            distal_target_to_sa_segment(&md, &wide).unwrap(),
            format!("chr1,997,+,200M,{},0;", i32::MAX)
        );

        let unknown = StrandedInterval::new(SVInterval::new(7, 1000, 1007), true);
        assert!(distal_target_to_sa_segment(&md, &unknown).is_none());
    }

    #[test]
    fn test_synthesized_segment_inverts_to_target() {
        let md = get_test_read_metadata();
        for is_forward_strand in [true, false] {
            let target = StrandedInterval::new(SVInterval::new(1, 5000, 5007), is_forward_strand);
            let tag = distal_targets_to_sa_tag(&md, &[target]).unwrap();
            let segments = parse_sa_tag(&tag).unwrap();
            assert_eq!(segments.len(), 1);
            let result =
                get_distal_target(&md, &segments[0], is_forward_strand, is_forward_strand).unwrap();
            assert_eq!(result, target);
        }
    }

    #[test]
    fn test_distal_target_strand() {
        let mut segment = parse_sa_segment("chr1,101,+,50M,60,0").unwrap();
        assert!(get_distal_target_strand(&segment, true, true));
        assert!(get_distal_target_strand(&segment, false, false));
        assert!(!get_distal_target_strand(&segment, false, true));
        segment.is_fwd_strand = false;
        assert!(!get_distal_target_strand(&segment, true, true));
        assert!(get_distal_target_strand(&segment, true, false));
    }
}
