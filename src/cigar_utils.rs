//! CIGAR-string processing utilities
//!

use rust_htslib::bam::record::{Cigar, CigarString};

use crate::errors::EvidenceError;

/// Is the cigar element any of the alignment match types?
///
pub fn is_alignment_match(c: &Cigar) -> bool {
    matches!(c, Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_))
}

pub fn get_cigarseg_ref_offset(c: &Cigar) -> i32 {
    use Cigar::*;
    match c {
        Del(len) | RefSkip(len) | Diff(len) | Equal(len) | Match(len) => *len as i32,
        _ => 0,
    }
}

/// Parse CIGAR text into rust-htslib's cigar representation
///
/// Both the empty string and the SAM unavailable marker '*' are parsed to an empty CIGAR.
///
pub fn get_cigar_from_string(cigar_str: &str) -> Result<Vec<Cigar>, EvidenceError> {
    if cigar_str.is_empty() || cigar_str == "*" {
        return Ok(Vec::new());
    }
    CigarString::try_from(cigar_str.as_bytes())
        .map(|x| x.0)
        .map_err(|_| EvidenceError::InvalidCigar(cigar_str.to_string()))
}

/// Report the reference offset of the cigar alignment
///
pub fn get_cigar_ref_offset(cigar: &[Cigar]) -> i32 {
    cigar.iter().map(get_cigarseg_ref_offset).sum()
}

/// Total length of all alignment match segments
///
pub fn get_cigar_matched_bases(cigar: &[Cigar]) -> i32 {
    cigar
        .iter()
        .filter(|c| is_alignment_match(c))
        .map(|c| c.len() as i32)
        .sum()
}

/// Summary of the alignment described by a CIGAR string, as used for evidence features
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CigarSummary {
    pub bases_matched: i32,
    pub reference_length: i32,
}

impl CigarSummary {
    pub fn from_cigar_str(cigar_str: &str) -> Result<Self, EvidenceError> {
        let cigar = get_cigar_from_string(cigar_str)?;
        Ok(Self {
            bases_matched: get_cigar_matched_bases(&cigar),
            reference_length: get_cigar_ref_offset(&cigar),
        })
    }
}
