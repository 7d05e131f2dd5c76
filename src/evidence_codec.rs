//! Reconstruct breakpoint evidence from its textual representation
//!
//! Decoding is intended for test fixtures and debug input. `string_rep` inverts decoding exactly:
//!
//!   decode(s).string_rep(read_metadata, min_evidence_mapq) == s
//!
//! ...but decoding does not in general invert `string_rep`, because split read SA tags, read
//! group, validation state and target qualities are not stored in the text.
//!

use std::sync::LazyLock;

use regex::Regex;

use crate::breakpoint_evidence::{
    BreakpointEvidence, DiscordantPair, EXACT_TARGET_QUALITY, EvidenceKind, NO_TARGET_QUALITY,
    ReadEvidence, SplitRead, TemplateFragmentOrdinal, TemplateSizeAnomaly,
};
use crate::errors::{DecodeError, EvidenceError};
use crate::read_metadata::ReadMetadata;
use crate::sa_tag::distal_targets_to_sa_tag;
use crate::sv_interval::{SVInterval, StrandedInterval};

/// Read group assigned to decoded evidence when none is specified
pub const DEFAULT_READ_GROUP: &str = "default";

static LOCATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\[(-?\d+):(-?\d+)[\)\]]$").unwrap());

static STRANDED_LOCATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\[(-?\d+):(-?\d+)[\)\]]:([01])$").unwrap());

fn parse_int(label: &'static str, value: &str) -> Result<i32, DecodeError> {
    value
        .parse::<i32>()
        .map_err(|_| DecodeError::malformed(label, value))
}

/// Decoded intervals must satisfy start < end
fn check_interval(
    label: &'static str,
    value: &str,
    interval: SVInterval,
) -> Result<SVInterval, DecodeError> {
    if interval.is_empty() {
        Err(DecodeError::EmptyInterval {
            label,
            value: value.to_string(),
        })
    } else {
        Ok(interval)
    }
}

/// Parse interval from a `contig[start:end)` token
///
pub fn parse_location(value: &str) -> Result<SVInterval, DecodeError> {
    let caps = LOCATION_REGEX
        .captures(value)
        .ok_or_else(|| DecodeError::malformed("location", value))?;
    let interval = SVInterval::new(
        parse_int("location contig", &caps[1])?,
        parse_int("location start", &caps[2])?,
        parse_int("location end", &caps[3])?,
    );
    check_interval("location", value, interval)
}

/// Parse stranded interval from a `contig[start:end):strand_bit` token
///
pub fn parse_stranded_location(value: &str) -> Result<StrandedInterval, DecodeError> {
    let caps = STRANDED_LOCATION_REGEX
        .captures(value)
        .ok_or_else(|| DecodeError::malformed("distal target", value))?;
    let interval = SVInterval::new(
        parse_int("distal target contig", &caps[1])?,
        parse_int("distal target start", &caps[2])?,
        parse_int("distal target end", &caps[3])?,
    );
    let interval = check_interval("distal target", value, interval)?;
    Ok(StrandedInterval::new(interval, &caps[4] == "1"))
}

/// Parse `template_name[/ordinal_code]`
///
/// An empty ordinal code is the same as no code.
///
pub fn parse_template_label(value: &str) -> Result<(String, TemplateFragmentOrdinal), DecodeError> {
    match value.split_once('/') {
        None => Ok((value.to_string(), TemplateFragmentOrdinal::Unpaired)),
        Some((name, "")) => Ok((name.to_string(), TemplateFragmentOrdinal::Unpaired)),
        Some((name, code)) => {
            let ordinal = TemplateFragmentOrdinal::from_code(code)
                .ok_or_else(|| DecodeError::UnknownFragmentOrdinal(code.to_string()))?;
            Ok((name.to_string(), ordinal))
        }
    }
}

fn parse_distal_targets(value: &str) -> Result<Vec<StrandedInterval>, DecodeError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    let distal_targets = value
        .split(';')
        .map(parse_stranded_location)
        .collect::<Result<Vec<_>, _>>()?;
    if distal_targets.len() > 1 {
        return Err(EvidenceError::TooManyDistalTargets(distal_targets.len()).into());
    }
    Ok(distal_targets)
}

fn check_field_count(words: &[&str], expected: usize) -> Result<(), DecodeError> {
    if words.len() < expected {
        Err(DecodeError::FieldCount {
            expected,
            found: words.len(),
        })
    } else {
        Ok(())
    }
}

/// Builds breakpoint evidence from the textual representation
///
/// Information missing from the text is filled in with fixed values: all evidence is assigned to
/// a single read group and is not validated.
///
pub struct EvidenceDecoder<'a> {
    read_metadata: &'a ReadMetadata,
    read_group: String,
}

impl<'a> EvidenceDecoder<'a> {
    pub fn new(read_metadata: &'a ReadMetadata, read_group: &str) -> Self {
        Self {
            read_metadata,
            read_group: read_group.to_string(),
        }
    }

    pub fn decode(&self, string_rep: &str) -> Result<BreakpointEvidence, DecodeError> {
        let string_rep = string_rep.trim_end_matches(['\n', '\r']);
        let words = string_rep.split('\t').collect::<Vec<_>>();
        check_field_count(&words, 5)?;

        let location = parse_location(words[0])?;
        let weight = parse_int("weight", words[1])?;
        if weight < 0 {
            return Err(DecodeError::NegativeWeight(weight));
        }
        let kind = words[2]
            .parse::<EvidenceKind>()
            .map_err(|_| DecodeError::UnknownEvidenceType(words[2].to_string()))?;

        if kind == EvidenceKind::TemplateSizeAnomaly {
            if !parse_distal_targets(words[3])?.is_empty() {
                return Err(DecodeError::UnexpectedDistalTarget(kind.into()));
            }
            let read_count = parse_int("read count", words[4])?;
            return Ok(BreakpointEvidence::TemplateSizeAnomaly(
                TemplateSizeAnomaly {
                    location,
                    weight,
                    read_count,
                },
            ));
        }

        check_field_count(&words, 9)?;
        let distal_targets = parse_distal_targets(words[3])?;
        let (template_name, fragment_ordinal) = parse_template_label(words[4])?;
        let read = ReadEvidence {
            location,
            weight,
            template_name,
            fragment_ordinal,
            validated: false,
            is_forward_strand: words[5] == "1",
            cigar: words[7].to_string(),
            mapping_quality: parse_int("mapping quality", words[8])?,
            template_size: parse_int("template size", words[6])?,
            read_group: self.read_group.clone(),
        };

        let (target, target_forward_strand, target_quality) = match distal_targets.first() {
            Some(x) => (x.interval, x.is_forward_strand, EXACT_TARGET_QUALITY),
            None => (SVInterval::new(0, 0, 0), false, NO_TARGET_QUALITY),
        };

        let evidence = match kind {
            EvidenceKind::SplitRead => {
                // The original SA tag can't be recovered, so synthesize a self-consistent tag
                // reproducing the distal targets. The primary alignment is set to be clipped on
                // the side matching its strand, which keeps the supplementary strand unchanged.
                let sa_tag = if distal_targets.is_empty() {
                    None
                } else {
                    let tag = distal_targets_to_sa_tag(self.read_metadata, &distal_targets)
                        .ok_or(DecodeError::UnknownContigIndex(target.contig))?;
                    Some(tag)
                };
                let is_forward_strand = read.is_forward_strand;
                BreakpointEvidence::SplitRead(SplitRead::new(
                    read,
                    is_forward_strand,
                    is_forward_strand,
                    sa_tag,
                )?)
            }
            EvidenceKind::LargeIndel | EvidenceKind::MateUnmapped if !distal_targets.is_empty() => {
                return Err(DecodeError::UnexpectedDistalTarget(kind.into()));
            }
            EvidenceKind::LargeIndel => BreakpointEvidence::LargeIndel(read),
            EvidenceKind::MateUnmapped => BreakpointEvidence::MateUnmapped(read),
            _ => {
                let pair = DiscordantPair {
                    read,
                    target,
                    target_forward_strand,
                    target_quality,
                };
                match kind {
                    EvidenceKind::InterContigPair => BreakpointEvidence::InterContigPair(pair),
                    EvidenceKind::OutiesPair => BreakpointEvidence::OutiesPair(pair),
                    EvidenceKind::SameStrandPair => BreakpointEvidence::SameStrandPair(pair),
                    _ => BreakpointEvidence::WeirdTemplateSize(pair),
                }
            }
        };
        Ok(evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint_evidence::test_utils::get_test_read_evidence;
    use crate::read_metadata::test_utils::{TEST_READ_GROUP, get_test_read_metadata};

    const MIN_EVIDENCE_MAPQ: i32 = 20;

    fn get_fixture_string_reps() -> Vec<&'static str> {
        vec![
            "0[1000:1500)\t5\tTemplateSizeAnomaly\t\t12",
            "0[2000:2007)\t1\tSplitRead\t1[5000:5007):1\tread1/1\t1\t350\t60M40S\t60",
            "0[2002:2009)\t1\tSplitRead\t2[800:807):0\tread2/2\t0\t-410\t35S65M\t55",
            "0[2003:2010)\t1\tSplitRead\t\tread3\t1\t0\t70M30S\t45",
            "0[2500:2600)\t2\tLargeIndel\t\tread4/0\t1\t380\t40M80D60M\t60",
            "0[3000:3100)\t1\tMateUnmapped\t\tread5/?\t0\t0\t100M\t37",
            "0[4000:4100)\t1\tInterContigPair\t2[9000:9100):0\tread6/1\t1\t0\t100M\t60",
            "0[4050:4150)\t1\tOutiesPair\t0[3500:3600):1\tread7/2\t0\t-700\t100M\t60",
            "0[4060:4160)\t1\tSameStrandPair\t\tread8/1\t1\t900\t100M\t12",
            "1[100:200)\t1\tWeirdTemplateSize\t1[2100:2200):0\tread9/1\t1\t2100\t100M\t60",
        ]
    }

    #[test]
    fn test_string_rep_inverts_decode() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);
        for string_rep in get_fixture_string_reps() {
            let evidence = decoder.decode(string_rep).unwrap();
            assert_eq!(evidence.string_rep(&md, MIN_EVIDENCE_MAPQ), string_rep);
        }
    }

    #[test]
    fn test_decode_inverts_string_rep() {
        use strum::IntoEnumIterator;

        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);

        // Evidence built with the values decoding fills in is recovered exactly. Sweep all
        // read strand, target strand and fragment ordinal combinations, with weights, mapping
        // qualities and template sizes varying along the sweep.
        let mapping_qualities = [0, 3, 19, 20, 21, 37, 60, 254];
        let mut index = 0;
        for is_forward_strand in [true, false] {
            for target_forward_strand in [true, false] {
                for fragment_ordinal in TemplateFragmentOrdinal::iter() {
                    for &mapping_quality in mapping_qualities.iter() {
                        check_string_rep_round_trip(
                            &md,
                            &decoder,
                            index,
                            is_forward_strand,
                            target_forward_strand,
                            fragment_ordinal,
                            mapping_quality,
                        );
                        index += 1;
                    }
                }
            }
        }
        assert_eq!(index, 160);
    }

    fn check_string_rep_round_trip(
        md: &ReadMetadata,
        decoder: &EvidenceDecoder,
        index: i32,
        is_forward_strand: bool,
        target_forward_strand: bool,
        fragment_ordinal: TemplateFragmentOrdinal,
        mapping_quality: i32,
    ) {
        let start = 1000 + 37 * index;
        let mut read = get_test_read_evidence(
            SVInterval::new(index % 3, start, start + 7 + index % 11),
            &format!("t{index}"),
            fragment_ordinal,
            is_forward_strand,
            ["30S70M", "100M", "40M2D60M", "70M30S"][(index % 4) as usize],
            mapping_quality,
            (index * 53) % 1200 - 600,
        );
        read.weight = index % 7;

        let target = StrandedInterval::new(
            SVInterval::new((index + 1) % 3, 3000 + 11 * index, 3007 + 11 * index),
            target_forward_strand,
        );
        let sa_tag = distal_targets_to_sa_tag(md, &[target]);
        let evidence_list = vec![
            BreakpointEvidence::SplitRead(
                SplitRead::new(read.clone(), is_forward_strand, is_forward_strand, sa_tag)
                    .unwrap(),
            ),
            BreakpointEvidence::SplitRead(
                SplitRead::new(read.clone(), is_forward_strand, is_forward_strand, None).unwrap(),
            ),
            BreakpointEvidence::LargeIndel(read.clone()),
            BreakpointEvidence::MateUnmapped(read.clone()),
            BreakpointEvidence::InterContigPair(DiscordantPair {
                read: read.clone(),
                target: target.interval,
                target_forward_strand: target.is_forward_strand,
                target_quality: EXACT_TARGET_QUALITY,
            }),
            BreakpointEvidence::OutiesPair(DiscordantPair {
                read: read.clone(),
                target: SVInterval::new(0, 0, 0),
                target_forward_strand: false,
                target_quality: NO_TARGET_QUALITY,
            }),
            BreakpointEvidence::SameStrandPair(DiscordantPair {
                read: read.clone(),
                target: target.interval,
                target_forward_strand: target.is_forward_strand,
                target_quality: EXACT_TARGET_QUALITY,
            }),
            BreakpointEvidence::WeirdTemplateSize(DiscordantPair {
                read,
                target: target.interval,
                target_forward_strand: target.is_forward_strand,
                target_quality: EXACT_TARGET_QUALITY,
            }),
            BreakpointEvidence::TemplateSizeAnomaly(TemplateSizeAnomaly {
                location: SVInterval::new(1, 100 * index, 100 * index + 500),
                weight: 3 + index % 5,
                read_count: 7 * index,
            }),
        ];

        for evidence in evidence_list {
            let string_rep = evidence.string_rep(md, MIN_EVIDENCE_MAPQ);
            assert_eq!(decoder.decode(&string_rep).unwrap(), evidence, "{string_rep}");
        }
    }

    #[test]
    fn test_decode_fragment_ordinals() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);
        let expected = [
            ("read", TemplateFragmentOrdinal::Unpaired),
            ("read/", TemplateFragmentOrdinal::Unpaired),
            ("read/0", TemplateFragmentOrdinal::PairedInterior),
            ("read/1", TemplateFragmentOrdinal::PairedFirst),
            ("read/2", TemplateFragmentOrdinal::PairedSecond),
            ("read/?", TemplateFragmentOrdinal::PairedUnknown),
        ];
        for (label, ordinal) in expected {
            let string_rep = format!("0[10:20)\t1\tMateUnmapped\t\t{label}\t1\t0\t10M\t60");
            let evidence = decoder.decode(&string_rep).unwrap();
            let read = evidence.read_evidence().unwrap();
            assert_eq!(read.template_name, "read");
            assert_eq!(read.fragment_ordinal, ordinal);
        }

        let string_rep = "0[10:20)\t1\tMateUnmapped\t\tread/3\t1\t0\t10M\t60";
        assert_eq!(
            decoder.decode(string_rep),
            Err(DecodeError::UnknownFragmentOrdinal("3".to_string()))
        );
    }

    #[test]
    fn test_decode_too_many_distal_targets() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);
        for kind in ["SplitRead", "InterContigPair"] {
            let string_rep = format!(
                "0[10:20)\t1\t{kind}\t1[5000:5007):1;2[800:807):0\tr/1\t1\t0\t10M\t60"
            );
            assert_eq!(
                decoder.decode(&string_rep),
                Err(DecodeError::Evidence(EvidenceError::TooManyDistalTargets(2)))
            );
        }
    }

    #[test]
    fn test_decode_errors() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);

        assert_eq!(
            decoder.decode("0[10:20)\t1\tBogusEvidence\t\tr/1\t1\t0\t10M\t60"),
            Err(DecodeError::UnknownEvidenceType("BogusEvidence".to_string()))
        );
        assert_eq!(
            decoder.decode("0[10:20)\t1\tLargeIndel\t1[5000:5007):1\tr/1\t1\t0\t10M\t60"),
            Err(DecodeError::UnexpectedDistalTarget("LargeIndel"))
        );
        assert_eq!(
            decoder.decode("0[10:20)\t1\tLargeIndel\t\tr/1"),
            Err(DecodeError::FieldCount {
                expected: 9,
                found: 5
            })
        );
        assert_eq!(
            decoder.decode("0:10-20\t1\tTemplateSizeAnomaly\t\t3"),
            Err(DecodeError::malformed("location", "0:10-20"))
        );
        assert_eq!(
            decoder.decode("0[10:20)\tx\tTemplateSizeAnomaly\t\t3"),
            Err(DecodeError::malformed("weight", "x"))
        );
        assert_eq!(
            decoder.decode("0[10:20)\t1\tSplitRead\t9[5000:5007):1\tr/1\t1\t0\t10M\t60"),
            Err(DecodeError::UnknownContigIndex(9))
        );
    }

    #[test]
    fn test_decode_accepts_closed_bracket_location() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);
        let evidence = decoder
            .decode("0[10:20]\t1\tTemplateSizeAnomaly\t\t3\n")
            .unwrap();
        assert_eq!(*evidence.location(), SVInterval::new(0, 10, 20));
    }

    #[test]
    fn test_decode_template_size_anomaly_rejects_distal_targets() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);
        assert_eq!(
            decoder.decode("0[10:20)\t1\tTemplateSizeAnomaly\t1[5000:5007):1\t3"),
            Err(DecodeError::UnexpectedDistalTarget("TemplateSizeAnomaly"))
        );
        assert_eq!(
            decoder.decode("0[10:20)\t1\tTemplateSizeAnomaly\t1[5000:5007):1;2[800:807):0\t3"),
            Err(DecodeError::Evidence(EvidenceError::TooManyDistalTargets(2)))
        );
    }

    #[test]
    fn test_decode_rejects_empty_intervals_and_negative_weight() {
        let md = get_test_read_metadata();
        let decoder = EvidenceDecoder::new(&md, TEST_READ_GROUP);
        for location in ["0[20:10)", "0[10:10)"] {
            assert_eq!(
                decoder.decode(&format!("{location}\t1\tTemplateSizeAnomaly\t\t3")),
                Err(DecodeError::EmptyInterval {
                    label: "location",
                    value: location.to_string()
                })
            );
        }
        assert_eq!(
            decoder.decode("0[10:20)\t1\tInterContigPair\t2[900:800):1\tr/1\t1\t0\t10M\t60"),
            Err(DecodeError::EmptyInterval {
                label: "distal target",
                value: "2[900:800):1".to_string()
            })
        );
        assert_eq!(
            decoder.decode("0[10:20)\t-5\tTemplateSizeAnomaly\t\t3"),
            Err(DecodeError::NegativeWeight(-5))
        );

        // Zero weight is allowed
        assert!(decoder.decode("0[10:20)\t0\tTemplateSizeAnomaly\t\t3").is_ok());
    }
}
