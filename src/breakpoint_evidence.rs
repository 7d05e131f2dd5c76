//! Breakpoint evidence data model and its canonical textual representation
//!

use std::fmt;

use itertools::Itertools;

use crate::errors::EvidenceError;
use crate::read_metadata::ReadMetadata;
use crate::sa_tag::{get_distal_target, parse_sa_tag};
use crate::sv_interval::{SVInterval, StrandedInterval};

/// Absent target quality for discordant pair evidence without a distal target
pub const NO_TARGET_QUALITY: i32 = -1;

/// Target quality assigned to discordant pair evidence with an exactly known distal target
pub const EXACT_TARGET_QUALITY: i32 = i32::MAX;

/// Which end of a paired template a read represents
///
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum::EnumCount, strum::EnumIter)]
pub enum TemplateFragmentOrdinal {
    #[default]
    Unpaired,
    PairedInterior,
    PairedFirst,
    PairedSecond,
    PairedUnknown,
}

impl TemplateFragmentOrdinal {
    /// Suffix appended to the template name in the textual representation
    pub fn suffix(&self) -> &'static str {
        use TemplateFragmentOrdinal::*;
        match self {
            Unpaired => "",
            PairedInterior => "/0",
            PairedFirst => "/1",
            PairedSecond => "/2",
            PairedUnknown => "/?",
        }
    }

    /// Parse the code following the '/' in a template name
    pub fn from_code(code: &str) -> Option<Self> {
        use TemplateFragmentOrdinal::*;
        match code {
            "0" => Some(PairedInterior),
            "1" => Some(PairedFirst),
            "2" => Some(PairedSecond),
            "?" => Some(PairedUnknown),
            _ => None,
        }
    }
}

/// Discriminator for each evidence variant
///
/// The string form of each kind is used as the type field of the textual evidence representation.
///
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    strum::AsRefStr,
    strum::Display,
    strum::EnumCount,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum EvidenceKind {
    TemplateSizeAnomaly,
    SplitRead,
    LargeIndel,
    MateUnmapped,
    InterContigPair,
    OutiesPair,
    SameStrandPair,
    WeirdTemplateSize,
}

/// Fields shared by all evidence derived from a single read alignment
///
#[derive(Clone, Debug, PartialEq)]
pub struct ReadEvidence {
    pub location: SVInterval,
    pub weight: i32,
    pub template_name: String,
    pub fragment_ordinal: TemplateFragmentOrdinal,
    pub validated: bool,
    pub is_forward_strand: bool,
    pub cigar: String,
    pub mapping_quality: i32,
    pub template_size: i32,
    pub read_group: String,
}

impl ReadEvidence {
    /// The template name with its fragment ordinal suffix, as used in the textual representation
    pub fn template_label(&self) -> String {
        format!("{}{}", self.template_name, self.fragment_ordinal.suffix())
    }
}

/// Evidence of a cluster of reads with anomalous template sizes
///
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateSizeAnomaly {
    pub location: SVInterval,
    pub weight: i32,
    pub read_count: i32,
}

/// Split read alignment evidence
///
/// The distal target is found from the supplementary alignment tag, which can describe at most
/// one supplementary alignment.
///
#[derive(Clone, Debug, PartialEq)]
pub struct SplitRead {
    read: ReadEvidence,
    primary_alignment_clipped_at_start: bool,
    primary_alignment_forward_strand: bool,
    sa_tag: Option<String>,
}

impl SplitRead {
    pub fn new(
        read: ReadEvidence,
        primary_alignment_clipped_at_start: bool,
        primary_alignment_forward_strand: bool,
        sa_tag: Option<String>,
    ) -> Result<Self, EvidenceError> {
        if let Some(sa_tag) = &sa_tag {
            let segment_count = parse_sa_tag(sa_tag)?.len();
            if segment_count > 1 {
                return Err(EvidenceError::TooManyDistalTargets(segment_count));
            }
        }
        Ok(Self {
            read,
            primary_alignment_clipped_at_start,
            primary_alignment_forward_strand,
            sa_tag,
        })
    }

    pub fn read(&self) -> &ReadEvidence {
        &self.read
    }

    pub fn primary_alignment_clipped_at_start(&self) -> bool {
        self.primary_alignment_clipped_at_start
    }

    pub fn primary_alignment_forward_strand(&self) -> bool {
        self.primary_alignment_forward_strand
    }

    pub fn sa_tag(&self) -> Option<&str> {
        self.sa_tag.as_deref()
    }

    fn distal_targets(
        &self,
        read_metadata: &ReadMetadata,
        min_evidence_mapq: i32,
    ) -> Vec<StrandedInterval> {
        let Some(sa_tag) = &self.sa_tag else {
            return Vec::new();
        };

        // The tag was validated on construction
        let segments = parse_sa_tag(sa_tag).unwrap_or_default();
        segments
            .iter()
            .filter(|x| x.mapq >= min_evidence_mapq)
            .filter_map(|x| {
                get_distal_target(
                    read_metadata,
                    x,
                    self.primary_alignment_clipped_at_start,
                    self.primary_alignment_forward_strand,
                )
            })
            .collect()
    }
}

/// Read pair evidence with a (possibly absent) distal target at the mate location
///
#[derive(Clone, Debug, PartialEq)]
pub struct DiscordantPair {
    pub read: ReadEvidence,
    pub target: SVInterval,
    pub target_forward_strand: bool,

    /// Quality of the target mapping, or NO_TARGET_QUALITY if there is no target
    pub target_quality: i32,
}

impl DiscordantPair {
    fn distal_targets(
        &self,
        read_metadata: &ReadMetadata,
        min_evidence_mapq: i32,
    ) -> Vec<StrandedInterval> {
        if self.target_quality < min_evidence_mapq
            || read_metadata.ignore_cross_contig(self.target.contig)
        {
            Vec::new()
        } else {
            vec![StrandedInterval::new(
                self.target,
                self.target_forward_strand,
            )]
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BreakpointEvidence {
    TemplateSizeAnomaly(TemplateSizeAnomaly),
    SplitRead(SplitRead),
    LargeIndel(ReadEvidence),
    MateUnmapped(ReadEvidence),
    InterContigPair(DiscordantPair),
    OutiesPair(DiscordantPair),
    SameStrandPair(DiscordantPair),
    WeirdTemplateSize(DiscordantPair),
}

impl BreakpointEvidence {
    pub fn kind(&self) -> EvidenceKind {
        match self {
            Self::TemplateSizeAnomaly(_) => EvidenceKind::TemplateSizeAnomaly,
            Self::SplitRead(_) => EvidenceKind::SplitRead,
            Self::LargeIndel(_) => EvidenceKind::LargeIndel,
            Self::MateUnmapped(_) => EvidenceKind::MateUnmapped,
            Self::InterContigPair(_) => EvidenceKind::InterContigPair,
            Self::OutiesPair(_) => EvidenceKind::OutiesPair,
            Self::SameStrandPair(_) => EvidenceKind::SameStrandPair,
            Self::WeirdTemplateSize(_) => EvidenceKind::WeirdTemplateSize,
        }
    }

    /// Read alignment fields, available for every kind except TemplateSizeAnomaly
    pub fn read_evidence(&self) -> Option<&ReadEvidence> {
        match self {
            Self::TemplateSizeAnomaly(_) => None,
            Self::SplitRead(SplitRead { read, .. })
            | Self::LargeIndel(read)
            | Self::MateUnmapped(read)
            | Self::InterContigPair(DiscordantPair { read, .. })
            | Self::OutiesPair(DiscordantPair { read, .. })
            | Self::SameStrandPair(DiscordantPair { read, .. })
            | Self::WeirdTemplateSize(DiscordantPair { read, .. }) => Some(read),
        }
    }

    pub fn location(&self) -> &SVInterval {
        match self {
            Self::TemplateSizeAnomaly(x) => &x.location,
            Self::SplitRead(SplitRead { read, .. })
            | Self::LargeIndel(read)
            | Self::MateUnmapped(read)
            | Self::InterContigPair(DiscordantPair { read, .. })
            | Self::OutiesPair(DiscordantPair { read, .. })
            | Self::SameStrandPair(DiscordantPair { read, .. })
            | Self::WeirdTemplateSize(DiscordantPair { read, .. }) => &read.location,
        }
    }

    pub fn weight(&self) -> i32 {
        match self {
            Self::TemplateSizeAnomaly(x) => x.weight,
            Self::SplitRead(SplitRead { read, .. })
            | Self::LargeIndel(read)
            | Self::MateUnmapped(read)
            | Self::InterContigPair(DiscordantPair { read, .. })
            | Self::OutiesPair(DiscordantPair { read, .. })
            | Self::SameStrandPair(DiscordantPair { read, .. })
            | Self::WeirdTemplateSize(DiscordantPair { read, .. }) => read.weight,
        }
    }

    pub fn mapping_quality(&self) -> Option<i32> {
        self.read_evidence().map(|x| x.mapping_quality)
    }

    /// Get all distal targets of this evidence passing the minimum mapping quality
    ///
    /// This will contain at most one target
    ///
    pub fn distal_targets(
        &self,
        read_metadata: &ReadMetadata,
        min_evidence_mapq: i32,
    ) -> Vec<StrandedInterval> {
        match self {
            Self::TemplateSizeAnomaly(_) | Self::LargeIndel(_) | Self::MateUnmapped(_) => Vec::new(),
            Self::SplitRead(x) => x.distal_targets(read_metadata, min_evidence_mapq),
            Self::InterContigPair(x)
            | Self::OutiesPair(x)
            | Self::SameStrandPair(x)
            | Self::WeirdTemplateSize(x) => x.distal_targets(read_metadata, min_evidence_mapq),
        }
    }

    /// Canonical tab-delimited representation of the evidence
    ///
    /// Fields are:
    /// 0. location
    /// 1. weight
    /// 2. evidence kind
    /// 3. ';'-joined distal targets
    ///
    /// ...followed by the read count for TemplateSizeAnomaly, and otherwise:
    /// 4. template name with fragment ordinal suffix
    /// 5. strand bit
    /// 6. template size
    /// 7. cigar
    /// 8. mapping quality
    ///
    pub fn string_rep(&self, read_metadata: &ReadMetadata, min_evidence_mapq: i32) -> String {
        let distal_targets = self
            .distal_targets(read_metadata, min_evidence_mapq)
            .iter()
            .join(";");
        let prefix = format!(
            "{}\t{}\t{}\t{}",
            self.location(),
            self.weight(),
            self.kind(),
            distal_targets
        );
        match (self, self.read_evidence()) {
            (Self::TemplateSizeAnomaly(x), _) => format!("{prefix}\t{}", x.read_count),
            (_, Some(read)) => format!(
                "{prefix}\t{}\t{}\t{}\t{}\t{}",
                read.template_label(),
                if read.is_forward_strand { 1 } else { 0 },
                read.template_size,
                read.cigar,
                read.mapping_quality
            ),
            (_, None) => prefix,
        }
    }
}

impl fmt::Display for BreakpointEvidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.location())?;
        if let Some(read) = self.read_evidence() {
            write!(f, " {}", read.template_label())?;
        }
        Ok(())
    }
}
