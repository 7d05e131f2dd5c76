//! Classifier-based filtering of structural variant breakpoint evidence
//!
//! Breakpoint evidence records are converted to feature vectors using their neighbors in the
//! evidence stream, then scored by a gradient-boosted tree classifier. Only evidence scored above
//! the threshold probability is kept.
//!

pub mod breakpoint_evidence;
pub mod cigar_utils;
pub mod classifier;
pub mod errors;
pub mod evidence_codec;
pub mod evidence_features;
pub mod evidence_filter;
pub mod evidence_io;
pub mod feature_extractor;
pub mod filter_settings;
pub mod globals;
pub mod library_stats;
pub mod partition_crossing;
pub mod partitioned_filter;
pub mod prob_utils;
pub mod read_metadata;
pub mod run_stats;
pub mod sa_tag;
pub mod sv_interval;
