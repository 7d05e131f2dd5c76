//! Read and write breakpoint evidence text files
//!
//! Files hold one evidence record per line in the tab-delimited evidence text format. Files with
//! a '.gz' extension are gzip-compressed. Blank lines and lines starting with '#' are skipped.
//!

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use camino::Utf8Path;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use log::info;
use thousands::Separable;
use unwrap::unwrap;

use crate::breakpoint_evidence::BreakpointEvidence;
use crate::errors::EvidenceFileError;
use crate::evidence_codec::EvidenceDecoder;
use crate::read_metadata::ReadMetadata;

fn is_gzip_filename(filename: &Utf8Path) -> bool {
    filename.extension() == Some("gz")
}

fn open_evidence_reader(filename: &Utf8Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(filename)?;
    Ok(if is_gzip_filename(filename) {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Read all evidence records from a text file, in file order
///
pub fn read_evidence_file(
    filename: &Utf8Path,
    decoder: &EvidenceDecoder,
) -> Result<Vec<BreakpointEvidence>, EvidenceFileError> {
    info!("Reading breakpoint evidence from file: '{filename}'");

    let io_error = |source| EvidenceFileError::Io {
        source,
        path: filename.as_std_path().to_path_buf(),
    };
    let reader = open_evidence_reader(filename).map_err(io_error)?;
    let mut evidence = Vec::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let x = decoder
            .decode(&line)
            .map_err(|source| EvidenceFileError::Decode {
                source,
                path: filename.as_std_path().to_path_buf(),
                line_number: line_index + 1,
            })?;
        evidence.push(x);
    }

    info!(
        "Read {} breakpoint evidence records",
        evidence.len().separate_with_commas()
    );
    Ok(evidence)
}

/// Write evidence records to a text file
///
pub fn write_evidence_file<'a>(
    filename: &Utf8Path,
    evidence: impl IntoIterator<Item = &'a BreakpointEvidence>,
    read_metadata: &ReadMetadata,
    min_evidence_mapq: i32,
) {
    info!("Writing breakpoint evidence to file: '{filename}'");

    let f = unwrap!(
        File::create(filename),
        "Unable to create evidence file: '{}'",
        filename
    );
    let mut writer: Box<dyn Write> = if is_gzip_filename(filename) {
        Box::new(BufWriter::new(GzEncoder::new(f, Compression::default())))
    } else {
        Box::new(BufWriter::new(f))
    };
    for x in evidence {
        unwrap!(
            writeln!(writer, "{}", x.string_rep(read_metadata, min_evidence_mapq)),
            "Unable to write to evidence file: '{}'",
            filename
        );
    }
    unwrap!(
        writer.flush(),
        "Unable to write to evidence file: '{}'",
        filename
    );
}
