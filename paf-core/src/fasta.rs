//! Loading FASTA sequences by name, for tools (`add_mismatches`, `view`)
//! that need the underlying bases an alignment record refers to.

use std::collections::HashMap;
use std::path::Path;

use needletail::parse_fastx_file;

use crate::error::{PafError, Result};

/// Load every record across `paths` into a name -> sequence map.
///
/// Sequence names are taken up to the first whitespace in the FASTA header,
/// matching the convention PAF query/target names follow. If the same name
/// appears more than once (across or within files), the first occurrence
/// wins and a warning is logged — later copies are assumed to be
/// incidental duplicates, not an intentional override.
pub fn load_sequences<P: AsRef<Path>>(paths: &[P]) -> Result<HashMap<String, Vec<u8>>> {
    let mut sequences = HashMap::new();
    for path in paths {
        let path = path.as_ref();
        let mut reader = parse_fastx_file(path)
            .map_err(|e| PafError::Io(std::io::Error::other(format!("{}: {e}", path.display()))))?;

        while let Some(record) = reader.next() {
            let record = record
                .map_err(|e| PafError::Io(std::io::Error::other(format!("{}: {e}", path.display()))))?;
            let id = record.id();
            let name = std::str::from_utf8(id)
                .map_err(|e| PafError::InvalidRecord(format!("non-utf8 fasta header: {e}")))?
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_string();

            if sequences.contains_key(&name) {
                log::warn!("duplicate sequence name '{name}' in {}; keeping the first occurrence", path.display());
                continue;
            }
            sequences.insert(name, record.seq().into_owned());
        }
    }
    Ok(sequences)
}

/// Look up `name` in `sequences`, or return a `MissingSequence` error —
/// the error `add_mismatches`/`view` surface when a record names a
/// sequence absent from the FASTA files they were given.
pub fn require_sequence<'a>(
    sequences: &'a HashMap<String, Vec<u8>>,
    name: &str,
) -> Result<&'a [u8]> {
    sequences
        .get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| PafError::MissingSequence(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fasta(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_multiple_records() {
        let f = write_fasta(">chr1 some description\nACGT\n>chr2\nTTTT\n");
        let sequences = load_sequences(&[f.path()]).unwrap();
        assert_eq!(sequences.get("chr1").unwrap(), b"ACGT");
        assert_eq!(sequences.get("chr2").unwrap(), b"TTTT");
    }

    #[test]
    fn require_sequence_reports_missing_name() {
        let sequences = HashMap::new();
        assert!(require_sequence(&sequences, "chr1").is_err());
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_name() {
        let f = write_fasta(">chr1\nACGT\n>chr1\nGGGG\n");
        let sequences = load_sequences(&[f.path()]).unwrap();
        assert_eq!(sequences.get("chr1").unwrap(), b"ACGT");
    }
}
