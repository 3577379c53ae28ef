//! Chunk-header intervals: `<name>|<length>|<start>` headers produced by
//! sequence-chunking tools upstream of this toolset, and the ordering used
//! to sort them back into genomic order.

use std::cmp::Ordering;

use crate::error::{PafError, Result};

/// An interval decoded from a chunk header: `name` is whatever preceded the
/// last two `|`-delimited fields, `start`/`length` are those two fields,
/// and `end` is their sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub name: String,
    pub start: i64,
    pub length: i64,
    pub end: i64,
}

/// Split a chunk header of the form `<name>|<length>|<start>` into an
/// `Interval`. `name` may itself contain `|` characters — only the last
/// two fields are consumed as `length` and `start`; everything before
/// them is rejoined (with `|`) as the name.
pub fn decode_fasta_header(header: &str) -> Result<Interval> {
    let parts: Vec<&str> = header.split('|').collect();
    if parts.len() < 3 {
        return Err(PafError::ReadRecord(format!(
            "expected a '<name>|<length>|<start>' chunk header, got: {header}"
        )));
    }
    let start: i64 = parts[parts.len() - 1]
        .parse()
        .map_err(|_| PafError::ReadRecord(format!("invalid start field in chunk header: {header}")))?;
    let length: i64 = parts[parts.len() - 2]
        .parse()
        .map_err(|_| PafError::ReadRecord(format!("invalid length field in chunk header: {header}")))?;
    let name = parts[..parts.len() - 2].join("|");

    Ok(Interval {
        name,
        start,
        length,
        end: start + length,
    })
}

/// Order intervals by name (lexicographic), then by start (numeric).
pub fn cmp_intervals(a: &Interval, b: &Interval) -> Ordering {
    a.name.cmp(&b.name).then(a.start.cmp(&b.start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_header() {
        let i = decode_fasta_header("chr1|1000|500").unwrap();
        assert_eq!(i.name, "chr1");
        assert_eq!(i.length, 1000);
        assert_eq!(i.start, 500);
        assert_eq!(i.end, 1500);
    }

    #[test]
    fn name_may_contain_pipes() {
        let i = decode_fasta_header("chr1|extra|1000|500").unwrap();
        assert_eq!(i.name, "chr1|extra");
        assert_eq!(i.start, 500);
        assert_eq!(i.length, 1000);
    }

    #[test]
    fn rejects_too_few_fields() {
        assert!(decode_fasta_header("chr1|1000").is_err());
    }

    #[test]
    fn rejects_non_numeric_fields() {
        assert!(decode_fasta_header("chr1|abc|500").is_err());
    }

    #[test]
    fn ordering_is_name_then_start() {
        let a = Interval { name: "a".into(), start: 100, length: 10, end: 110 };
        let b = Interval { name: "a".into(), start: 50, length: 10, end: 60 };
        let c = Interval { name: "b".into(), start: 0, length: 10, end: 10 };
        assert_eq!(cmp_intervals(&b, &a), Ordering::Less);
        assert_eq!(cmp_intervals(&a, &c), Ordering::Less);
    }
}
