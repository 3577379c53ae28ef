//! Structural validation of PAF records: coordinate bounds and, when an
//! operation string is present, agreement between the coordinates and the
//! spans the operations actually consume.

use crate::error::{PafError, Result};
use crate::record::{AlignmentType, Record};

/// Validate a record's coordinates and, if its operation string is parsed,
/// cross-check the coordinates against it. Returns the first violation
/// found, wrapped in `PafError::InvalidRecord`.
pub fn check(record: &Record) -> Result<()> {
    check_coordinates(
        "query",
        record.query_start,
        record.query_end,
        record.query_length,
    )?;
    check_coordinates(
        "target",
        record.target_start,
        record.target_end,
        record.target_length,
    )?;

    if record.alignment_type == Some(AlignmentType::Secondary) && record.tile_level == Some(1) {
        return Err(PafError::InvalidRecord(
            "explicit secondary (tp:A:S) type is inconsistent with tile_level == 1 (primary)".into(),
        ));
    }

    if let Some(cigar) = record.cigar.as_ref().and_then(|c| c.as_parsed()) {
        let mut query_consumed: u64 = 0;
        let mut target_consumed: u64 = 0;
        for op in cigar.iter() {
            if op.op.consumes_query() {
                query_consumed += op.length;
            }
            if op.op.consumes_target() {
                target_consumed += op.length;
            }
        }

        let query_span = record.query_span();
        if query_consumed != query_span {
            return Err(PafError::InvalidRecord(format!(
                "cigar consumes {query_consumed} query bases but the record spans {query_span}"
            )));
        }
        let target_span = record.target_span();
        if target_consumed != target_span {
            return Err(PafError::InvalidRecord(format!(
                "cigar consumes {target_consumed} target bases but the record spans {target_span}"
            )));
        }
    }

    Ok(())
}

fn check_coordinates(label: &str, start: u64, end: u64, length: u64) -> Result<()> {
    if start >= length {
        return Err(PafError::InvalidRecord(format!(
            "{label}_start ({start}) >= {label}_length ({length})"
        )));
    }
    if start > end {
        return Err(PafError::InvalidRecord(format!(
            "{label}_start ({start}) > {label}_end ({end})"
        )));
    }
    if end > length {
        return Err(PafError::InvalidRecord(format!(
            "{label}_end ({end}) > {label}_length ({length})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::Cigar;
    use crate::record::CigarField;

    fn base() -> Record {
        Record {
            query_name: "q".into(),
            query_length: 100,
            query_start: 0,
            query_end: 10,
            same_strand: true,
            target_name: "t".into(),
            target_length: 100,
            target_start: 0,
            target_end: 10,
            num_matches: 10,
            num_bases: 10,
            mapping_quality: 60,
            alignment_type: None,
            score: None,
            tile_level: None,
            chain_id: None,
            chain_score: None,
            cigar: None,
        }
    }

    #[test]
    fn valid_record_passes() {
        assert!(check(&base()).is_ok());
    }

    #[test]
    fn explicit_secondary_with_primary_tile_level_is_rejected() {
        let mut r = base();
        r.alignment_type = Some(AlignmentType::Secondary);
        r.tile_level = Some(1);
        assert!(check(&r).is_err());
    }

    #[test]
    fn explicit_secondary_with_other_tile_level_passes() {
        let mut r = base();
        r.alignment_type = Some(AlignmentType::Secondary);
        r.tile_level = Some(2);
        assert!(check(&r).is_ok());
    }

    #[test]
    fn end_past_length_is_rejected() {
        let mut r = base();
        r.query_end = 200;
        assert!(check(&r).is_err());
    }

    #[test]
    fn start_past_end_is_rejected() {
        let mut r = base();
        r.query_start = 50;
        r.query_end = 10;
        assert!(check(&r).is_err());
    }

    #[test]
    fn start_equal_to_length_is_rejected() {
        let mut r = base();
        r.query_start = 100;
        r.query_end = 100;
        assert!(check(&r).is_err());
    }

    #[test]
    fn cigar_span_mismatch_is_rejected() {
        let mut r = base();
        r.cigar = Some(CigarField::Parsed(Cigar::parse("5M").unwrap()));
        assert!(check(&r).is_err());
    }

    #[test]
    fn cigar_span_agreement_passes() {
        let mut r = base();
        r.cigar = Some(CigarField::Parsed(Cigar::parse("10M").unwrap()));
        assert!(check(&r).is_ok());
    }

    #[test]
    fn indels_counted_on_correct_side() {
        let mut r = base();
        // 6 aligned + 4 deletion = 10 target bases, but only 6 query bases.
        r.query_end = 6;
        r.cigar = Some(CigarField::Parsed(Cigar::parse("6M4D").unwrap()));
        assert!(check(&r).is_ok());
    }
}
