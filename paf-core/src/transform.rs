//! Coordinate- and operation-string-level transformations: inversion,
//! shattering into per-base matches, end trimming, and mismatch
//! encoding/decoding.
//!
//! The trimming and identity-threshold algorithms are ports of the
//! reference toolset's `paf_trim_ends`/`paf_trim_unreliable_tails` family,
//! adapted to operate on the windowed `Cigar` instead of an in-place
//! linked list.

use crate::cigar::{Cigar, CigarOp, OpKind};
use crate::error::{PafError, Result};
use crate::record::{CigarField, Record};

fn parsed_cigar(record: &Record, op: &str) -> Result<&Cigar> {
    record
        .cigar
        .as_ref()
        .and_then(|c| c.as_parsed())
        .ok_or_else(|| PafError::InvalidRecord(format!("{op} requires a parsed cigar")))
}

/// Swap query and target (name, length, coordinates), and the operation
/// string's query-insert/query-delete ops, reversing the operation order
/// when the strands differ. Leaves `same_strand` untouched, matching the
/// reference behavior — a record's strand describes the query/target
/// relationship, which is symmetric under this swap.
///
/// A raw (unparsed) cigar string is left as-is beyond the coordinate swap;
/// re-parse it first if the inverted record's operation string matters.
pub fn invert(record: &mut Record) {
    record.swap_query_target();

    match &mut record.cigar {
        Some(CigarField::Parsed(cigar)) => {
            for i in 0..cigar.len() {
                if let Some(op) = cigar.get_mut(i) {
                    op.op = match op.op {
                        OpKind::QueryInsert => OpKind::QueryDelete,
                        OpKind::QueryDelete => OpKind::QueryInsert,
                        other => other,
                    };
                }
            }
            if !record.same_strand {
                cigar.reverse();
            }
        }
        Some(CigarField::Raw(_)) => {
            log::warn!("invert: operation string is raw text and was not updated; re-parse it before relying on it");
        }
        None => {}
    }
}

/// Total aligned (non-gap) columns: the sum of `M`/`=`/`X` run lengths.
pub fn aligned_base_count(cigar: &Cigar) -> u64 {
    cigar
        .iter()
        .filter(|op| op.op.is_aligned())
        .map(|op| op.length)
        .sum()
}

fn apply_signed(coord: &mut u64, sign: i64, length: u64) {
    if sign >= 0 {
        *coord += length;
    } else {
        *coord -= length;
    }
}

/// Trim `end_bases_to_trim` aligned columns from the front of `cigar`,
/// advancing `query_coord`/`target_coord` by however many query/target
/// bases that consumes (including any leading gap ops, which are always
/// consumed in full regardless of the trim target).
fn cigar_trim(
    query_coord: &mut u64,
    target_coord: &mut u64,
    cigar: &mut Cigar,
    end_bases_to_trim: u64,
    q_sign: i64,
    t_sign: i64,
) {
    let mut bases_trimmed: u64 = 0;
    loop {
        let front = match cigar.first() {
            Some(f) => *f,
            None => break,
        };
        if front.op.is_aligned() && bases_trimmed >= end_bases_to_trim {
            break;
        }
        if front.op.is_aligned() {
            if bases_trimmed + front.length > end_bases_to_trim {
                let i = end_bases_to_trim - bases_trimmed;
                cigar.get_mut(0).expect("front just peeked").length -= i;
                apply_signed(query_coord, q_sign, i);
                apply_signed(target_coord, t_sign, i);
                break;
            }
            bases_trimmed += front.length;
            apply_signed(query_coord, q_sign, front.length);
            apply_signed(target_coord, t_sign, front.length);
        } else if front.op == OpKind::QueryInsert {
            apply_signed(query_coord, q_sign, front.length);
        } else {
            apply_signed(target_coord, t_sign, front.length);
        }
        cigar.drop_front(1);
    }
}

/// Trim `end_bases_to_trim` aligned columns from each end of a record,
/// adjusting coordinates by the strand-appropriate sign convention.
pub fn trim_ends(record: &mut Record, end_bases_to_trim: u64) -> Result<()> {
    let same_strand = record.same_strand;
    let cigar = match &mut record.cigar {
        Some(CigarField::Parsed(c)) => c,
        _ => return Err(PafError::InvalidRecord("trim_ends requires a parsed cigar".into())),
    };

    if same_strand {
        cigar_trim(&mut record.query_start, &mut record.target_start, cigar, end_bases_to_trim, 1, 1);
        cigar.reverse();
        cigar_trim(&mut record.query_end, &mut record.target_end, cigar, end_bases_to_trim, -1, -1);
        cigar.reverse();
    } else {
        cigar_trim(&mut record.query_end, &mut record.target_start, cigar, end_bases_to_trim, -1, 1);
        cigar.reverse();
        cigar_trim(&mut record.query_start, &mut record.target_end, cigar, end_bases_to_trim, 1, -1);
        cigar.reverse();
    }
    Ok(())
}

/// Trim `fraction` of the alignment's aligned bases, split evenly between
/// the two ends (so `fraction = 1.0` removes the whole alignment).
pub fn trim_end_fraction(record: &mut Record, fraction: f64) -> Result<()> {
    assert!((0.0..=1.0).contains(&fraction), "fraction must be in [0, 1]");
    let cigar = parsed_cigar(record, "trim_end_fraction")?;
    let aligned = aligned_base_count(cigar);
    let end_bases_to_trim = ((aligned as f64) * fraction / 2.0) as u64;
    trim_ends(record, end_bases_to_trim)
}

/// Scan `cigar` left to right accumulating match/mismatch totals (indels
/// and explicit mismatches both count as mismatches), returning the index
/// of the longest prefix whose cumulative identity satisfies the
/// threshold (`< threshold` if `less_than`, else `>= threshold`), along
/// with the totals over the scanned portion. The scan stops once the
/// cumulative column count exceeds `max_trim`, if given.
///
/// The identity ratio is computed in `f32`, matching the reference
/// implementation's `(float)matches / (matches + mismatches)` bit for
/// bit — the trim-by-identity tests carry the same epsilon tolerance this
/// implies.
fn identity_prefix_scan(
    cigar: &Cigar,
    identity_threshold: f32,
    less_than: bool,
    max_trim: Option<u64>,
) -> (Option<usize>, i64, i64) {
    let mut matches: i64 = 0;
    let mut mismatches: i64 = 0;
    let mut trim_idx: Option<usize> = None;

    for (idx, op) in cigar.iter().enumerate() {
        if matches!(op.op, OpKind::Match | OpKind::SeqMatch) {
            matches += op.length as i64;
        } else {
            mismatches += op.length as i64;
        }
        if let Some(max_trim) = max_trim {
            if (matches + mismatches) as u64 > max_trim {
                break;
            }
        }
        let prefix_identity = matches as f32 / (matches + mismatches) as f32;
        let below_or_above = if less_than {
            prefix_identity < identity_threshold
        } else {
            prefix_identity >= identity_threshold
        };
        if below_or_above {
            trim_idx = Some(idx);
        }
    }
    (trim_idx, matches, mismatches)
}

/// Drop the first `trim_count` operations, adjusting coordinates by the
/// query/target bases they consumed.
fn trim_upto(record: &mut Record, trim_count: usize) -> Result<()> {
    let mut target_delta: u64 = 0;
    let mut query_delta: u64 = 0;
    {
        let cigar = parsed_cigar(record, "trim_upto")?;
        for i in 0..trim_count {
            let r = *cigar
                .get(i)
                .ok_or_else(|| PafError::InvalidRecord("trim_count exceeds cigar length".into()))?;
            if r.op != OpKind::QueryInsert {
                target_delta += r.length;
            }
            if r.op != OpKind::QueryDelete {
                query_delta += r.length;
            }
        }
    }

    record.target_start += target_delta;
    if record.same_strand {
        record.query_start += query_delta;
    } else {
        record.query_end -= query_delta;
    }
    if let Some(CigarField::Parsed(cigar)) = record.cigar.as_mut() {
        cigar.drop_front(trim_count);
    }
    Ok(())
}

/// Trim a prefix with identity below `identity_threshold`, then re-include
/// as much of it as needed to bring the kept prefix's identity back up to
/// at least `identity` (the original alignment's overall identity). Never
/// considers a prefix longer than `max_trim` columns.
fn trim_unreliable_prefix(
    record: &mut Record,
    identity_threshold: f32,
    identity: f32,
    max_trim: Option<u64>,
) -> Result<()> {
    let trim_idx = {
        let cigar = parsed_cigar(record, "trim_unreliable_prefix")?;
        identity_prefix_scan(cigar, identity_threshold, true, max_trim).0
    };
    let trim_idx = match trim_idx {
        Some(i) => i,
        None => return Ok(()),
    };

    let mut suffix_matches: i64 = 0;
    let mut suffix_mismatches: i64 = 0;
    let mut best_suffix_start: Option<usize> = None;
    {
        let cigar = parsed_cigar(record, "trim_unreliable_prefix")?;
        for i in (0..=trim_idx).rev() {
            let r = *cigar.get(i).expect("index within scanned prefix");
            if matches!(r.op, OpKind::Match | OpKind::SeqMatch) {
                suffix_matches += r.length as i64;
            } else {
                suffix_mismatches += r.length as i64;
            }
            let suffix_identity = suffix_matches as f32 / (suffix_matches + suffix_mismatches) as f32;
            if suffix_identity >= identity {
                best_suffix_start = Some(i);
            }
        }
    }

    let trim_count = best_suffix_start.unwrap_or(trim_idx + 1);
    if trim_count > 0 {
        trim_upto(record, trim_count)?;
    }
    Ok(())
}

/// Trim both ends of the alignment down to a reliable core, following the
/// approach proposed by Bob Harris: compute the overall identity, find the
/// longest prefix whose identity falls significantly below it, shrink that
/// prefix back to the point where re-including a suffix of it would bring
/// its identity back up to the overall figure, trim it, then repeat on the
/// (inverted) other end using the same thresholds.
///
/// `score_fraction` sets how far below the overall identity a column run
/// must fall to be considered unreliable; `max_fraction_to_trim` bounds
/// how much of the alignment either tail trim may remove.
pub fn trim_unreliable_tails(
    record: &mut Record,
    score_fraction: f64,
    max_fraction_to_trim: f64,
) -> Result<()> {
    let (_, matches, mismatches) = {
        let cigar = parsed_cigar(record, "trim_unreliable_tails")?;
        identity_prefix_scan(cigar, 0.0, true, None)
    };
    let identity = matches as f32 / (matches + mismatches) as f32;
    let identity_threshold = identity - identity * score_fraction as f32;
    let max_trim = Some(((matches + mismatches) as f64 * max_fraction_to_trim) as u64);

    trim_unreliable_prefix(record, identity_threshold, identity, max_trim)?;
    invert(record);
    trim_unreliable_prefix(record, identity_threshold, identity, max_trim)?;
    invert(record);

    let (_, trimmed_matches, trimmed_mismatches) = {
        let cigar = parsed_cigar(record, "trim_unreliable_tails")?;
        identity_prefix_scan(cigar, 0.0, true, None)
    };
    let final_identity = trimmed_matches as f32 / (trimmed_matches + trimmed_mismatches) as f32;
    if final_identity < identity {
        log::warn!(
            "trim_unreliable_tails: final identity {final_identity:.4} fell below the starting identity {identity:.4} \
             (matches {trimmed_matches}, mismatches {trimmed_mismatches}, threshold {identity_threshold:.4})"
        );
    }
    Ok(())
}

/// Split a record into one record per `Match` (ambiguous `M`) run, each
/// carrying a single-op `M` cigar spanning exactly that run.
///
/// Only `Match` is treated as a shatter unit, matching the reference
/// implementation exactly: `SeqMatch`/`SeqMismatch` runs (as produced by
/// [`encode_mismatches`]) advance the coordinate walk like any other
/// aligned columns but are silently skipped — no shard is emitted for
/// them. This asymmetry is intentional upstream behavior, not a bug to
/// paper over.
pub fn shatter(record: &Record) -> Result<Vec<Record>> {
    let cigar = parsed_cigar(record, "shatter")?;

    let mut query_coord = if record.same_strand {
        record.query_start
    } else {
        record.query_end
    };
    let mut target_coord = record.target_start;
    let mut pieces = Vec::new();

    for op in cigar.iter() {
        match op.op {
            OpKind::Match => {
                if record.same_strand {
                    pieces.push(shatter_piece(record, query_coord, target_coord, op.length));
                    query_coord += op.length;
                } else {
                    query_coord -= op.length;
                    pieces.push(shatter_piece(record, query_coord, target_coord, op.length));
                }
                target_coord += op.length;
            }
            OpKind::SeqMatch | OpKind::SeqMismatch => {
                if record.same_strand {
                    query_coord += op.length;
                } else {
                    query_coord -= op.length;
                }
                target_coord += op.length;
            }
            OpKind::QueryInsert => {
                if record.same_strand {
                    query_coord += op.length;
                } else {
                    query_coord -= op.length;
                }
            }
            OpKind::QueryDelete => {
                target_coord += op.length;
            }
        }
    }

    Ok(pieces)
}

fn shatter_piece(record: &Record, query_start: u64, target_start: u64, length: u64) -> Record {
    Record {
        query_name: record.query_name.clone(),
        query_length: record.query_length,
        query_start,
        query_end: query_start + length,
        same_strand: record.same_strand,
        target_name: record.target_name.clone(),
        target_length: record.target_length,
        target_start,
        target_end: target_start + length,
        num_matches: length as i64,
        num_bases: length as i64,
        mapping_quality: record.mapping_quality,
        alignment_type: record.alignment_type,
        score: record.score,
        tile_level: record.tile_level,
        chain_id: record.chain_id,
        chain_score: None,
        cigar: Some(CigarField::Parsed(Cigar::from_ops(vec![CigarOp {
            length,
            op: OpKind::Match,
        }]))),
    }
}

fn reverse_complement_base(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        other => other,
    }
}

/// Is the column at `target_seq[target_offset + i]` a match against the
/// query base at `query_offset` (walking forward on the same strand,
/// backward and reverse-complemented on the opposite strand)?
fn match_run_column(
    target_seq: &[u8],
    target_offset: usize,
    query_seq: &[u8],
    query_offset: usize,
    i: u64,
    same_strand: bool,
) -> bool {
    let t = target_seq[target_offset + i as usize].to_ascii_uppercase();
    let q_raw = if same_strand {
        query_seq[query_offset + i as usize]
    } else {
        reverse_complement_base(query_seq[query_offset - i as usize])
    };
    t == q_raw.to_ascii_uppercase()
}

/// Count how many `=`/`X` runs `[offset, offset+length)` would run-length
/// encode into, without allocating — the first pass of the two-pass
/// count-then-fill discipline `encode_mismatches` uses to size its output
/// in a single allocation.
fn count_match_runs(
    target_seq: &[u8],
    target_offset: usize,
    query_seq: &[u8],
    query_offset: usize,
    length: u64,
    same_strand: bool,
) -> usize {
    let mut count = 0usize;
    let mut prev_match = false;
    for i in 0..length {
        let is_match = match_run_column(target_seq, target_offset, query_seq, query_offset, i, same_strand);
        if i == 0 || is_match != prev_match {
            count += 1;
        }
        prev_match = is_match;
    }
    count
}

/// Second pass: append the run-length-encoded `=`/`X` ops for
/// `[offset, offset+length)` onto `dest`, which must already have enough
/// spare capacity (from [`count_match_runs`]) that this never reallocates.
fn write_match_runs(
    dest: &mut Vec<CigarOp>,
    target_seq: &[u8],
    target_offset: usize,
    query_seq: &[u8],
    query_offset: usize,
    length: u64,
    same_strand: bool,
) {
    let mut prev_match = false;
    for i in 0..length {
        let is_match = match_run_column(target_seq, target_offset, query_seq, query_offset, i, same_strand);
        if i == 0 || is_match != prev_match {
            dest.push(CigarOp {
                length: 1,
                op: if is_match { OpKind::SeqMatch } else { OpKind::SeqMismatch },
            });
        } else {
            dest.last_mut().expect("just pushed a run").length += 1;
        }
        prev_match = is_match;
    }
}

/// Expand every `M` run into `=`/`X` runs by comparing against the actual
/// query and target sequences (full-length, not just the aligned slice —
/// offsets are taken against `query_start`/`target_start`). Non-`M` ops are
/// passed through unchanged.
///
/// Two passes over the operation string, matching the reference
/// implementation's `count_mismatch_records`/`fill_mismatch_records` split:
/// the first sizes the replacement operation string exactly, the second
/// fills it, so the result is a single fresh allocation rather than a
/// vector grown op-by-op.
pub fn encode_mismatches(record: &mut Record, query_seq: &[u8], target_seq: &[u8]) -> Result<()> {
    if (record.target_end as usize) > target_seq.len() || (record.query_end as usize) > query_seq.len() {
        return Err(PafError::InvalidRecord(
            "sequence is shorter than the alignment's coordinates".into(),
        ));
    }

    let same_strand = record.same_strand;
    let query_start = record.query_start;
    let query_end = record.query_end;
    let target_start = record.target_start;

    let old_ops: Vec<CigarOp> = parsed_cigar(record, "encode_mismatches")?.iter().copied().collect();

    let query_offset_for = |qi: u64| -> u64 {
        if same_strand {
            query_start + qi
        } else {
            query_end - (qi + 1)
        }
    };

    // First pass: count the output records so the replacement operation
    // string can be allocated exactly once.
    let mut total = 0usize;
    let mut qi: u64 = 0;
    let mut tj: u64 = target_start;
    for r in &old_ops {
        match r.op {
            OpKind::Match => {
                total += count_match_runs(
                    target_seq,
                    tj as usize,
                    query_seq,
                    query_offset_for(qi) as usize,
                    r.length,
                    same_strand,
                );
                qi += r.length;
                tj += r.length;
            }
            OpKind::QueryInsert => {
                total += 1;
                qi += r.length;
            }
            OpKind::QueryDelete => {
                total += 1;
                tj += r.length;
            }
            OpKind::SeqMatch | OpKind::SeqMismatch => {
                total += 1;
                qi += r.length;
                tj += r.length;
            }
        }
    }

    // Second pass: allocate once and fill.
    let mut new_ops = Vec::with_capacity(total);
    qi = 0;
    tj = target_start;
    for r in &old_ops {
        match r.op {
            OpKind::Match => {
                write_match_runs(
                    &mut new_ops,
                    target_seq,
                    tj as usize,
                    query_seq,
                    query_offset_for(qi) as usize,
                    r.length,
                    same_strand,
                );
                qi += r.length;
                tj += r.length;
            }
            OpKind::QueryInsert => {
                new_ops.push(*r);
                qi += r.length;
            }
            OpKind::QueryDelete => {
                new_ops.push(*r);
                tj += r.length;
            }
            OpKind::SeqMatch | OpKind::SeqMismatch => {
                new_ops.push(*r);
                qi += r.length;
                tj += r.length;
            }
        }
    }
    debug_assert_eq!(new_ops.len(), total);

    if let Some(CigarField::Parsed(cigar)) = record.cigar.as_mut() {
        cigar.replace(new_ops);
    }
    Ok(())
}

/// Collapse `=`/`X`/`M` runs back into a single `M` run per maximal
/// aligned block, undoing `encode_mismatches`.
pub fn remove_mismatches(record: &mut Record) -> Result<()> {
    let cigar = record
        .cigar
        .as_mut()
        .and_then(|c| c.as_parsed_mut())
        .ok_or_else(|| PafError::InvalidRecord("remove_mismatches requires a parsed cigar".into()))?;

    let n = cigar.len();
    let mut write = 0usize;
    for read in 0..n {
        let r = *cigar.get(read).expect("read index within bounds");
        if r.op.is_aligned() {
            let merge = write > 0 && cigar.get(write - 1).map(|p| p.op) == Some(OpKind::Match);
            if merge {
                cigar.get_mut(write - 1).expect("just checked").length += r.length;
            } else {
                *cigar.get_mut(write).expect("write index within bounds") =
                    CigarOp { length: r.length, op: OpKind::Match };
                write += 1;
            }
        } else {
            *cigar.get_mut(write).expect("write index within bounds") = r;
            write += 1;
        }
    }
    cigar.truncate(write);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record(cigar: &str, same_strand: bool) -> Record {
        Record {
            query_name: "q".into(),
            query_length: 1000,
            query_start: 10,
            query_end: 10 + cigar_query_span(cigar, same_strand),
            same_strand,
            target_name: "t".into(),
            target_length: 1000,
            target_start: 20,
            target_end: 20 + cigar_target_span(cigar),
            num_matches: 0,
            num_bases: 0,
            mapping_quality: 60,
            alignment_type: None,
            score: Some(100),
            tile_level: None,
            chain_id: None,
            chain_score: None,
            cigar: Some(CigarField::Parsed(Cigar::parse(cigar).unwrap())),
        }
    }

    fn cigar_query_span(s: &str, _same_strand: bool) -> u64 {
        Cigar::parse(s)
            .unwrap()
            .iter()
            .filter(|o| o.op.consumes_query())
            .map(|o| o.length)
            .sum()
    }

    fn cigar_target_span(s: &str) -> u64 {
        Cigar::parse(s)
            .unwrap()
            .iter()
            .filter(|o| o.op.consumes_target())
            .map(|o| o.length)
            .sum()
    }

    #[test]
    fn invert_swaps_names_and_indels() {
        let mut r = base_record("5M3I2D4M", true);
        invert(&mut r);
        assert_eq!(r.query_name, "t");
        assert_eq!(r.target_name, "q");
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.to_string(), "5M3D2I4M");
    }

    #[test]
    fn invert_reverses_cigar_on_opposite_strand() {
        let mut r = base_record("5M3I2D4M", false);
        invert(&mut r);
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.to_string(), "4M2I3D5M");
    }

    #[test]
    fn trim_ends_on_same_strand() {
        let mut r = base_record("10M", true);
        trim_ends(&mut r, 3).unwrap();
        assert_eq!(r.query_start, 13);
        assert_eq!(r.target_start, 23);
        assert_eq!(r.query_end, 10 + 10 - 3);
        assert_eq!(r.target_end, 20 + 10 - 3);
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.to_string(), "4M");
    }

    #[test]
    fn trim_ends_consumes_leading_indels_whole() {
        let mut r = base_record("2I10M2D", true);
        trim_ends(&mut r, 1).unwrap();
        // the leading 2I is fully consumed regardless of the 1-base trim target
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.to_string(), "9M");
    }

    #[test]
    fn trim_end_fraction_splits_evenly() {
        let mut r = base_record("20M", true);
        trim_end_fraction(&mut r, 0.5).unwrap();
        // 20 aligned bases * 0.5 / 2 = 5 trimmed from each end
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.to_string(), "10M");
    }

    #[test]
    fn shatter_splits_on_indels() {
        let r = base_record("3M2I4M", true);
        let pieces = shatter(&r).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].query_start, 10);
        assert_eq!(pieces[0].query_end, 13);
        assert_eq!(pieces[1].query_start, 15);
        assert_eq!(pieces[1].query_end, 19);
        assert_eq!(pieces[1].target_start, 23);
    }

    #[test]
    fn shatter_reverse_strand_walks_query_backward() {
        let r = base_record("3M2D4M", false);
        let pieces = shatter(&r).unwrap();
        assert_eq!(pieces.len(), 2);
        // query coordinate walks down from query_end as target walks up
        assert!(pieces[0].query_start > pieces[1].query_start);
    }

    #[test]
    fn encode_then_remove_mismatches_round_trips_to_single_m() {
        let query_full = vec![b'A'; 100];
        let target_full = vec![b'A'; 100];
        let mut r = base_record("8M", true);
        encode_mismatches(&mut r, &query_full, &target_full).unwrap();
        assert_eq!(r.cigar.as_ref().unwrap().as_parsed().unwrap().to_string(), "8=");
        remove_mismatches(&mut r).unwrap();
        assert_eq!(r.cigar.as_ref().unwrap().as_parsed().unwrap().to_string(), "8M");
    }

    #[test]
    fn encode_mismatches_detects_a_mismatch_column() {
        let mut query_full = vec![b'A'; 100];
        let target_full = vec![b'A'; 100];
        query_full[12] = b'G'; // query_start(10) + 2 -> third aligned column
        let mut r = base_record("8M", true);
        encode_mismatches(&mut r, &query_full, &target_full).unwrap();
        assert_eq!(r.cigar.unwrap().as_parsed().unwrap().to_string(), "2=1X5=");
    }

    #[test]
    fn encode_mismatches_rejects_short_sequences() {
        let mut r = base_record("8M", true);
        let short = vec![b'A'; 5];
        assert!(encode_mismatches(&mut r, &short, &short).is_err());
    }

    #[test]
    fn remove_mismatches_merges_runs() {
        let mut r = base_record("2=1X5=", true);
        remove_mismatches(&mut r).unwrap();
        assert_eq!(r.cigar.unwrap().as_parsed().unwrap().to_string(), "8M");
    }

    #[test]
    fn trim_unreliable_tails_keeps_reliable_core() {
        // a noisy prefix, a clean core, a noisy suffix. Opposite strand,
        // since `invert`'s cigar reversal (needed to bring the tail to the
        // front for the second trim pass) is conditional on `!same_strand`.
        let mut r = base_record("4X20=4X", false);
        trim_unreliable_tails(&mut r, 0.5, 1.0).unwrap();
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.to_string(), "20=");
    }
}
