//! Aggregate statistics over a collection of PAF records: identity
//! summaries for `paftools view`, operation-string tallies, and per-base
//! alignment-depth coverage counters for tile-level bookkeeping.

use std::collections::HashMap;

use crate::cigar::OpKind;
use crate::error::{PafError, Result};
use crate::record::Record;

/// The largest count a coverage cell will accumulate to before it stops
/// incrementing (matches the reference implementation's `INT16_MAX - 1`,
/// leaving headroom for a caller to add one more without overflow).
pub const MAX_COVERAGE_COUNT: u16 = i16::MAX as u16 - 1;

/// Fraction of matching bases in a record, `num_matches / num_bases`.
/// Records with `num_bases == 0` report `0.0`.
pub fn identity(record: &Record) -> f64 {
    if record.num_bases == 0 {
        0.0
    } else {
        record.num_matches as f64 / record.num_bases as f64
    }
}

/// Operation-string tallies over one or more records: matches, mismatches,
/// and gap counts/base-totals, accumulated straight off the parsed `Cigar`.
///
/// Mirrors the reference implementation's `paf_stats_calc`: `matches`
/// folds in both `Match` (ambiguous) and `SeqMatch` runs, `mismatches`
/// only `SeqMismatch` (a record that has never been through
/// [`crate::transform::encode_mismatches`] reports zero mismatches, since
/// its `M` runs are ambiguous). `query_inserts`/`query_deletes` count
/// *operations*, not bases; `query_insert_bases`/`query_delete_bases`
/// sum their lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    pub matches: i64,
    pub mismatches: i64,
    pub query_inserts: i64,
    pub query_insert_bases: i64,
    pub query_deletes: i64,
    pub query_delete_bases: i64,
}

impl OpStats {
    /// Fold `record`'s operation-string tallies into `self`. If
    /// `zero_counts` is set, `self` is reset to zero before accumulating,
    /// so callers can choose between a per-record snapshot and a running
    /// total across many records by toggling this flag.
    pub fn accumulate(&mut self, record: &Record, zero_counts: bool) -> Result<()> {
        if zero_counts {
            *self = OpStats::default();
        }
        let cigar = record
            .cigar
            .as_ref()
            .and_then(|c| c.as_parsed())
            .ok_or_else(|| PafError::InvalidRecord("paf_stats_calc requires a parsed cigar".into()))?;

        for op in cigar.iter() {
            match op.op {
                OpKind::Match | OpKind::SeqMatch => self.matches += op.length as i64,
                OpKind::SeqMismatch => self.mismatches += op.length as i64,
                OpKind::QueryInsert => {
                    self.query_inserts += 1;
                    self.query_insert_bases += op.length as i64;
                }
                OpKind::QueryDelete => {
                    self.query_deletes += 1;
                    self.query_delete_bases += op.length as i64;
                }
            }
        }
        Ok(())
    }
}

/// Per-base alignment-depth counters for one sequence, saturating at
/// [`MAX_COVERAGE_COUNT`] so that a sequence aligned by an unbounded number
/// of records never overflows its `u16` cell.
#[derive(Debug, Clone)]
pub struct SequenceCountArray {
    counts: Vec<u16>,
}

impl SequenceCountArray {
    pub fn new(length: usize) -> Self {
        SequenceCountArray {
            counts: vec![0u16; length],
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, pos: usize) -> u16 {
        self.counts[pos]
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.counts
    }

    /// Walk `record`'s operation string from `query_start` forward,
    /// incrementing (saturating) every query position covered by a
    /// `Match`/`SeqMatch`/`SeqMismatch` run. Panics if the walk does not
    /// land exactly on `query_end`, matching the reference implementation's
    /// closing assertion — a mismatch there means the cigar and coordinates
    /// have already diverged, which [`crate::validate::check`] should have
    /// caught first. The walk direction does not depend on strand: the
    /// query coordinates stored on a record are always forward-strand
    /// query-own coordinates, regardless of `same_strand`.
    pub fn increase_alignment_level_counts(&mut self, record: &Record) -> Result<()> {
        increase_alignment_level_counts(record, &mut self.counts)
    }
}

/// Saturating, cigar-driven per-base coverage increment (see
/// [`SequenceCountArray::increase_alignment_level_counts`]).
pub fn increase_alignment_level_counts(record: &Record, counts: &mut [u16]) -> Result<()> {
    let cigar = record
        .cigar
        .as_ref()
        .and_then(|c| c.as_parsed())
        .ok_or_else(|| PafError::InvalidRecord("increase_alignment_level_counts requires a parsed cigar".into()))?;

    let mut query_coord = record.query_start;

    for op in cigar.iter() {
        if op.op.consumes_query() {
            if op.op.is_aligned() {
                for p in query_coord..query_coord + op.length {
                    let c = &mut counts[p as usize];
                    if *c < MAX_COVERAGE_COUNT {
                        *c += 1;
                    }
                }
            }
            query_coord += op.length;
        }
    }

    assert_eq!(
        query_coord, record.query_end,
        "alignment-level walk ended at {query_coord}, expected {}",
        record.query_end
    );
    Ok(())
}

/// Coverage counters keyed by sequence name, sized lazily on first use.
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    by_name: HashMap<String, SequenceCountArray>,
}

impl CoverageMap {
    pub fn new() -> Self {
        CoverageMap::default()
    }

    pub fn get(&self, name: &str) -> Option<&SequenceCountArray> {
        self.by_name.get(name)
    }

    /// Record query-side coverage for one alignment record, allocating the
    /// array (sized to `query_length`) on first encounter of that query
    /// name. The coverage map tracks the query only, matching the
    /// reference's use as a per-query tile-level accumulator.
    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        let array = self
            .by_name
            .entry(record.query_name.clone())
            .or_insert_with(|| SequenceCountArray::new(record.query_length as usize));
        array.increase_alignment_level_counts(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(matches: i64, bases: i64, same_strand: bool) -> Record {
        Record {
            query_name: "q".into(),
            query_length: 100,
            query_start: 0,
            query_end: bases as u64,
            same_strand,
            target_name: "t".into(),
            target_length: 100,
            target_start: 0,
            target_end: bases as u64,
            num_matches: matches,
            num_bases: bases,
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
    fn identity_divides_matches_by_bases() {
        assert_eq!(identity(&rec(90, 100, true)), 0.9);
    }

    #[test]
    fn identity_of_zero_bases_is_zero() {
        assert_eq!(identity(&rec(0, 0, true)), 0.0);
    }

    fn rec_with_cigar(cigar: &str, query_start: u64, same_strand: bool) -> Record {
        use crate::cigar::Cigar;
        use crate::record::CigarField;
        let c = Cigar::parse(cigar).unwrap();
        let query_span: u64 = c.iter().filter(|o| o.op.consumes_query()).map(|o| o.length).sum();
        let target_span: u64 = c.iter().filter(|o| o.op.consumes_target()).map(|o| o.length).sum();
        Record {
            query_name: "q".into(),
            query_length: 10,
            query_start,
            query_end: query_start + query_span,
            same_strand,
            target_name: "t".into(),
            target_length: 100,
            target_start: 0,
            target_end: target_span,
            num_matches: 0,
            num_bases: 0,
            mapping_quality: 60,
            alignment_type: None,
            score: None,
            tile_level: None,
            chain_id: None,
            chain_score: None,
            cigar: Some(CigarField::Parsed(c)),
        }
    }

    #[test]
    fn coverage_saturates() {
        let mut counts = vec![0u16; 4];
        let r = rec_with_cigar("4M", 0, true);
        for _ in 0..(MAX_COVERAGE_COUNT as u32 + 10) {
            increase_alignment_level_counts(&r, &mut counts).unwrap();
        }
        assert_eq!(counts[0], MAX_COVERAGE_COUNT);
    }

    #[test]
    fn coverage_walk_matches_scenario() {
        // CIGAR 3M at query_start=2 on a length-10 sequence.
        let r = rec_with_cigar("3M", 2, true);
        let mut counts = vec![0u16; 10];
        increase_alignment_level_counts(&r, &mut counts).unwrap();
        assert_eq!(counts, vec![0, 0, 1, 1, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn coverage_walk_ignores_strand_and_always_starts_at_query_start() {
        // Opposite-strand 2M3I4M: the walk covers query_start..+2 and
        // query_start+5..+9 regardless of `same_strand` — the query
        // coordinates on a record are always forward-strand query-own
        // coordinates, so the coverage walk never reverses direction.
        let r = rec_with_cigar("2M3I4M", 0, false);
        let mut counts = vec![0u16; 9];
        increase_alignment_level_counts(&r, &mut counts).unwrap();
        assert_eq!(counts, vec![1, 1, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn coverage_map_accumulates_per_sequence() {
        let mut map = CoverageMap::new();
        map.add_record(&rec_with_cigar("10M", 0, true)).unwrap();
        map.add_record(&rec_with_cigar("10M", 0, true)).unwrap();
        let q = map.get("q").unwrap();
        assert_eq!(q.get(0), 2);
        assert_eq!(q.len(), 10);
    }

    #[test]
    fn op_stats_accumulate_over_matches_and_gaps() {
        let r = rec_with_cigar("2=1X1I2D", 0, true);
        let mut stats = OpStats::default();
        stats.accumulate(&r, false).unwrap();
        assert_eq!(stats.matches, 2);
        assert_eq!(stats.mismatches, 1);
        assert_eq!(stats.query_inserts, 1);
        assert_eq!(stats.query_insert_bases, 1);
        assert_eq!(stats.query_deletes, 1);
        assert_eq!(stats.query_delete_bases, 2);
    }

    #[test]
    fn op_stats_zero_counts_resets_before_accumulating() {
        let r = rec_with_cigar("5M", 0, true);
        let mut stats = OpStats::default();
        stats.accumulate(&r, false).unwrap();
        stats.accumulate(&r, false).unwrap();
        assert_eq!(stats.matches, 10);

        stats.accumulate(&r, true).unwrap();
        assert_eq!(stats.matches, 5);
    }
}
