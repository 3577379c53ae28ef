//! Text codec: PAF line <-> `Record`, plus streaming reader/writer types
//! that reuse a caller-owned buffer across records.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::cigar::Cigar;
use crate::error::{PafError, Result};
use crate::record::{AlignmentType, CigarField, Record};

/// Parse one PAF line (no trailing newline required, but one is tolerated
/// and stripped) into a `Record`.
///
/// `parse_cigar` selects whether a `cg:Z:` tag, if present, is parsed into
/// operations (`CigarField::Parsed`) or retained verbatim
/// (`CigarField::Raw`) for tools — `split_file`, `filter` without an
/// identity predicate — that never inspect the operation string.
pub fn parse_record(line: &str, parse_cigar: bool) -> Result<Record> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut fields = line.split('\t');
    let mut next = |name: &'static str| -> Result<&str> {
        fields
            .next()
            .ok_or_else(|| PafError::ReadRecord(format!("missing field: {name}")))
    };

    let query_name = next("query_name")?.to_string();
    let query_length: u64 = next("query_length")?.parse()?;
    let query_start: u64 = next("query_start")?.parse()?;
    let query_end: u64 = next("query_end")?.parse()?;

    let strand = next("strand")?;
    let same_strand = match strand {
        "+" => true,
        "-" => false,
        other => {
            return Err(PafError::ReadRecord(format!(
                "invalid strand character: {other}"
            )))
        }
    };

    let target_name = next("target_name")?.to_string();
    let target_length: u64 = next("target_length")?.parse()?;
    let target_start: u64 = next("target_start")?.parse()?;
    let target_end: u64 = next("target_end")?.parse()?;

    let num_matches: i64 = next("num_matches")?.parse()?;
    let num_bases: i64 = next("num_bases")?.parse()?;
    let mapping_quality: i64 = next("mapping_quality")?.parse()?;

    let mut alignment_type = None;
    let mut score = None;
    let mut tile_level = None;
    let mut chain_id = None;
    let mut chain_score = None;
    let mut cigar = None;

    for tag in fields {
        // Well-formed tags are `XX:T:value` — positions 2 and 4 are colons.
        let bytes = tag.as_bytes();
        if bytes.len() < 5 || bytes[2] != b':' || bytes[4] != b':' {
            continue;
        }
        let name = &tag[0..2];
        let value = &tag[5..];
        match name {
            "tp" => {
                let c = value.chars().next().ok_or_else(|| {
                    PafError::ReadRecord("empty tp:A: tag value".to_string())
                })?;
                alignment_type = Some(AlignmentType::from_char(c).ok_or_else(|| {
                    PafError::ReadRecord(format!("invalid tp:A: type letter: {c}"))
                })?);
            }
            "AS" => score = Some(value.parse()?),
            "cg" => {
                cigar = Some(if parse_cigar {
                    CigarField::Parsed(Cigar::parse(value)?)
                } else {
                    CigarField::Raw(value.to_string())
                });
            }
            "tl" => tile_level = Some(value.parse()?),
            "cn" => chain_id = Some(value.parse()?),
            "s1" => chain_score = Some(value.parse()?),
            _ => {} // unknown well-formed tag, silently ignored
        }
    }

    Ok(Record {
        query_name,
        query_length,
        query_start,
        query_end,
        same_strand,
        target_name,
        target_length,
        target_start,
        target_end,
        num_matches,
        num_bases,
        mapping_quality,
        alignment_type,
        score,
        tile_level,
        chain_id,
        chain_score,
        cigar,
    })
}

/// Serialize `record` into `buf` (cleared first), in field order:
/// the 12 mandatory columns, then `tp`, `AS`, `tl`, `cn`, `s1`, then
/// `cg:Z:` from whichever cigar representation is present. No trailing
/// newline.
///
/// Synthesizes `tp:A:S`/`tp:A:P` from `tile_level` per the original
/// printer's rule when no explicit type was parsed (see
/// [`crate::validate::check`] for the accompanying invariant).
pub fn write_record(record: &Record, buf: &mut String) {
    buf.clear();
    use std::fmt::Write as _;

    let _ = write!(
        buf,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        record.query_name,
        record.query_length,
        record.query_start,
        record.query_end,
        if record.same_strand { '+' } else { '-' },
        record.target_name,
        record.target_length,
        record.target_start,
        record.target_end,
        record.num_matches,
        record.num_bases,
        record.mapping_quality,
    );

    let synthesized_type = match (record.alignment_type, record.tile_level) {
        (Some(t), _) => Some(t.to_char()),
        (None, Some(level)) => Some(if level > 1 { 'S' } else { 'P' }),
        (None, None) => None,
    };
    if let Some(c) = synthesized_type {
        let _ = write!(buf, "\ttp:A:{c}");
    }
    if let Some(score) = record.score {
        let _ = write!(buf, "\tAS:i:{score}");
    }
    if let Some(level) = record.tile_level {
        let _ = write!(buf, "\ttl:i:{level}");
    }
    if let Some(id) = record.chain_id {
        let _ = write!(buf, "\tcn:i:{id}");
    }
    if let Some(score) = record.chain_score {
        let _ = write!(buf, "\ts1:i:{score}");
    }
    match &record.cigar {
        Some(CigarField::Parsed(cigar)) => {
            let _ = write!(buf, "\tcg:Z:{cigar}");
        }
        Some(CigarField::Raw(raw)) => {
            let _ = write!(buf, "\tcg:Z:{raw}");
        }
        None => {}
    }
}

/// Streaming PAF reader over a caller-reusable line buffer.
pub struct Reader<R> {
    inner: BufReader<R>,
    parse_cigar: bool,
    line_no: u64,
}

impl Reader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P, parse_cigar: bool) -> Result<Self> {
        Ok(Reader::new(File::open(path)?, parse_cigar))
    }
}

impl<R: io::Read> Reader<R> {
    pub fn new(rdr: R, parse_cigar: bool) -> Self {
        Reader {
            inner: BufReader::new(rdr),
            parse_cigar,
            line_no: 0,
        }
    }

    /// Read a single record into a reused growable `String` buffer.
    /// Returns `Ok(None)` at EOF (an empty line with no trailing data).
    pub fn read_record(&mut self, buf: &mut String) -> Result<Option<Record>> {
        buf.clear();
        let bytes_read = self.inner.read_line(buf)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        parse_record(buf, self.parse_cigar).map_err(|e| match e {
            PafError::ReadRecord(msg) => {
                PafError::ReadRecord(format!("line {}: {msg}", self.line_no))
            }
            other => other,
        }).map(Some)
    }

    pub fn records(self) -> RecordsIter<R> {
        RecordsIter { rdr: self, buf: String::new() }
    }
}

/// An owned iterator over a `Reader`'s records, reusing one line buffer.
pub struct RecordsIter<R> {
    rdr: Reader<R>,
    buf: String,
}

impl<R: io::Read> Iterator for RecordsIter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        match self.rdr.read_record(&mut self.buf) {
            Ok(Some(r)) => Some(Ok(r)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Streaming PAF writer over a caller-reusable output buffer. The buffer
/// grows (doubling) as needed to fit each record's serialized length,
/// matching the estimate-then-grow discipline of the reference
/// implementation's `paf_write_with_buffer`.
pub struct Writer<W> {
    inner: BufWriter<W>,
    buf: String,
}

impl Writer<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Writer::new(File::create(path)?))
    }
}

impl<W: Write> Writer<W> {
    pub fn new(wtr: W) -> Self {
        Writer {
            inner: BufWriter::new(wtr),
            buf: String::with_capacity(256),
        }
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        write_record(record, &mut self.buf);
        self.inner.write_all(self.buf.as_bytes())?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::{CigarOp, OpKind};

    fn sample() -> Record {
        Record {
            query_name: "query1".into(),
            query_length: 100,
            query_start: 0,
            query_end: 50,
            same_strand: true,
            target_name: "target1".into(),
            target_length: 200,
            target_start: 10,
            target_end: 60,
            num_matches: 50,
            num_bases: 50,
            mapping_quality: 255,
            alignment_type: None,
            score: None,
            tile_level: None,
            chain_id: None,
            chain_score: None,
            cigar: None,
        }
    }

    #[test]
    fn parse_minimal_line() {
        let line = "query1\t100\t0\t50\t+\ttarget1\t200\t10\t60\t50\t50\t255";
        let r = parse_record(line, true).unwrap();
        assert_eq!(r.query_name, "query1");
        assert_eq!(r.query_start, 0);
        assert_eq!(r.query_end, 50);
        assert!(r.same_strand);
        assert!(r.cigar.is_none());
    }

    #[test]
    fn parse_cigar_tag() {
        let line = "q\t8\t0\t8\t+\tt\t7\t0\t7\t5\t8\t60\tcg:Z:5M3I2D";
        let r = parse_record(line, true).unwrap();
        let cigar = r.cigar.unwrap().as_parsed().unwrap().clone();
        assert_eq!(cigar.len(), 3);
        assert_eq!(cigar.get(0), Some(&CigarOp { length: 5, op: OpKind::Match }));
    }

    #[test]
    fn raw_cigar_is_not_parsed() {
        let line = "q\t8\t0\t8\t+\tt\t7\t0\t7\t5\t8\t60\tcg:Z:5M3I2D";
        let r = parse_record(line, false).unwrap();
        assert!(r.cigar.unwrap().as_parsed().is_none());
    }

    #[test]
    fn malformed_tags_are_skipped() {
        let line = "q\t8\t0\t8\t+\tt\t7\t0\t7\t5\t8\t60\tnottag\tAS:i:12";
        let r = parse_record(line, true).unwrap();
        assert_eq!(r.score, Some(12));
    }

    #[test]
    fn bad_strand_is_fatal() {
        let line = "q\t8\t0\t8\tx\tt\t7\t0\t7\t5\t8\t60";
        assert!(parse_record(line, true).is_err());
    }

    #[test]
    fn print_then_parse_is_fixed_point() {
        let mut r = sample();
        r.cigar = Some(CigarField::Parsed(Cigar::parse("50M").unwrap()));
        let mut buf = String::new();
        write_record(&r, &mut buf);
        let r2 = parse_record(&buf, true).unwrap();
        let mut buf2 = String::new();
        write_record(&r2, &mut buf2);
        assert_eq!(buf, buf2);
    }

    #[test]
    fn tp_synthesized_from_tile_level() {
        let mut r = sample();
        r.tile_level = Some(3);
        let mut buf = String::new();
        write_record(&r, &mut buf);
        assert!(buf.contains("tp:A:S"));

        r.tile_level = Some(1);
        write_record(&r, &mut buf);
        assert!(buf.contains("tp:A:P"));
    }

    #[test]
    fn streaming_reader_over_cursor() {
        let data = "q1\t100\t0\t50\t+\tt1\t200\t10\t60\t50\t50\t60\n\
                     q2\t80\t5\t75\t-\tt2\t150\t20\t90\t60\t70\t55\n";
        let mut reader = Reader::new(std::io::Cursor::new(data), true);
        let recs: Vec<_> = reader.records().collect::<Result<_>>().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].query_name, "q1");
        assert_eq!(recs[1].query_name, "q2");
    }
}
