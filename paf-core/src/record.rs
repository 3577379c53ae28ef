//! The in-memory PAF record model.

use crate::cigar::Cigar;

/// Type of alignment, from the `tp:A:` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentType {
    /// Primary alignment.
    Primary,
    /// Secondary alignment.
    Secondary,
    /// Inversion.
    Inversion,
}

impl AlignmentType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'P' => Some(AlignmentType::Primary),
            'S' => Some(AlignmentType::Secondary),
            'I' => Some(AlignmentType::Inversion),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            AlignmentType::Primary => 'P',
            AlignmentType::Secondary => 'S',
            AlignmentType::Inversion => 'I',
        }
    }
}

/// The operation string of a record, in one of two mutually exclusive
/// representations: parsed into operations, or retained as a raw `cg:Z:`
/// value for tools that never inspect it (see `Reader::parse_cigar`).
#[derive(Debug, Clone)]
pub enum CigarField {
    Parsed(Cigar),
    Raw(String),
}

impl CigarField {
    pub fn as_parsed(&self) -> Option<&Cigar> {
        match self {
            CigarField::Parsed(c) => Some(c),
            CigarField::Raw(_) => None,
        }
    }

    pub fn as_parsed_mut(&mut self) -> Option<&mut Cigar> {
        match self {
            CigarField::Parsed(c) => Some(c),
            CigarField::Raw(_) => None,
        }
    }
}

/// A single PAF alignment record.
///
/// Coordinates follow PAF convention: 0-based, half-open `[start, end)`,
/// always expressed on the forward strand of the respective sequence
/// (`target_start`/`target_end` are always forward-strand; `query_start`/
/// `query_end` are on the query's own forward strand regardless of
/// `same_strand`).
#[derive(Debug, Clone)]
pub struct Record {
    pub query_name: String,
    pub query_length: u64,
    pub query_start: u64,
    pub query_end: u64,

    /// `true` if query and target are on the same strand ('+'), `false`
    /// if the query is reverse-complemented relative to the target ('-').
    pub same_strand: bool,

    pub target_name: String,
    pub target_length: u64,
    pub target_start: u64,
    pub target_end: u64,

    pub num_matches: i64,
    pub num_bases: i64,
    pub mapping_quality: i64,

    pub alignment_type: Option<AlignmentType>,
    pub score: Option<i64>,
    pub tile_level: Option<i64>,
    pub chain_id: Option<i64>,
    pub chain_score: Option<i64>,

    pub cigar: Option<CigarField>,
}

impl Record {
    /// The length of the query span, `query_end - query_start`.
    pub fn query_span(&self) -> u64 {
        self.query_end - self.query_start
    }

    /// The length of the target span, `target_end - target_start`.
    pub fn target_span(&self) -> u64 {
        self.target_end - self.target_start
    }

    /// Swap query and target name/length/coordinates. Does not touch the
    /// operation string or strand — see `transform::invert` for the full
    /// invert operation.
    pub(crate) fn swap_query_target(&mut self) {
        std::mem::swap(&mut self.query_name, &mut self.target_name);
        std::mem::swap(&mut self.query_length, &mut self.target_length);
        std::mem::swap(&mut self.query_start, &mut self.target_start);
        std::mem::swap(&mut self.query_end, &mut self.target_end);
    }
}
