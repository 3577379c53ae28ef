//! paf-core
//!
//! Parsing, validation, and transformation of Pairwise mApping Format
//! (PAF) alignment records: the text codec, the operation-string engine
//! behind it, coordinate-level transforms (invert, shatter, trim), and
//! coverage/identity statistics.

pub mod cigar;
pub mod codec;
pub mod error;
pub mod fasta;
pub mod interval;
pub mod record;
pub mod stats;
pub mod transform;
pub mod validate;

pub use cigar::{Cigar, CigarOp, OpKind};
pub use codec::{parse_record, write_record, Reader, Writer};
pub use error::{PafError, Result};
pub use interval::{cmp_intervals, decode_fasta_header, Interval};
pub use record::{AlignmentType, CigarField, Record};
pub use stats::{identity, CoverageMap, OpStats, SequenceCountArray};

/// Version of the paf-core library, taken from the crate's own version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
