use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use paf_core::record::Record;
use paf_core::stats::OpStats;
use paf_core::{codec, fasta, stats, transform, validate};

#[derive(Parser)]
#[command(name = "paftools")]
#[command(about = "Manipulate Pairwise mApping Format (PAF) alignment records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level: error, warn, info, debug, trace
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop or retain records by score/identity/tile-level thresholds
    Filter {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        min_chain_score: Option<i64>,
        #[arg(long)]
        min_alignment_score: Option<i64>,
        #[arg(long)]
        min_identity: Option<f64>,
        #[arg(long)]
        min_identity_with_gaps: Option<f64>,
        #[arg(long)]
        max_tile_level: Option<i64>,

        /// Invert the predicate: keep records that would otherwise be dropped
        #[arg(short = 'x', long)]
        invert: bool,
    },

    /// Split each record into one per match run
    Shatter {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Demultiplex records into per-contig files
    SplitFile {
        /// Path/filename prefix for the output files, e.g. "out/run1_"
        prefix: String,

        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Co-locate contigs shorter than this into rolling small-contig bins
        #[arg(short = 'm', long)]
        max_bin_length: Option<u64>,

        /// Demultiplex by query name instead of target name
        #[arg(short = 'q', long)]
        by_query: bool,
    },

    /// Trim alignment ends, either by a fixed base count or by identity
    Trim {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Trim exactly this many bases from each end instead of identity trimming
        #[arg(short = 'f', long)]
        fixed_trim: Option<u64>,

        /// Identity-trim score fraction (how far below overall identity counts as unreliable)
        #[arg(short = 'r', long, default_value = "0.1")]
        trim_identity: f64,

        /// Identity-trim maximum fraction of the alignment either tail may remove
        #[arg(short = 't', long, default_value = "1.0")]
        trim_fraction: f64,
    },

    /// Encode or remove explicit sequence-match/mismatch runs in the operation string
    AddMismatches {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// FASTA file(s) supplying the query and target sequences
        #[arg(required = true)]
        fasta: Vec<PathBuf>,

        /// Remove mismatch encoding instead of adding it
        #[arg(short = 'a', long)]
        remove: bool,
    },

    /// Pretty-print records, optionally with base-level alignment and aggregate stats
    View {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// FASTA file(s) supplying the query and target sequences
        #[arg(required = true)]
        fasta: Vec<PathBuf>,

        /// Print the base-level alignment beneath each record
        #[arg(short = 'a', long)]
        alignment: bool,

        /// Print an aggregate stats summary line after all records
        #[arg(short, long)]
        stats: bool,

        /// Suppress the per-record summary line (only useful with --stats)
        #[arg(short = 't', long = "no-per-alignment")]
        no_per_alignment: bool,

        /// Exit with an error if the aggregate identity falls below this
        #[arg(short = 'u', long)]
        min_identity: Option<f64>,

        /// Exit with an error if the total aligned-base count falls below this
        #[arg(short = 'v', long)]
        min_aligned_bases: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Filter {
            input,
            output,
            min_chain_score,
            min_alignment_score,
            min_identity,
            min_identity_with_gaps,
            max_tile_level,
            invert,
        } => cmd_filter(
            input,
            output,
            min_chain_score,
            min_alignment_score,
            min_identity,
            min_identity_with_gaps,
            max_tile_level,
            invert,
        ),
        Commands::Shatter { input, output } => cmd_shatter(input, output),
        Commands::SplitFile { prefix, input, max_bin_length, by_query } => {
            cmd_split_file(prefix, input, max_bin_length, by_query)
        }
        Commands::Trim { input, output, fixed_trim, trim_identity, trim_fraction } => {
            cmd_trim(input, output, fixed_trim, trim_identity, trim_fraction)
        }
        Commands::AddMismatches { input, output, fasta, remove } => {
            cmd_add_mismatches(input, output, fasta, remove)
        }
        Commands::View { input, output, fasta, alignment, stats, no_per_alignment, min_identity, min_aligned_bases } => {
            cmd_view(input, output, fasta, alignment, stats, no_per_alignment, min_identity, min_aligned_bases)
        }
    }
}

/// Open `path` for reading, or stdin if absent. A `.gz` extension is
/// transparently decompressed, matching the gzipped PAF streams this
/// toolset's upstream callers commonly produce.
fn open_input(path: &Option<PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening input {}", p.display()))?;
            if p.extension().is_some_and(|ext| ext == "gz") {
                Ok(Box::new(flate2::read::GzDecoder::new(file)))
            } else {
                Ok(Box::new(file))
            }
        }
        None => Ok(Box::new(io::stdin())),
    }
}

/// Open `path` for writing, or stdout if absent. A `.gz` extension writes
/// a gzip-compressed stream (default compression level), the write-side
/// counterpart of [`open_input`]'s transparent decompression.
fn open_output(path: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("creating output {}", p.display()))?;
            if p.extension().is_some_and(|ext| ext == "gz") {
                Ok(Box::new(flate2::write::GzEncoder::new(file, flate2::Compression::default())))
            } else {
                Ok(Box::new(BufWriter::new(file)))
            }
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn cmd_filter(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    min_chain_score: Option<i64>,
    min_alignment_score: Option<i64>,
    min_identity: Option<f64>,
    min_identity_with_gaps: Option<f64>,
    max_tile_level: Option<i64>,
    invert: bool,
) -> Result<()> {
    log::info!(
        "filter: input={:?} output={:?} invert={invert}",
        input.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdin".into()),
        output.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdout".into()),
    );
    let start = Instant::now();

    let needs_identity = min_identity.is_some() || min_identity_with_gaps.is_some();
    let reader = codec::Reader::new(open_input(&input)?, needs_identity);
    let mut writer = codec::Writer::new(open_output(&output)?);

    let mut kept = 0u64;
    let mut dropped = 0u64;
    for record in reader.records() {
        let record = record.context("reading record")?;
        validate::check(&record).context("validating record")?;

        let passes = passes_filter(
            &record,
            min_chain_score,
            min_alignment_score,
            min_identity,
            min_identity_with_gaps,
            max_tile_level,
        )?;
        let keep = passes != invert;

        if keep {
            writer.write_record(&record).context("writing record")?;
            kept += 1;
        } else {
            dropped += 1;
            if log::log_enabled!(log::Level::Debug) {
                let mut buf = String::new();
                codec::write_record(&record, &mut buf);
                log::debug!("filtered out: {buf}");
            }
        }
    }
    writer.flush().context("flushing output")?;
    log::info!("filter: kept {kept}, dropped {dropped} in {:.2?}", start.elapsed());
    Ok(())
}

/// Mirrors `paf_filter.c`'s predicate: chain score, alignment score, and tile
/// level come straight off the record's own fields, but `min_identity`/
/// `min_identity_with_gaps` are computed from the cigar's operation-string
/// tallies via [`OpStats`] (the original's `paf_stats_calc`), not from the
/// PAF standard `num_matches`/`num_bases` columns — those already fold
/// indels into the denominator by convention, which would make
/// `min_identity` (meant to exclude indels) silently behave like
/// `min_identity_with_gaps`.
fn passes_filter(
    record: &Record,
    min_chain_score: Option<i64>,
    min_alignment_score: Option<i64>,
    min_identity: Option<f64>,
    min_identity_with_gaps: Option<f64>,
    max_tile_level: Option<i64>,
) -> Result<bool> {
    if let Some(min) = min_chain_score {
        if record.chain_score.unwrap_or(i64::MIN) < min {
            return Ok(false);
        }
    }
    if let Some(min) = min_alignment_score {
        if record.score.unwrap_or(i64::MIN) < min {
            return Ok(false);
        }
    }
    if min_identity.is_some() || min_identity_with_gaps.is_some() {
        let mut op_stats = OpStats::default();
        op_stats
            .accumulate(record, true)
            .context("accumulating operation-string stats for identity filter")?;
        let aligned = op_stats.matches + op_stats.mismatches;
        let identity = if aligned == 0 { 0.0 } else { op_stats.matches as f64 / aligned as f64 };
        if let Some(min) = min_identity {
            if identity < min {
                return Ok(false);
            }
        }
        if let Some(min) = min_identity_with_gaps {
            let aligned_with_gaps = aligned + op_stats.query_insert_bases + op_stats.query_delete_bases;
            let identity_with_gaps = if aligned_with_gaps == 0 {
                0.0
            } else {
                op_stats.matches as f64 / aligned_with_gaps as f64
            };
            if identity_with_gaps < min {
                return Ok(false);
            }
        }
    }
    if let Some(max) = max_tile_level {
        if record.tile_level.unwrap_or(0) > max {
            return Ok(false);
        }
    }
    Ok(true)
}

fn cmd_shatter(input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    log::info!("shatter: input={input:?} output={output:?}");

    let reader = codec::Reader::new(open_input(&input)?, true);
    let mut writer = codec::Writer::new(open_output(&output)?);

    let mut in_count = 0u64;
    let mut out_count = 0u64;
    for record in reader.records() {
        let record = record.context("reading record")?;
        in_count += 1;
        let shards = transform::shatter(&record).context("shattering record")?;
        for shard in &shards {
            validate::check(shard).context("validating shard")?;
            writer.write_record(shard).context("writing shard")?;
        }
        out_count += shards.len() as u64;
    }
    writer.flush().context("flushing output")?;
    log::info!("shatter: {in_count} records -> {out_count} shards");
    Ok(())
}

/// One rolling small-contig bin: the bases it has already absorbed and the
/// distinct contig names already routed to it.
struct SmallBin {
    writer: codec::Writer<BufWriter<File>>,
    accumulated_length: u64,
    names: std::collections::HashSet<String>,
}

fn sanitize_name(name: &str) -> String {
    name.replace('/', "_")
}

fn cmd_split_file(
    prefix: String,
    input: Option<PathBuf>,
    max_bin_length: Option<u64>,
    by_query: bool,
) -> Result<()> {
    log::info!("split_file: prefix={prefix} input={input:?} by_query={by_query}");

    let reader = codec::Reader::new(open_input(&input)?, false);

    let mut per_name: HashMap<String, codec::Writer<BufWriter<File>>> = HashMap::new();
    let mut small_bins: Vec<SmallBin> = Vec::new();
    let mut bin_of_name: HashMap<String, usize> = HashMap::new();
    let mut records_written = 0u64;

    for record in reader.records() {
        let record = record.context("reading record")?;
        let (name, length) = if by_query {
            (record.query_name.clone(), record.query_length)
        } else {
            (record.target_name.clone(), record.target_length)
        };

        if let Some(max_len) = max_bin_length {
            if length < max_len {
                let bin_idx = match bin_of_name.get(&name) {
                    Some(&idx) => idx,
                    None => {
                        let existing = small_bins
                            .iter()
                            .position(|b| b.accumulated_length + length <= max_len && !b.names.contains(&name));
                        let idx = match existing {
                            Some(idx) => idx,
                            None => {
                                let path = PathBuf::from(format!("{prefix}small_{}.paf", small_bins.len()));
                                let writer = codec::Writer::new(BufWriter::new(
                                    File::create(&path)
                                        .with_context(|| format!("creating {}", path.display()))?,
                                ));
                                small_bins.push(SmallBin {
                                    writer,
                                    accumulated_length: 0,
                                    names: std::collections::HashSet::new(),
                                });
                                small_bins.len() - 1
                            }
                        };
                        bin_of_name.insert(name.clone(), idx);
                        idx
                    }
                };
                small_bins[bin_idx].accumulated_length += length;
                small_bins[bin_idx].names.insert(name.clone());
                small_bins[bin_idx].writer.write_record(&record).context("writing to small-contig bin")?;
                records_written += 1;
                continue;
            }
        }

        let writer = match per_name.get_mut(&name) {
            Some(w) => w,
            None => {
                let path = PathBuf::from(format!("{prefix}{}.paf", sanitize_name(&name)));
                let writer = codec::Writer::new(BufWriter::new(
                    File::create(&path).with_context(|| format!("creating {}", path.display()))?,
                ));
                per_name.entry(name.clone()).or_insert(writer)
            }
        };
        writer.write_record(&record).context("writing record")?;
        records_written += 1;
    }

    for writer in per_name.values_mut() {
        writer.flush().context("flushing per-name file")?;
    }
    for bin in small_bins.iter_mut() {
        bin.writer.flush().context("flushing small-contig bin")?;
    }

    log::info!(
        "split_file: {records_written} records across {} per-contig files and {} small-contig bins",
        per_name.len(),
        small_bins.len()
    );
    Ok(())
}

fn cmd_trim(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    fixed_trim: Option<u64>,
    trim_identity: f64,
    trim_fraction: f64,
) -> Result<()> {
    log::info!(
        "trim: input={input:?} output={output:?} fixed_trim={fixed_trim:?} trim_identity={trim_identity} trim_fraction={trim_fraction}"
    );

    let reader = codec::Reader::new(open_input(&input)?, true);
    let mut writer = codec::Writer::new(open_output(&output)?);

    let mut count = 0u64;
    for record in reader.records() {
        let mut record = record.context("reading record")?;
        if let Some(bases) = fixed_trim {
            transform::trim_ends(&mut record, bases).context("trimming ends")?;
        } else {
            transform::trim_unreliable_tails(&mut record, trim_identity, trim_fraction)
                .context("trimming unreliable tails")?;
        }
        validate::check(&record).context("validating trimmed record")?;
        writer.write_record(&record).context("writing record")?;
        count += 1;
    }
    writer.flush().context("flushing output")?;
    log::info!("trim: processed {count} records");
    Ok(())
}

fn cmd_add_mismatches(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    fasta_paths: Vec<PathBuf>,
    remove: bool,
) -> Result<()> {
    log::info!("add_mismatches: input={input:?} output={output:?} remove={remove} fasta={fasta_paths:?}");

    let sequences = fasta::load_sequences(&fasta_paths).context("loading FASTA sequences")?;

    let reader = codec::Reader::new(open_input(&input)?, true);
    let mut writer = codec::Writer::new(open_output(&output)?);

    let mut count = 0u64;
    for record in reader.records() {
        let mut record = record.context("reading record")?;
        if remove {
            transform::remove_mismatches(&mut record).context("removing mismatch encoding")?;
        } else {
            let query_seq = fasta::require_sequence(&sequences, &record.query_name)
                .with_context(|| format!("record {count}"))?;
            let target_seq = fasta::require_sequence(&sequences, &record.target_name)
                .with_context(|| format!("record {count}"))?;
            transform::encode_mismatches(&mut record, query_seq, target_seq)
                .context("encoding mismatches")?;
        }
        validate::check(&record).context("validating record")?;
        writer.write_record(&record).context("writing record")?;
        count += 1;
    }
    writer.flush().context("flushing output")?;
    log::info!("add_mismatches: processed {count} records");
    Ok(())
}

/// `view` always encodes mismatches before printing or accumulating stats
/// (matching `paf_view.c`'s unconditional `paf_encode_mismatches` call) so
/// identity figures reflect actual base agreement rather than ambiguous
/// `M` runs. Operation-string stats are accumulated across every record
/// regardless of `--stats`/`-u`/`-v`, so the floor checks are correct even
/// when the summary line itself isn't printed — the original ties both to
/// the same `-s` flag, which means `-u`/`-v` silently compare against zero
/// totals if `-s` is omitted; this keeps the floor checks meaningful on
/// their own.
fn cmd_view(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    fasta_paths: Vec<PathBuf>,
    alignment: bool,
    print_stats: bool,
    no_per_alignment: bool,
    min_identity: Option<f64>,
    min_aligned_bases: Option<i64>,
) -> Result<()> {
    log::info!("view: input={input:?} output={output:?} alignment={alignment} stats={print_stats}");

    let sequences = fasta::load_sequences(&fasta_paths).context("loading FASTA sequences")?;

    let reader = codec::Reader::new(open_input(&input)?, true);
    let mut out = open_output(&output)?;

    let mut total_alignments: i64 = 0;
    let mut op_stats = OpStats::default();

    for record in reader.records() {
        let mut record = record.context("reading record")?;
        validate::check(&record).context("validating record")?;

        let query_seq = fasta::require_sequence(&sequences, &record.query_name)?.to_vec();
        let target_seq = fasta::require_sequence(&sequences, &record.target_name)?.to_vec();
        transform::encode_mismatches(&mut record, &query_seq, &target_seq)
            .context("encoding mismatches")?;

        if !no_per_alignment {
            writeln!(out, "{}", render_summary(&record))?;
            if alignment {
                render_alignment(&mut out, &record, &query_seq, &target_seq)?;
            }
        }

        op_stats.accumulate(&record, false).context("accumulating operation-string stats")?;
        total_alignments += 1;
    }

    let aligned_bases = op_stats.matches + op_stats.mismatches;
    let identity = if aligned_bases == 0 {
        0.0
    } else {
        op_stats.matches as f64 / aligned_bases as f64
    };
    let aligned_bases_with_gaps = aligned_bases + op_stats.query_insert_bases + op_stats.query_delete_bases;
    let identity_with_gaps = if aligned_bases_with_gaps == 0 {
        0.0
    } else {
        op_stats.matches as f64 / aligned_bases_with_gaps as f64
    };

    if print_stats {
        writeln!(
            out,
            "Total-alignments: {}\tAvg-Identity: {:.4}\tAvg-Identity-with-gaps: {:.4}\tAligned-bases: {}\tAligned-bases-with-gaps: {}\tQuery-inserts: {}\tQuery-deletes: {}",
            total_alignments,
            identity,
            identity_with_gaps,
            aligned_bases,
            aligned_bases_with_gaps,
            op_stats.query_inserts,
            op_stats.query_deletes,
        )?;
    }

    if let Some(min) = min_identity {
        if identity < min {
            bail!("aggregate identity {identity:.4} fell below the required floor {min:.4}");
        }
    }
    if let Some(min) = min_aligned_bases {
        if aligned_bases < min {
            bail!("aggregate aligned-base count {aligned_bases} fell below the required floor {min}");
        }
    }

    out.flush().context("flushing output")?;
    Ok(())
}

fn render_summary(record: &Record) -> String {
    format!(
        "{}:{}-{} {} {}:{}-{} identity={:.4} mapq={}",
        record.query_name,
        record.query_start,
        record.query_end,
        if record.same_strand { '+' } else { '-' },
        record.target_name,
        record.target_start,
        record.target_end,
        stats::identity(record),
        record.mapping_quality,
    )
}

/// Print the base-level alignment beneath a record's summary line, in
/// fixed-width (150-column) line triples: target, match markers, query.
/// `*` marks a case-insensitive match, a space marks a mismatch, `-` fills
/// the gapped side.
fn render_alignment(out: &mut dyn Write, record: &Record, query_seq: &[u8], target_seq: &[u8]) -> Result<()> {
    const WIDTH: usize = 150;

    let cigar = match record.cigar.as_ref().and_then(|c| c.as_parsed()) {
        Some(c) => c,
        None => return Ok(()),
    };

    let mut target_line = Vec::new();
    let mut match_line = Vec::new();
    let mut query_line = Vec::new();

    let mut target_pos = record.target_start as usize;
    let mut query_pos = if record.same_strand {
        record.query_start as usize
    } else {
        record.query_end as usize
    };

    for op in cigar.iter() {
        for _ in 0..op.length {
            let t = if op.op.consumes_target() {
                let b = *target_seq.get(target_pos).unwrap_or(&b'N');
                target_pos += 1;
                b
            } else {
                b'-'
            };
            let q = if op.op.consumes_query() {
                let b = if record.same_strand {
                    let b = *query_seq.get(query_pos).unwrap_or(&b'N');
                    query_pos += 1;
                    b
                } else {
                    query_pos = query_pos.saturating_sub(1);
                    reverse_complement(*query_seq.get(query_pos).unwrap_or(&b'N'))
                };
                b
            } else {
                b'-'
            };
            let m = if t != b'-' && q != b'-' && t.to_ascii_uppercase() == q.to_ascii_uppercase() {
                b'*'
            } else {
                b' '
            };
            target_line.push(t);
            match_line.push(m);
            query_line.push(q);
        }
    }

    for chunk_start in (0..target_line.len()).step_by(WIDTH) {
        let end = (chunk_start + WIDTH).min(target_line.len());
        writeln!(out, "{}", String::from_utf8_lossy(&target_line[chunk_start..end]))?;
        writeln!(out, "{}", String::from_utf8_lossy(&match_line[chunk_start..end]))?;
        writeln!(out, "{}", String::from_utf8_lossy(&query_line[chunk_start..end]))?;
    }
    Ok(())
}

fn reverse_complement(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        other => other,
    }
}
