//! CLI surface and orchestration (C7, ambient): wires the record decoder,
//! chromosome reconciler, DB ingest, feature index, matching engine and
//! feature proximity search together for the `annotate` subcommand (§4.7).

pub mod dbingest;
pub mod decode;
pub mod features;
pub mod matching;
pub mod output;
pub mod pipeline;
pub mod proximity;
pub mod record;

use std::path::{Path, PathBuf};

use rust_htslib::bcf::{self, Read};

use crate::annotate::decode::{decode_record, BcfRecordSource};
use crate::annotate::matching::{MatchConfig, Mode};
use crate::annotate::output::{MatchLogWriter, MatchRow};
use crate::annotate::pipeline::Pipeline;
use crate::annotate::record::Sv;
use crate::err::AppError;

/// `annotate` subcommand arguments (§6).
#[derive(clap::Parser, Debug, Clone)]
pub struct Args {
    /// Annotation database (BCF/VCF).
    #[arg(short = 'd', long = "db")]
    pub db: PathBuf,

    /// Query SVs (BCF/VCF).
    #[arg(short = 'q', long = "query")]
    pub query: PathBuf,

    /// Path for the annotated copy of the database.
    #[arg(short = 'a', long = "anno-out")]
    pub anno_out: PathBuf,

    /// Path for the gzip-compressed match log.
    #[arg(short = 'o', long = "match-out")]
    pub match_out: PathBuf,

    /// Breakpoint window, in base pairs.
    #[arg(short = 'b', long, default_value_t = 50)]
    pub bpwindow: i32,

    /// Minimum size-ratio / reciprocal-overlap threshold.
    #[arg(short = 'r', long, default_value_t = 0.8)]
    pub sizediff: f32,

    /// Matching strategy.
    #[arg(short = 's', long, value_enum, default_value_t = Mode::Best)]
    pub strategy: Mode,

    /// Disable SV-type matching.
    #[arg(short = 'n', long)]
    pub no_svtype_match: bool,

    /// Report query SVs with no match.
    #[arg(short = 'm', long)]
    pub report_no_match: bool,

    /// Gene-annotation file (GFF3/GTF/BED, optionally gzip-compressed).
    #[arg(short = 'g', long)]
    pub gtf: Option<PathBuf>,

    /// Attribute key carrying the feature identifier.
    #[arg(short = 'i', long, default_value = "gene_name")]
    pub id_attr: String,

    /// Feature type to index (GFF3/GTF column 3).
    #[arg(short = 'f', long, default_value = "gene")]
    pub feature: String,

    /// Maximum distance for feature proximity reporting.
    #[arg(short = 't', long, default_value_t = 1000)]
    pub max_distance: i32,

    /// Also report genes fully contained between the two breakpoints.
    #[arg(long)]
    pub contained_genes: bool,
}

fn ensure_output_writable(path: &Path) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::metadata(dir)
        .map_err(|_| AppError::OutputNotWritable(dir.display().to_string()))
        .and_then(|meta| {
            if meta.permissions().readonly() {
                Err(AppError::OutputNotWritable(dir.display().to_string()))
            } else {
                Ok(())
            }
        })
}

fn observe_header_chroms(pipeline: &mut Pipeline, header: &bcf::header::HeaderView) -> anyhow::Result<()> {
    for rid in 0..header.contig_count() {
        let name = std::str::from_utf8(header.rid2name(rid)?)?;
        pipeline.observe_chrom(name);
    }
    Ok(())
}

pub fn run(_common: &crate::common::Args, args: &Args) -> anyhow::Result<()> {
    ensure_output_writable(&args.anno_out)?;
    ensure_output_writable(&args.match_out)?;

    let mut pipeline = Pipeline::new();

    // C2: the unified chromosome map is populated eagerly by scanning both
    // headers before any record is decoded (§4.2).
    {
        let db_reader = bcf::Reader::from_path(&args.db).map_err(|e| AppError::HeaderOpen {
            path: args.db.display().to_string(),
            source: e.into(),
        })?;
        observe_header_chroms(&mut pipeline, db_reader.header())?;
    }
    let mut query_reader = bcf::Reader::from_path(&args.query).map_err(|e| AppError::HeaderOpen {
        path: args.query.display().to_string(),
        source: e.into(),
    })?;
    observe_header_chroms(&mut pipeline, query_reader.header())?;

    // C3.
    let (db_svs, ingest_stats) = dbingest::ingest_database(&args.db, &args.anno_out, &mut pipeline)?;
    tracing::info!(
        kept = ingest_stats.sites_kept,
        seen = ingest_stats.sites_seen,
        "parsed database records"
    );

    // C4, optional.
    let n_chroms = pipeline.chrom_count();
    let feature_index = match &args.gtf {
        Some(path) => features::load(path, &args.id_attr, &args.feature, &pipeline, n_chroms)?,
        None => None,
    };

    let match_cfg = MatchConfig {
        bpwindow: args.bpwindow,
        sizediff: args.sizediff,
        match_sv_type: !args.no_svtype_match,
        mode: args.strategy,
    };

    let mut writer = MatchLogWriter::create(&args.match_out, args.contained_genes)?;
    let query_header = query_reader.header().clone();

    let mut sites_seen = 0usize;
    let mut sites_matched = 0usize;
    let mut rows_written = 0usize;

    for result in query_reader.records() {
        let record = result?;
        sites_seen += 1;
        let source = BcfRecordSource::new(&record, &query_header)?;

        let decoded = match decode_record(&source, false) {
            Ok(d) => d,
            Err(reason) => {
                tracing::debug!(?reason, site = sites_seen, "skipping query record");
                continue;
            }
        };

        let Some(chr) = pipeline.lookup_chrom(source.chrom()) else {
            tracing::debug!(chrom = source.chrom(), "unknown chromosome in query");
            continue;
        };
        let Some(chr2) = pipeline.lookup_chrom(&decoded.chr2_name) else {
            tracing::debug!(chrom = %decoded.chr2_name, "unknown chromosome in query");
            continue;
        };

        // `q` is canonical (chr/chr2 and start/end may be swapped, §3) and
        // drives matching and proximity lookups, both of which only ever use
        // (q.chr, q.start) and (q.chr2, q.end) as matched pairs. The output
        // row below reports the un-swapped `decoded.start`/`decoded.end`
        // alongside the record's own `CHROM`/`CHR2` names (§6).
        let q = Sv::new(
            chr as i32,
            decoded.start,
            chr2 as i32,
            decoded.end,
            -1,
            decoded.qual,
            decoded.svt,
            decoded.svlen,
        )
        .canonicalize();

        let start_hits = feature_index
            .as_ref()
            .map(|idx| proximity::nearest(idx, q.chr as usize, q.start, args.max_distance))
            .unwrap_or_default();
        let end_hits = feature_index
            .as_ref()
            .map(|idx| proximity::nearest(idx, q.chr2 as usize, q.end, args.max_distance))
            .unwrap_or_default();
        let startfeature = proximity::format_tokens(&start_hits);
        let endfeature = proximity::format_tokens(&end_hits);
        let containedfeature = if args.contained_genes && q.chr == q.chr2 {
            feature_index.as_ref().map(|idx| {
                proximity::format_contained_tokens(&proximity::contained(idx, q.chr as usize, q.start, q.end))
            })
        } else {
            None
        };

        let matches = matching::find_matches(&db_svs, &q, &match_cfg);

        if matches.is_empty() {
            if args.report_no_match {
                writer.write_row(&MatchRow {
                    annoid: "None",
                    query_chr: source.chrom(),
                    query_start: decoded.start,
                    query_chr2: &decoded.chr2_name,
                    query_end: decoded.end,
                    query_id: source.id(),
                    query_qual: q.qual,
                    query_svtype: &decoded.svtype_label,
                    query_ct: &decoded.ct_label,
                    query_svlen: q.svlen,
                    query_startfeature: &startfeature,
                    query_endfeature: &endfeature,
                    query_containedfeature: containedfeature.as_deref(),
                })?;
                rows_written += 1;
            }
            continue;
        }

        sites_matched += 1;
        for m in &matches {
            let annoid = output::format_annoid(m.db_id);
            writer.write_row(&MatchRow {
                annoid: &annoid,
                query_chr: source.chrom(),
                query_start: decoded.start,
                query_chr2: &decoded.chr2_name,
                query_end: decoded.end,
                query_id: source.id(),
                query_qual: q.qual,
                query_svtype: &decoded.svtype_label,
                query_ct: &decoded.ct_label,
                query_svlen: q.svlen,
                query_startfeature: &startfeature,
                query_endfeature: &endfeature,
                query_containedfeature: containedfeature.as_deref(),
            })?;
            rows_written += 1;
        }
    }

    tracing::info!(sites_seen, sites_matched, rows_written, "annotation complete");

    Ok(())
}
