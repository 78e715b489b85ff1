//! Database ingest (C3): stream the annotation database once, decode and
//! canonicalize every record into the in-memory `Sv` vector, and emit an
//! annotated copy of the database carrying the `ANNOID` linking tag.

use std::path::Path;

use rust_htslib::bcf::{self, Read};

use crate::annotate::decode::{decode_record, BcfRecordSource};
use crate::annotate::pipeline::{Chr2Remap, Pipeline};
use crate::annotate::record::Sv;

#[derive(Debug, Default)]
pub struct IngestStats {
    pub sites_seen: usize,
    pub sites_kept: usize,
}

/// Stream `db_path`, writing an `ANNOID`-tagged copy to `anno_path` and
/// returning the canonically-sorted in-memory SV vector (§4.2, §4.3).
///
/// Bi-allelic filtering is enforced here (rule 9 of §4.1) but not during
/// query decoding; see the asymmetry note in the module docs of
/// [`crate::annotate::decode`].
pub fn ingest_database(
    db_path: &Path,
    anno_path: &Path,
    pipeline: &mut Pipeline,
) -> anyhow::Result<(Vec<Sv>, IngestStats)> {
    let mut reader = bcf::Reader::from_path(db_path)
        .map_err(|e| anyhow::anyhow!("could not open database {}: {e}", db_path.display()))?;
    let header = reader.header().clone();

    let mut out_header = bcf::Header::from_template(&header);
    out_header.remove_info(b"ANNOID");
    out_header.push_record(
        br#"##INFO=<ID=ANNOID,Number=1,Type=String,Description="Annotation ID that links query SVs to database SVs.">"#,
    );
    let mut writer = bcf::Writer::from_path(anno_path, &out_header, false, bcf::Format::Bcf)
        .map_err(|e| anyhow::anyhow!("could not create {}: {e}", anno_path.display()))?;

    let mut svs = Vec::new();
    let mut remap = Chr2Remap::default();
    let mut stats = IngestStats::default();
    let mut next_id: i32 = 0;

    for result in reader.records() {
        let mut record = result?;
        stats.sites_seen += 1;

        let source = BcfRecordSource::new(&record, &header)?;
        let chrom = source.chrom().to_owned();

        let decoded = match decode_record(&source, true) {
            Ok(d) => d,
            Err(reason) => {
                tracing::debug!(?reason, site = stats.sites_seen, "skipping database record");
                continue;
            }
        };
        if decoded.has_ct {
            pipeline.mark_ct_seen();
        }

        let chr = pipeline.observe_chrom(&chrom) as i32;
        let chr2_local = remap.local_index(&decoded.chr2_name) as i32;

        svs.push(Sv::new(
            chr,
            decoded.start,
            chr2_local,
            decoded.end,
            next_id,
            decoded.qual,
            decoded.svt,
            decoded.svlen,
        ));

        let id_tag = format!("id{:0>9}", next_id);
        record.translate(writer.header());
        record.push_info_string(b"ANNOID", &[id_tag.as_bytes()])?;
        writer.write(&record)?;

        next_id += 1;
        stats.sites_kept += 1;
    }

    let chr2_table = remap.finalize(pipeline);
    for sv in &mut svs {
        sv.chr2 = chr2_table[sv.chr2 as usize] as i32;
    }
    for sv in svs.iter_mut() {
        *sv = sv.canonicalize();
    }
    svs.sort();

    tracing::info!(
        kept = stats.sites_kept,
        seen = stats.sites_seen,
        "parsed database records"
    );

    Ok((svs, stats))
}

