//! Record decoder (C1): turn one raw VCF/BCF record into a canonical SV
//! tuple, or reject it (§4.1).
//!
//! Decoding is written once against the [`RecordSource`] trait so it never
//! touches `rust_htslib` directly; only [`BcfRecordSource`] does.

use std::sync::OnceLock;

use regex::Regex;

use crate::err::RejectReason;

/// The capability set a record source must provide (§9 "Polymorphism over
/// record sources"). One implementation per underlying VCF library; the
/// decode logic in this module is written once against the trait.
pub trait RecordSource {
    fn chrom(&self) -> &str;
    /// 0-based POS, as htslib/VCF libraries commonly expose it.
    fn pos0(&self) -> i32;
    /// The VCF ID column, `"."` when absent.
    fn id(&self) -> &str;
    fn qual(&self) -> Option<f32>;
    fn ref_allele(&self) -> &str;
    fn alt_alleles(&self) -> &[String];
    fn info_string(&self, key: &str) -> Option<String>;
    fn info_int32(&self, key: &str) -> Option<i32>;
    #[allow(dead_code)]
    fn filters(&self) -> &[String];
    fn n_alleles(&self) -> usize;
}

/// Decoded fields, prior to chromosome-name resolution (C2 runs after C1).
#[derive(Debug, Clone)]
pub struct Decoded {
    pub chr2_name: String,
    pub start: i32,
    pub end: i32,
    pub qual: i32,
    pub svt: i32,
    pub svlen: i32,
    pub svtype_label: String,
    pub ct_label: String,
    pub has_ct: bool,
}

fn bnd_re() -> &'static Regex {
    static BND_RE: OnceLock<Regex> = OnceLock::new();
    BND_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z.]*[\[\]]([^:\[\]]+):(\d+)[\[\]][A-Za-z.]*$").unwrap()
    })
}

/// Extract `(chr2_name, pos)` from a BND ALT allele of the form `t[chr:pos[`
/// (or any of the other three bracket orientations), per §4.1 rule 6.
fn parse_bnd_alt(alt: &str) -> Option<(String, i32)> {
    let caps = bnd_re().captures(alt)?;
    let chrom = caps.get(1)?.as_str().to_owned();
    let pos: i32 = caps.get(2)?.as_str().parse().ok()?;
    Some((chrom, pos))
}

/// Reclassify a same-chromosome BND into a concrete type using `SVCLASS`
/// first, then `CT`, per §4.1 rule 6. Returns `(svtype_label, ct_label)`.
fn reclassify_bnd(svclass: Option<&str>, ct_label: &str) -> Option<(String, String)> {
    if let Some(class) = svclass {
        let mapped = match class {
            "DEL" => Some(("DEL", "3to5")),
            "DUP" => Some(("DUP", "5to3")),
            "h2hINV" => Some(("INV", "3to3")),
            "t2tINV" => Some(("INV", "5to5")),
            "INS" => Some(("INS", "NtoN")),
            _ => None,
        };
        if let Some((t, c)) = mapped {
            return Some((t.to_owned(), c.to_owned()));
        }
    }
    let mapped = match ct_label {
        "3to5" => Some("DEL"),
        "5to3" => Some("DUP"),
        "3to3" | "5to5" => Some("INV"),
        "NtoN" => Some("INS"),
        _ => None,
    };
    mapped.map(|t| (t.to_owned(), ct_label.to_owned()))
}

/// Decode one record per the resolution rules of §4.1.
///
/// `enforce_biallelic` gates rule 9: it is set during DB ingest and cleared
/// for query decoding (§9 Open Questions #2 — the source's asymmetry is
/// preserved deliberately, not normalized).
pub fn decode_record<R: RecordSource>(
    rec: &R,
    enforce_biallelic: bool,
) -> Result<Decoded, RejectReason> {
    if enforce_biallelic && rec.n_alleles() != 2 {
        return Err(RejectReason::MultiAllelic);
    }

    // Rule 1: SVTYPE.
    let symbolic_alt = rec.alt_alleles().first().and_then(|a| {
        a.strip_prefix('<')
            .and_then(|a| a.strip_suffix('>'))
            .map(|a| a.to_owned())
    });
    let mut svtype_label = rec
        .info_string("SVTYPE")
        .or(symbolic_alt)
        .ok_or(RejectReason::MissingSvType)?;

    // Rule 2: CT.
    let has_ct = rec.info_string("CT").is_some();
    let mut ct_label = rec.info_string("CT").unwrap_or_else(|| "NA".to_owned());

    // Rule 3: CHR2.
    let mut chr2_name = rec.info_string("CHR2").unwrap_or_else(|| rec.chrom().to_owned());

    // Rule 4 + 5: POS2, END, SVLEN, endPos derivation.
    let pos2 = rec.info_int32("POS2");
    let end_info = rec.info_int32("END");
    let svlen_info = rec.info_int32("SVLEN");
    let start = rec.pos0() + 1;

    let mut end = match (pos2, end_info) {
        (Some(p2), Some(e)) => {
            if svtype_label.eq_ignore_ascii_case("BND") || svtype_label.eq_ignore_ascii_case("TRA")
            {
                p2
            } else {
                e
            }
        }
        (Some(p2), None) => p2,
        (None, Some(e)) => e,
        (None, None) => {
            if svtype_label.eq_ignore_ascii_case("INS") {
                rec.pos0() + 2
            } else if svtype_label.eq_ignore_ascii_case("DEL") {
                let alt = rec.alt_alleles().first().map(String::as_str).unwrap_or("");
                let ref_allele = rec.ref_allele();
                let is_symbolic = alt.starts_with('<');
                if !is_symbolic && ref_allele.len() > alt.len() {
                    rec.pos0() + 1 + (ref_allele.len() - alt.len()) as i32
                } else {
                    -1
                }
            } else {
                -1
            }
        }
    };

    // Rule 6: BND ALT parsing, only when endPos is still unresolved.
    if end == -1 && svtype_label.eq_ignore_ascii_case("BND") {
        let alt = rec
            .alt_alleles()
            .first()
            .map(String::as_str)
            .unwrap_or("");
        let (mate_chrom, mate_pos) = parse_bnd_alt(alt).ok_or(RejectReason::UnparseableBnd)?;
        chr2_name = mate_chrom;
        end = mate_pos;

        if chr2_name == rec.chrom() {
            let svclass = rec.info_string("SVCLASS");
            let (reclass_type, reclass_ct) =
                reclassify_bnd(svclass.as_deref(), &ct_label).ok_or(RejectReason::UnparseableBnd)?;
            svtype_label = reclass_type;
            ct_label = reclass_ct;
        }
    }

    // Rule 7: svlen.
    let svlen = if let Some(l) = svlen_info {
        l.abs()
    } else if matches!(
        svtype_label.to_ascii_uppercase().as_str(),
        "DEL" | "DUP" | "INV"
    ) {
        end - start
    } else {
        -1
    };

    // Rule 8: svt encoding.
    let svt = super::record::encode_svt(&svtype_label, &ct_label)
        .ok_or(RejectReason::UnknownCtSvTypeCombination)?;

    let qual = rec.qual().map(|q| q as i32).filter(|q| *q > 0).unwrap_or(0);

    Ok(Decoded {
        chr2_name,
        start,
        end,
        qual,
        svt,
        svlen,
        svtype_label,
        ct_label,
        has_ct,
    })
}

/// [`RecordSource`] backed by `rust_htslib::bcf::Record`.
pub struct BcfRecordSource<'a> {
    record: &'a rust_htslib::bcf::Record<'a>,
    chrom: String,
    id: String,
    alt_alleles: Vec<String>,
    ref_allele: String,
    filters: Vec<String>,
}

impl<'a> BcfRecordSource<'a> {
    pub fn new(
        record: &'a rust_htslib::bcf::Record<'a>,
        header: &rust_htslib::bcf::header::HeaderView,
    ) -> anyhow::Result<Self> {
        let rid = record
            .rid()
            .ok_or_else(|| anyhow::anyhow!("record has no RID"))?;
        let chrom = std::str::from_utf8(header.rid2name(rid)?)?.to_owned();
        let id = String::from_utf8_lossy(&record.id()).into_owned();

        let alleles = record.alleles();
        let ref_allele = alleles
            .first()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .unwrap_or_default();
        let alt_alleles = alleles
            .iter()
            .skip(1)
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();

        // FILTER is part of the record-source capability set (§9) for
        // collaborators like `markdup` but is not consulted by any rule in
        // the decode/match/proximity pipeline implemented here.
        let filters = Vec::new();

        Ok(Self {
            record,
            chrom,
            id,
            alt_alleles,
            ref_allele,
            filters,
        })
    }
}

impl RecordSource for BcfRecordSource<'_> {
    fn chrom(&self) -> &str {
        &self.chrom
    }

    fn pos0(&self) -> i32 {
        self.record.pos() as i32
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn qual(&self) -> Option<f32> {
        let q = self.record.qual();
        if q.is_nan() {
            None
        } else {
            Some(q)
        }
    }

    fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    fn alt_alleles(&self) -> &[String] {
        &self.alt_alleles
    }

    fn info_string(&self, key: &str) -> Option<String> {
        let values = self.record.info(key.as_bytes()).string().ok().flatten()?;
        let first = values.first()?;
        let s = std::str::from_utf8(first).ok()?;
        if s.is_empty() || s == "." {
            None
        } else {
            Some(s.to_owned())
        }
    }

    fn info_int32(&self, key: &str) -> Option<i32> {
        let values = self.record.info(key.as_bytes()).integer().ok().flatten()?;
        values.first().copied()
    }

    fn filters(&self) -> &[String] {
        &self.filters
    }

    fn n_alleles(&self) -> usize {
        self.record.allele_count() as usize
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Fake {
        chrom: String,
        pos0: i32,
        id: String,
        qual: Option<f32>,
        ref_allele: String,
        alt_alleles: Vec<String>,
        info_str: std::collections::HashMap<&'static str, String>,
        info_int: std::collections::HashMap<&'static str, i32>,
        n_alleles: usize,
    }

    impl RecordSource for Fake {
        fn chrom(&self) -> &str {
            &self.chrom
        }
        fn pos0(&self) -> i32 {
            self.pos0
        }
        fn id(&self) -> &str {
            &self.id
        }
        fn qual(&self) -> Option<f32> {
            self.qual
        }
        fn ref_allele(&self) -> &str {
            &self.ref_allele
        }
        fn alt_alleles(&self) -> &[String] {
            &self.alt_alleles
        }
        fn info_string(&self, key: &str) -> Option<String> {
            self.info_str.get(key).cloned()
        }
        fn info_int32(&self, key: &str) -> Option<i32> {
            self.info_int.get(key).copied()
        }
        fn filters(&self) -> &[String] {
            &[]
        }
        fn n_alleles(&self) -> usize {
            self.n_alleles
        }
    }

    fn base(chrom: &str, pos0: i32) -> Fake {
        Fake {
            chrom: chrom.to_owned(),
            pos0,
            id: ".".to_owned(),
            qual: Some(60.0),
            ref_allele: "N".to_owned(),
            alt_alleles: vec!["<DEL>".to_owned()],
            info_str: Default::default(),
            info_int: Default::default(),
            n_alleles: 2,
            }
    }

    #[test]
    fn exact_deletion_scenario() {
        let mut rec = base("chr1", 99);
        rec.info_str.insert("SVTYPE", "DEL".to_owned());
        rec.info_int.insert("END", 200);
        rec.info_int.insert("SVLEN", 100);

        let d = decode_record(&rec, false).unwrap();
        assert_eq!(d.start, 100);
        assert_eq!(d.end, 200);
        assert_eq!(d.svt, 2);
        assert_eq!(d.svlen, 100);
        assert_eq!(d.svtype_label, "DEL");
        assert_eq!(d.ct_label, "NA");
    }

    #[test]
    fn bnd_with_svclass_reclassifies_to_del() {
        let mut rec = base("chr1", 99);
        rec.alt_alleles = vec!["A[chr1:500[".to_owned()];
        rec.info_str.insert("SVTYPE", "BND".to_owned());
        rec.info_str.insert("SVCLASS", "DEL".to_owned());

        let d = decode_record(&rec, false).unwrap();
        assert_eq!(d.end, 500);
        assert_eq!(d.svtype_label, "DEL");
        assert_eq!(d.svt, 2);
    }

    #[test]
    fn bnd_interchromosomal_stays_bnd() {
        let mut rec = base("chr1", 99);
        rec.alt_alleles = vec!["A[chr2:500[".to_owned()];
        rec.info_str.insert("SVTYPE", "BND".to_owned());
        rec.info_str.insert("CT", "3to3".to_owned());

        let d = decode_record(&rec, false).unwrap();
        assert_eq!(d.chr2_name, "chr2");
        assert_eq!(d.end, 500);
        assert_eq!(d.svt, 5);
        assert!(d.has_ct);
    }

    #[test]
    fn missing_svtype_and_non_symbolic_alt_rejects() {
        let mut rec = base("chr1", 99);
        rec.alt_alleles = vec!["A".to_owned()];
        assert_eq!(
            decode_record(&rec, false).unwrap_err(),
            RejectReason::MissingSvType
        );
    }

    #[test]
    fn multiallelic_rejected_only_when_enforced() {
        let mut rec = base("chr1", 99);
        rec.n_alleles = 3;
        rec.info_str.insert("SVTYPE", "DEL".to_owned());
        rec.info_int.insert("END", 200);

        assert_eq!(
            decode_record(&rec, true).unwrap_err(),
            RejectReason::MultiAllelic
        );
        assert!(decode_record(&rec, false).is_ok());
    }

    #[test]
    fn insertion_fallback_endpos() {
        let mut rec = base("chr1", 99);
        rec.info_str.insert("SVTYPE", "INS".to_owned());
        let d = decode_record(&rec, false).unwrap();
        assert_eq!(d.end, 101); // pos0 + 2
        assert_eq!(d.svt, 4);
    }

    #[test]
    fn deletion_ref_alt_length_fallback() {
        let mut rec = base("chr1", 99);
        rec.info_str.insert("SVTYPE", "DEL".to_owned());
        rec.ref_allele = "ACGTACGT".to_owned();
        rec.alt_alleles = vec!["A".to_owned()];
        let d = decode_record(&rec, false).unwrap();
        assert_eq!(d.end, 99 + 1 + 7); // pos0 + 1 + (8-1)
    }
}
