//! Match-log writer: the gzip-compressed TSV output of the matching engine
//! and feature proximity search (§6).

use std::io::Write;
use std::path::Path;

use crate::common::io::open_write_maybe_gz;

/// Render a DB id as `id` + 9-digit zero-padded decimal, or the literal
/// `"None"` for a no-match row.
pub fn format_annoid(id: i32) -> String {
    if id < 0 {
        "None".to_owned()
    } else {
        format!("id{id:0>9}")
    }
}

/// One emitted match-log row (§6).
#[allow(clippy::too_many_arguments)]
pub struct MatchRow<'a> {
    pub annoid: &'a str,
    pub query_chr: &'a str,
    pub query_start: i32,
    pub query_chr2: &'a str,
    pub query_end: i32,
    pub query_id: &'a str,
    pub query_qual: i32,
    pub query_svtype: &'a str,
    pub query_ct: &'a str,
    pub query_svlen: i32,
    pub query_startfeature: &'a str,
    pub query_endfeature: &'a str,
    pub query_containedfeature: Option<&'a str>,
}

pub struct MatchLogWriter {
    out: Box<dyn Write>,
    contained_genes: bool,
}

impl MatchLogWriter {
    pub fn create(path: &Path, contained_genes: bool) -> anyhow::Result<Self> {
        let mut out = open_write_maybe_gz(path)?;
        let mut header = String::from(
            "[1]ANNOID\tquery.chr\tquery.start\tquery.chr2\tquery.end\tquery.id\tquery.qual\
             \tquery.svtype\tquery.ct\tquery.svlen\tquery.startfeature\tquery.endfeature",
        );
        if contained_genes {
            header.push_str("\tquery.containedfeature");
        }
        writeln!(out, "{header}")?;
        Ok(Self { out, contained_genes })
    }

    pub fn write_row(&mut self, row: &MatchRow) -> anyhow::Result<()> {
        write!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.annoid,
            row.query_chr,
            row.query_start,
            row.query_chr2,
            row.query_end,
            row.query_id,
            row.query_qual,
            row.query_svtype,
            row.query_ct,
            row.query_svlen,
            row.query_startfeature,
            row.query_endfeature,
        )?;
        if self.contained_genes {
            writeln!(self.out, "\t{}", row.query_containedfeature.unwrap_or(""))?;
        } else {
            writeln!(self.out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn formats_zero_padded_annoid() {
        assert_eq!(format_annoid(42), "id000000042");
        assert_eq!(format_annoid(-1), "None");
    }

    #[test]
    fn header_includes_contained_feature_column_only_when_enabled() {
        let tmp = temp_testdir::TempDir::default();
        let path = tmp.join("out.tsv");
        {
            MatchLogWriter::create(&path, false).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("containedfeature"));

        let path2 = tmp.join("out2.tsv");
        {
            MatchLogWriter::create(&path2, true).unwrap();
        }
        let content2 = std::fs::read_to_string(&path2).unwrap();
        assert!(content2.contains("query.containedfeature"));
    }
}
