//! Feature index (C4): parse a gene-annotation file (GFF3, GTF, or BED),
//! resolve feature names — following GFF3/GTF `Parent` chains transitively —
//! and flatten per-chromosome, per-gene overlapping intervals (§4.4).

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::annotate::pipeline::Pipeline;
use crate::common::io::open_read_maybe_gz;

/// One flattened, disjoint-within-label genomic interval (§3). Half-open
/// `[start, end)`, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalLabel {
    pub start: i32,
    pub end: i32,
    pub strand: char,
    pub lid: i32,
}

/// The parsed, flattened feature set: a gene-name table plus one sorted
/// interval list per chromosome id.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    pub gene_names: Vec<String>,
    pub protein_coding: Vec<bool>,
    pub regions: Vec<Vec<IntervalLabel>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Gff3,
    Gtf,
    Bed,
}

fn detect_format(path: &Path, first_line: &str) -> Format {
    let lower = path.to_string_lossy().to_ascii_lowercase();
    let stem = lower.strip_suffix(".gz").unwrap_or(&lower);
    if stem.ends_with(".gff3") || stem.ends_with(".gff") {
        Format::Gff3
    } else if stem.ends_with(".gtf") {
        Format::Gtf
    } else if first_line.starts_with("##gff") {
        Format::Gff3
    } else if first_line.starts_with("#!") {
        Format::Gtf
    } else {
        Format::Bed
    }
}

/// Split one attribute field into `(key, value)` pairs per the dialect's
/// separator conventions (§6): `key=value;…` for GFF3, `key "value";…` for GTF.
fn parse_attrs(attr: &str, format: Format) -> Vec<(String, String)> {
    attr.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|kv| match format {
            Format::Gff3 => {
                let (k, v) = kv.split_once('=')?;
                Some((k.trim().to_owned(), v.trim().to_owned()))
            }
            Format::Gtf => {
                let mut parts = kv.splitn(2, char::is_whitespace);
                let k = parts.next()?.trim();
                let v = parts.next()?.trim().trim_matches('"');
                Some((k.to_owned(), v.to_owned()))
            }
            Format::Bed => None,
        })
        .collect()
}

struct IdEntry {
    name: String,
    protein_coding: bool,
}

/// Build the transitive `own-ID -> (resolved name, protein_coding)` table
/// (`_buildIDdict`): one pass records each line's own id-attribute value and,
/// separately, its `Parent` link; a second pass walks every `Parent` chain,
/// copying the highest ancestor found in the id-name table back onto the
/// originating child id.
fn build_id_dict(lines: &[String], format: Format, id_attr: &str) -> HashMap<String, IdEntry> {
    let mut by_id: HashMap<String, IdEntry> = HashMap::new();
    let mut parent_of: HashMap<String, (String, bool)> = HashMap::new();

    for line in lines {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 9 {
            continue;
        }
        let attr = cols[8];
        let pairs = parse_attrs(attr, format);

        let mut id_val = String::new();
        let mut key_val = String::new();
        let mut protein_coding = false;
        for (k, v) in &pairs {
            if k == "ID" {
                id_val = v.clone();
            } else if k == id_attr {
                key_val = v.clone();
            } else if k == "biotype" && v == "protein_coding" {
                protein_coding = true;
            }
        }
        if !key_val.is_empty() || !id_val.is_empty() {
            let own_id = if id_val.is_empty() { key_val.clone() } else { id_val };
            by_id.insert(
                own_id,
                IdEntry {
                    name: key_val,
                    protein_coding,
                },
            );
        }

        let mut parent_val = String::new();
        let mut own_id2 = String::new();
        let mut protein_coding2 = false;
        let mut has_parent = false;
        for (k, v) in &pairs {
            if k == "ID" {
                own_id2 = v.clone();
            } else if k == "Parent" {
                parent_val = v.clone();
                has_parent = true;
            } else if k == "biotype" && v == "protein_coding" {
                protein_coding2 = true;
            }
        }
        if has_parent {
            parent_of.insert(own_id2, (parent_val, protein_coding2));
        }
    }

    for child in parent_of.keys().cloned().collect::<Vec<_>>() {
        let mut new_parent = parent_of[&child].0.clone();
        loop {
            if let Some(ancestor) = by_id.get(&new_parent) {
                let resolved = IdEntry {
                    name: ancestor.name.clone(),
                    protein_coding: ancestor.protein_coding,
                };
                by_id.insert(child.clone(), resolved);
            }
            match parent_of.get(&new_parent) {
                Some((next_parent, _)) => new_parent = next_parent.clone(),
                None => break,
            }
        }
    }

    by_id
}

/// Parse a gene-annotation file and build the flattened per-chromosome
/// feature index (§4.4). Returns `Ok(None)` if the file yielded no features
/// (§7: warn and continue without feature annotation).
pub fn load(
    path: &Path,
    id_attr: &str,
    feature_type: &str,
    pipeline: &Pipeline,
    n_chroms: usize,
) -> anyhow::Result<Option<FeatureIndex>> {
    let format = {
        let mut reader = open_read_maybe_gz(path)?;
        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        detect_format(path, first_line.trim_start())
    };

    if matches!(format, Format::Gff3 | Format::Gtf)
        && !path.to_string_lossy().to_ascii_lowercase().ends_with(".gz")
    {
        anyhow::bail!("GFF3/GTF feature files must be gzip-compressed: {}", path.display());
    }

    let lines: Vec<String> = open_read_maybe_gz(path)?
        .lines()
        .collect::<std::io::Result<_>>()?;
    let lines: Vec<String> = lines
        .into_iter()
        .filter(|l| !l.starts_with('#'))
        .collect();

    let mut gene_names = Vec::new();
    let mut protein_coding = Vec::new();
    let mut name_to_idx: HashMap<String, usize> = HashMap::new();
    let mut overlapping: Vec<Vec<IntervalLabel>> = vec![Vec::new(); n_chroms];

    match format {
        Format::Bed => {
            for line in &lines {
                let cols: Vec<&str> = line.split('\t').collect();
                if cols.len() < 3 {
                    continue;
                }
                let Some(chrid) = pipeline.lookup_chrom(cols[0]) else {
                    continue;
                };
                let start: i32 = cols[1].parse()?;
                let end: i32 = cols[2].parse()?;
                let name = cols.get(3).map(|s| s.to_string()).unwrap_or_else(|| {
                    format!("{}:{}-{}", cols[0], start, end)
                });
                let strand = cols
                    .get(5)
                    .and_then(|s| s.chars().next())
                    .unwrap_or('*');
                let idx = *name_to_idx.entry(name.clone()).or_insert_with(|| {
                    gene_names.push(name.clone());
                    protein_coding.push(false);
                    gene_names.len() - 1
                });
                if chrid < overlapping.len() {
                    overlapping[chrid].push(IntervalLabel {
                        start,
                        end,
                        strand,
                        lid: idx as i32,
                    });
                }
            }
        }
        Format::Gff3 | Format::Gtf => {
            let id_dict = build_id_dict(&lines, format, id_attr);

            for line in &lines {
                let cols: Vec<&str> = line.split('\t').collect();
                if cols.len() < 9 {
                    continue;
                }
                if cols[2] != feature_type {
                    continue;
                }
                let Some(chrid) = pipeline.lookup_chrom(cols[0]) else {
                    continue;
                };
                let start: i32 = cols[3].parse()?;
                let end: i32 = cols[4].parse()?;
                if start == 0 {
                    anyhow::bail!("feature file is not 1-based: {}", line);
                }
                if start > end {
                    anyhow::bail!("feature start greater than end: {}", line);
                }
                let strand = cols[6].chars().next().unwrap_or('*');
                let attr = cols[8];

                for (k, v) in parse_attrs(attr, format) {
                    if k != "ID" && k != "Parent" && k != id_attr {
                        continue;
                    }
                    let Some(entry) = id_dict.get(&v) else {
                        continue;
                    };
                    if entry.name.is_empty() {
                        continue;
                    }
                    let idx = *name_to_idx.entry(entry.name.clone()).or_insert_with(|| {
                        gene_names.push(entry.name.clone());
                        protein_coding.push(entry.protein_coding);
                        gene_names.len() - 1
                    });
                    if chrid < overlapping.len() {
                        overlapping[chrid].push(IntervalLabel {
                            start: start - 1,
                            end,
                            strand,
                            lid: idx as i32,
                        });
                    }
                }
            }
        }
    }

    if gene_names.is_empty() {
        tracing::warn!(path = %path.display(), "no features found in annotation file");
        return Ok(None);
    }

    let regions = overlapping.into_iter().map(flatten_chromosome).collect();

    Ok(Some(FeatureIndex {
        gene_names,
        protein_coding,
        regions,
    }))
}

/// Merge overlapping/adjacent intervals within each `lid` via sort-by-`lid`
/// then scan-and-coalesce with a running `[lo, hi]` accumulator (§9), then
/// sort the merged result by `start`.
fn flatten_chromosome(mut intervals: Vec<IntervalLabel>) -> Vec<IntervalLabel> {
    intervals.sort_by_key(|iv| (iv.lid, iv.start, iv.end));

    let mut flattened = Vec::new();
    let mut running_id = -1i32;
    let mut running_strand = '*';
    let mut lo = 0i32;
    let mut hi = -1i32;

    for iv in &intervals {
        if iv.lid != running_id {
            if lo <= hi {
                flattened.push(IntervalLabel {
                    start: lo,
                    end: hi,
                    strand: running_strand,
                    lid: running_id,
                });
            }
            running_id = iv.lid;
            running_strand = iv.strand;
            lo = iv.start;
            hi = iv.end;
        } else if iv.start <= hi {
            hi = hi.max(iv.end);
        } else {
            flattened.push(IntervalLabel {
                start: lo,
                end: hi,
                strand: running_strand,
                lid: running_id,
            });
            lo = iv.start;
            hi = iv.end;
        }
    }
    if lo <= hi {
        flattened.push(IntervalLabel {
            start: lo,
            end: hi,
            strand: running_strand,
            lid: running_id,
        });
    }

    flattened.sort_by_key(|iv| iv.start);
    flattened
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn flattens_overlapping_intervals_within_same_label() {
        let intervals = vec![
            IntervalLabel { start: 0, end: 10, strand: '+', lid: 0 },
            IntervalLabel { start: 5, end: 15, strand: '+', lid: 0 },
            IntervalLabel { start: 20, end: 30, strand: '-', lid: 1 },
        ];
        let flat = flatten_chromosome(intervals);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0], IntervalLabel { start: 0, end: 15, strand: '+', lid: 0 });
        assert_eq!(flat[1], IntervalLabel { start: 20, end: 30, strand: '-', lid: 1 });
    }

    #[test]
    fn keeps_non_adjacent_intervals_within_same_label_disjoint() {
        let intervals = vec![
            IntervalLabel { start: 0, end: 5, strand: '+', lid: 0 },
            IntervalLabel { start: 50, end: 60, strand: '+', lid: 0 },
        ];
        let flat = flatten_chromosome(intervals);
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn gff3_attrs_split_on_equals() {
        let pairs = parse_attrs("ID=gene:ENSG1;Name=FOO;biotype=protein_coding", Format::Gff3);
        assert!(pairs.contains(&("ID".to_owned(), "gene:ENSG1".to_owned())));
        assert!(pairs.contains(&("biotype".to_owned(), "protein_coding".to_owned())));
    }

    #[test]
    fn gtf_attrs_split_on_quoted_space() {
        let pairs = parse_attrs(r#"gene_id "ENSG1"; gene_name "FOO";"#, Format::Gtf);
        assert!(pairs.contains(&("gene_id".to_owned(), "ENSG1".to_owned())));
        assert!(pairs.contains(&("gene_name".to_owned(), "FOO".to_owned())));
    }

    #[test]
    fn transitive_parent_chain_resolves_to_gene_name() {
        let lines = vec![
            "chr1\tsrc\tgene\t1\t100\t.\t+\t.\tID=gene1;gene_name=FOO".to_owned(),
            "chr1\tsrc\tmRNA\t1\t100\t.\t+\t.\tID=mrna1;Parent=gene1".to_owned(),
            "chr1\tsrc\texon\t1\t50\t.\t+\t.\tID=exon1;Parent=mrna1".to_owned(),
        ];
        let dict = build_id_dict(&lines, Format::Gff3, "gene_name");
        assert_eq!(dict.get("exon1").unwrap().name, "FOO");
    }
}
