//! Feature proximity (C6): nearest/contained gene features around each query
//! breakpoint (§4.6).

use crate::annotate::features::FeatureIndex;

/// One `(gene name, distance, strand)` hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityHit {
    pub name: String,
    pub distance: i32,
    pub strand: char,
}

/// Scan the sorted interval list for chromosome `rid` around breakpoint `bp`,
/// bounded by `max_distance`, returning hits sorted by distance ascending.
pub fn nearest(index: &FeatureIndex, rid: usize, bp: i32, max_distance: i32) -> Vec<ProximityHit> {
    let Some(regions) = index.regions.get(rid) else {
        return Vec::new();
    };

    let mut hits = Vec::new();
    for iv in regions {
        if iv.end + max_distance < bp {
            continue;
        }
        if iv.start > bp + max_distance {
            break;
        }
        let distance = if bp >= iv.start && bp <= iv.end {
            0
        } else if bp > iv.end {
            iv.end - bp
        } else {
            iv.start - bp
        };
        hits.push(ProximityHit {
            name: index.gene_names[iv.lid as usize].clone(),
            distance,
            strand: iv.strand,
        });
    }

    hits.sort_by_key(|h| h.distance);
    hits
}

/// Render hits as `name(distance;strand)` tokens joined by commas.
pub fn format_tokens(hits: &[ProximityHit]) -> String {
    hits.iter()
        .map(|h| format!("{}({};{})", h.name, h.distance, h.strand))
        .collect::<Vec<_>>()
        .join(",")
}

/// Genes fully contained in `[start, end]` on one chromosome (contained-genes
/// reporting, §4.6).
pub fn contained(index: &FeatureIndex, rid: usize, start: i32, end: i32) -> Vec<ProximityHit> {
    let Some(regions) = index.regions.get(rid) else {
        return Vec::new();
    };
    regions
        .iter()
        .filter(|iv| iv.start >= start && iv.end <= end)
        .map(|iv| ProximityHit {
            name: index.gene_names[iv.lid as usize].clone(),
            distance: 0,
            strand: iv.strand,
        })
        .collect()
}

/// Render contained-gene hits as `name(strand)` tokens joined by commas.
pub fn format_contained_tokens(hits: &[ProximityHit]) -> String {
    hits.iter()
        .map(|h| format!("{}({})", h.name, h.strand))
        .collect::<Vec<_>>()
        .join(",")
}
