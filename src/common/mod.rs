//! Common functionality shared across the annotation pipeline.

use clap_verbosity_flag::{InfoLevel, Verbosity};
use indexmap::IndexMap;

pub mod io;

/// Commonly used command line arguments.
#[derive(clap::Parser, Debug, Clone)]
pub struct Args {
    /// Verbosity of the program.
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Canonical chromosome names, in karyotype order.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "M", "MT",
];

/// Build the fixed `name -> id` alias table of §4.2: every canonical form and
/// its `chr`-prefixed alternate resolve to the same id. `M` and `MT` are
/// distinct canonical names but are folded onto the same id, matching the
/// mitochondrial contig being named either way across DB/query dialects.
pub fn build_chrom_map() -> IndexMap<String, usize> {
    let mut result = IndexMap::new();
    for (i, &name) in CHROMS.iter().enumerate() {
        let id = if name == "MT" { 24 } else { i };
        result.entry(name.to_owned()).or_insert(id);
        result.entry(format!("chr{name}")).or_insert(id);
    }
    result
}

/// Compute the reciprocal overlap of two ranges (§4.5): the overlap length
/// divided by each range's own length, taking the smaller of the two ratios.
/// Zero when the ranges do not overlap.
pub fn reciprocal_overlap(lhs: std::ops::Range<i32>, rhs: std::ops::Range<i32>) -> f32 {
    let ovl_b = lhs.start.max(rhs.start);
    let ovl_e = lhs.end.min(rhs.end);
    if ovl_b >= ovl_e {
        0f32
    } else {
        let ovl_len = (ovl_e - ovl_b) as f32;
        let x1 = ovl_len / (lhs.end - lhs.start) as f32;
        let x2 = ovl_len / (rhs.end - rhs.start) as f32;
        x1.min(x2)
    }
}

/// The version of this package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
