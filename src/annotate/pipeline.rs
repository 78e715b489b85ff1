//! The `Pipeline` value (§9): per-file `hasCT` flag and chromosome-map
//! growth threaded explicitly through ingest and matching, rather than held
//! in process-wide globals.

use indexmap::IndexMap;

use crate::common::build_chrom_map;

/// Unified chromosome dictionary plus the bits of mutable state that would
/// otherwise be global: whether any record observed so far carried a `CT`
/// tag, and (during DB ingest) the temporary secondary map for `CHR2` names
/// not yet seen as a primary `CHROM` (§4.2).
pub struct Pipeline {
    chrom_map: IndexMap<String, usize>,
    next_id: usize,
    has_ct: bool,
}

impl Pipeline {
    /// Start from the fixed alias table (§4.2); DB/query header names are
    /// folded in via [`Pipeline::observe_chrom`] before any decoding.
    pub fn new() -> Self {
        let chrom_map = build_chrom_map();
        let next_id = chrom_map.values().copied().max().map(|m| m + 1).unwrap_or(0);
        Self {
            chrom_map,
            next_id,
            has_ct: false,
        }
    }

    /// Register a chromosome name seen in a header, assigning a fresh id if
    /// it (and none of its aliases) has been seen before.
    pub fn observe_chrom(&mut self, name: &str) -> usize {
        if let Some(id) = self.chrom_map.get(name) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.chrom_map.insert(name.to_owned(), id);
        id
    }

    /// Look up a chromosome name without registering it; `None` means
    /// "unknown chromosome", handled per §7 (skip the record).
    pub fn lookup_chrom(&self, name: &str) -> Option<usize> {
        self.chrom_map.get(name).copied()
    }

    /// Number of distinct chromosome ids assigned so far; feature-index
    /// vectors are sized against this.
    pub fn chrom_count(&self) -> usize {
        self.next_id
    }

    pub fn mark_ct_seen(&mut self) {
        self.has_ct = true;
    }

    pub fn has_ct(&self) -> bool {
        self.has_ct
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-pass resolver for `CHR2` names observed during DB ingest before the
/// chromosome they refer to has appeared as a primary `CHROM` (§4.2).
///
/// Records are provisionally stored with a *local* index from this map; once
/// the DB stream is exhausted, [`Chr2Remap::resolve`] is called once per
/// local index to translate it into the (by-then-complete) unified id.
#[derive(Default)]
pub struct Chr2Remap {
    local_ids: IndexMap<String, usize>,
}

impl Chr2Remap {
    pub fn local_index(&mut self, name: &str) -> usize {
        let next = self.local_ids.len();
        *self.local_ids.entry(name.to_owned()).or_insert(next)
    }

    /// Build the `local index -> final id` table against the now-complete
    /// pipeline chromosome map.
    pub fn finalize(&self, pipeline: &Pipeline) -> Vec<usize> {
        let mut table = vec![0usize; self.local_ids.len()];
        for (name, local_idx) in &self.local_ids {
            table[*local_idx] = pipeline
                .lookup_chrom(name)
                .expect("CHR2 name must have been observed as a CHROM by end of DB ingest");
        }
        table
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn observe_chrom_reuses_alias_id() {
        let mut p = Pipeline::new();
        let a = p.observe_chrom("1");
        let b = p.observe_chrom("chr1");
        assert_eq!(a, b);
    }

    #[test]
    fn observe_chrom_assigns_fresh_id_for_new_name() {
        let mut p = Pipeline::new();
        let id = p.observe_chrom("scaffold_1");
        assert_eq!(p.lookup_chrom("scaffold_1"), Some(id));
        let id2 = p.observe_chrom("scaffold_2");
        assert_ne!(id, id2);
    }

    #[test]
    fn chr2_remap_resolves_local_indices() {
        let mut pipeline = Pipeline::new();
        let mut remap = Chr2Remap::default();

        let local_a = remap.local_index("chr3");
        let local_b = remap.local_index("chr5");
        assert_eq!(remap.local_index("chr3"), local_a);

        pipeline.observe_chrom("chr3");
        pipeline.observe_chrom("chr5");

        let table = remap.finalize(&pipeline);
        assert_eq!(table[local_a], pipeline.lookup_chrom("chr3").unwrap());
        assert_eq!(table[local_b], pipeline.lookup_chrom("chr5").unwrap());
    }
}
