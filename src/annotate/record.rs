//! The canonical SV tuple (§3) and its ordering/canonicalization rules.

use std::cmp::Ordering;

/// Connection-type block for translocations/breakends (`svt` 5..=8).
pub const SVT_TRANS: i32 = 5;

/// A canonical structural variant: eight fields, 32 bytes, two per cache line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sv {
    /// Reference index of the first breakpoint.
    pub chr: i32,
    /// 1-based inclusive position of the first breakpoint.
    pub start: i32,
    /// Reference index of the second breakpoint.
    pub chr2: i32,
    /// 1-based inclusive position of the second breakpoint.
    pub end: i32,
    /// Stable id assigned during DB ingest; -1 for query SVs.
    pub id: i32,
    /// Integer truncation of QUAL; 0 if missing/negative.
    pub qual: i32,
    /// Numeric SV type, see the `svt` table in the module docs.
    pub svt: i32,
    /// Non-negative SV length; -1 if unknown.
    pub svlen: i32,
}

impl Sv {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chr: i32,
        start: i32,
        chr2: i32,
        end: i32,
        id: i32,
        qual: i32,
        svt: i32,
        svlen: i32,
    ) -> Self {
        Self {
            chr,
            start,
            chr2,
            end,
            id,
            qual,
            svt,
            svlen,
        }
    }

    /// Whether `svt` falls in the translocation/breakend block (§3).
    pub fn is_translocation(&self) -> bool {
        (SVT_TRANS..SVT_TRANS + 4).contains(&self.svt)
    }

    /// Canonicalize translocation orientation in place (§3): after this call,
    /// every translocation satisfies `chr >= chr2`. Idempotent.
    pub fn canonicalize(mut self) -> Self {
        if self.is_translocation() && self.chr < self.chr2 {
            std::mem::swap(&mut self.chr, &mut self.chr2);
            std::mem::swap(&mut self.start, &mut self.end);
            // 3to5 (7) <-> 5to3 (8) flip; 3to3 (5) and 5to5 (6) are symmetric.
            self.svt = match self.svt - SVT_TRANS {
                2 => SVT_TRANS + 3,
                3 => SVT_TRANS + 2,
                other => SVT_TRANS + other,
            };
        }
        self
    }
}

/// Canonical total order (§3): lexicographic on `(chr, start, chr2, end, id)`.
impl Ord for Sv {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.chr, self.start, self.chr2, self.end, self.id).cmp(&(
            other.chr,
            other.start,
            other.chr2,
            other.end,
            other.id,
        ))
    }
}

impl PartialOrd for Sv {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Map a `(SVTYPE, CT)` label pair to a numeric `svt` code (§3, §4.1 step 8).
///
/// `BND`/`TRA` always land in the 5..=8 block, keyed purely by `CT`; a missing
/// or unrecognized `CT` is rejected there since there is no single natural
/// connection for a breakend. Elsewhere, an explicit `CT` of `3to3`/`5to5`/
/// `3to5`/`5to3` is honored directly (it is the ground truth the caller
/// observed); a missing `CT` falls back to the type's own natural connection
/// (`DEL` -> `3to5`, `DUP` -> `5to3`, `INV` -> `3to3`, `INS` -> `NtoN`).
/// `CNV` and numeric subtype pass-throughs (`9`..=`13`) ignore `CT` entirely.
pub fn encode_svt(svtype: &str, ct: &str) -> Option<i32> {
    if svtype.eq_ignore_ascii_case("BND") || svtype.eq_ignore_ascii_case("TRA") {
        return match ct {
            "3to3" => Some(SVT_TRANS),
            "5to5" => Some(SVT_TRANS + 1),
            "3to5" => Some(SVT_TRANS + 2),
            "5to3" => Some(SVT_TRANS + 3),
            _ => None,
        };
    }

    if svtype.eq_ignore_ascii_case("CNV") {
        return Some(9);
    }
    if let Ok(code @ 9..=13) = svtype.parse::<i32>() {
        return Some(code);
    }

    match ct {
        "3to3" => Some(0),
        "5to5" => Some(1),
        "3to5" => Some(2),
        "5to3" => Some(3),
        "NtoN" => Some(4),
        "NA" | "" => match svtype.to_ascii_uppercase().as_str() {
            "DEL" => Some(2),
            "DUP" => Some(3),
            "INV" => Some(0),
            "INS" => Some(4),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn translocation_canonicalization_swaps_and_is_idempotent() {
        let sv = Sv::new(1, 100, 3, 200, 0, 0, SVT_TRANS + 2, -1); // chr1:100 -- chr3:200, 3to5
        let canon = sv.canonicalize();
        assert_eq!(canon.chr, 3);
        assert_eq!(canon.chr2, 1);
        assert_eq!(canon.start, 200);
        assert_eq!(canon.end, 100);
        assert_eq!(canon.svt, SVT_TRANS + 3); // flipped to 5to3

        assert_eq!(canon, canon.canonicalize());
    }

    #[test]
    fn translocation_already_canonical_is_unchanged() {
        let sv = Sv::new(3, 200, 1, 100, 0, 0, SVT_TRANS + 3, -1);
        assert_eq!(sv, sv.canonicalize());
    }

    #[test]
    fn non_translocation_is_unaffected_by_canonicalize() {
        let sv = Sv::new(1, 200, 3, 100, 0, 0, 2, 50);
        assert_eq!(sv, sv.canonicalize());
    }

    #[test]
    fn ordering_is_lexicographic_on_chr_start_chr2_end_id() {
        let a = Sv::new(1, 100, 1, 200, 0, 0, 2, 100);
        let b = Sv::new(1, 100, 1, 200, 1, 0, 2, 100);
        let c = Sv::new(1, 150, 1, 200, 0, 0, 2, 50);
        assert!(a < b);
        assert!(a < c);
    }

    #[rstest::rstest]
    #[case("DEL", "3to5", Some(2))]
    #[case("DEL", "NA", Some(2))]
    #[case("DUP", "5to3", Some(3))]
    #[case("DUP", "NA", Some(3))]
    #[case("INV", "3to3", Some(0))]
    #[case("INV", "5to5", Some(1))]
    #[case("INV", "NA", Some(0))]
    #[case("INS", "NtoN", Some(4))]
    #[case("INS", "NA", Some(4))]
    #[case("CNV", "NA", Some(9))]
    #[case("BND", "3to3", Some(5))]
    #[case("BND", "5to5", Some(6))]
    #[case("BND", "3to5", Some(7))]
    #[case("BND", "5to3", Some(8))]
    #[case("TRA", "5to3", Some(8))]
    #[case("BND", "NA", None)]
    #[case("WEIRD", "NA", None)]
    #[case("11", "NA", Some(11))]
    fn encode_svt_table(#[case] svtype: &str, #[case] ct: &str, #[case] expected: Option<i32>) {
        assert_eq!(expected, encode_svt(svtype, ct));
    }
}
