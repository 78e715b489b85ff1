//! Matching engine (C5): sorted-sweep join between a query SV and the
//! canonically-sorted DB vector (§4.5).

use crate::annotate::record::Sv;
use crate::common::reciprocal_overlap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Best,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    pub bpwindow: i32,
    pub sizediff: f32,
    pub match_sv_type: bool,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchResult {
    pub db_id: i32,
    pub score: f32,
}

/// Run the sweep for one query SV and return the passing candidates, already
/// reduced to a single best-scoring row when `cfg.mode == Mode::Best`.
pub fn find_matches(db: &[Sv], q: &Sv, cfg: &MatchConfig) -> Vec<MatchResult> {
    let seed = (q.chr, (q.start - cfg.bpwindow).max(0), q.chr2, q.end, -1i32);
    let seed_idx = db.partition_point(|d| (d.chr, d.start, d.chr2, d.end, d.id) < seed);

    let mut candidates = Vec::new();
    for d in &db[seed_idx..] {
        if d.chr != q.chr {
            break;
        }
        if d.start - q.start > cfg.bpwindow {
            break;
        }
        if d.chr2 != q.chr2 {
            continue;
        }
        if cfg.match_sv_type && d.svt != q.svt {
            continue;
        }
        if (d.end - q.end).abs() > cfg.bpwindow {
            continue;
        }
        if d.id < 0 {
            continue;
        }

        let mut score = 0f32;
        if d.svlen > 0 && q.svlen > 0 {
            let ratio = d.svlen.min(q.svlen) as f32 / d.svlen.max(q.svlen) as f32;
            if ratio < cfg.sizediff {
                continue;
            }
            score += ratio;
        }

        // Reciprocal-overlap refinement, balanced intra-chromosomal SVs only
        // (svt < 4 or svt > 8; §9 Open Questions #3).
        if (d.svt < 4 || d.svt > 8)
            && (q.svt < 4 || q.svt > 8)
            && d.end - d.start == d.svlen
            && q.end - q.start == q.svlen
            && q.svlen > 0
            && d.svlen > 0
            && reciprocal_overlap(q.start..q.end, d.start..d.end) < cfg.sizediff
        {
            continue;
        }

        let max_diff = (d.start - q.start).abs().max((d.end - q.end).abs());
        score += if cfg.bpwindow > 0 {
            1.0 - (max_diff as f32 / cfg.bpwindow as f32)
        } else {
            1.0
        };

        candidates.push(MatchResult { db_id: d.id, score });
    }

    match cfg.mode {
        Mode::All => candidates,
        Mode::Best => {
            let best = candidates.into_iter().fold(None, |acc: Option<MatchResult>, cur| {
                match acc {
                    Some(prev) if cur.score <= prev.score => Some(prev),
                    _ => Some(cur),
                }
            });
            best.into_iter().collect()
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cfg(bpwindow: i32, sizediff: f32, mode: Mode) -> MatchConfig {
        MatchConfig {
            bpwindow,
            sizediff,
            match_sv_type: true,
            mode,
        }
    }

    #[test]
    fn exact_deletion_matches() {
        let db = vec![Sv::new(1, 100, 1, 200, 0, 60, 2, 100)];
        let q = Sv::new(1, 100, 1, 200, -1, 60, 2, 100);
        let results = find_matches(&db, &q, &cfg(50, 0.8, Mode::Best));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].db_id, 0);
    }

    #[test]
    fn off_by_thirty_matches_within_window_not_outside() {
        let db = vec![Sv::new(1, 100, 1, 500, 0, 60, 2, 400)];
        let q = Sv::new(1, 130, 1, 530, -1, 60, 2, 400);
        assert_eq!(find_matches(&db, &q, &cfg(50, 0.8, Mode::Best)).len(), 1);
        assert_eq!(find_matches(&db, &q, &cfg(20, 0.8, Mode::Best)).len(), 0);
    }

    #[test]
    fn bpwindow_zero_requires_exact_coordinates() {
        let db = vec![
            Sv::new(1, 100, 1, 200, 0, 60, 2, 100),
            Sv::new(1, 101, 1, 200, 1, 60, 2, 99),
        ];
        let q = Sv::new(1, 100, 1, 200, -1, 60, 2, 100);
        let results = find_matches(&db, &q, &cfg(0, 0.8, Mode::All));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].db_id, 0);
    }

    #[test]
    fn best_mode_keeps_first_on_tie() {
        let db = vec![
            Sv::new(1, 100, 1, 200, 0, 60, 2, 100),
            Sv::new(1, 100, 1, 200, 1, 60, 2, 100),
        ];
        let q = Sv::new(1, 100, 1, 200, -1, 60, 2, 100);
        let results = find_matches(&db, &q, &cfg(50, 0.8, Mode::Best));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].db_id, 0);
    }

    #[test]
    fn all_mode_reports_every_passing_candidate() {
        let db = vec![
            Sv::new(1, 100, 1, 200, 0, 60, 2, 100),
            Sv::new(1, 105, 1, 205, 1, 60, 2, 100),
        ];
        let q = Sv::new(1, 100, 1, 200, -1, 60, 2, 100);
        let results = find_matches(&db, &q, &cfg(50, 0.8, Mode::All));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn mismatched_chr2_is_skipped() {
        let db = vec![Sv::new(1, 100, 2, 200, 0, 60, 2, 100)];
        let q = Sv::new(1, 100, 1, 200, -1, 60, 2, 100);
        assert!(find_matches(&db, &q, &cfg(50, 0.8, Mode::Best)).is_empty());
    }
}
