use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

use super::pipeline::RankedCandidate;

/// Picks today's match from a ranked list.
///
/// Users matched within the recent window are skipped; the pick is uniform
/// among the best `top_picks` that remain. When every candidate is recent the
/// whole ranked list is used instead.
pub fn select_daily<R: Rng + ?Sized>(
    ranked: Vec<RankedCandidate>,
    recent: &HashSet<Uuid>,
    top_picks: usize,
    rng: &mut R,
) -> Option<RankedCandidate> {
    if ranked.is_empty() {
        return None;
    }

    let (fresh, stale): (Vec<_>, Vec<_>) = ranked
        .into_iter()
        .partition(|candidate| !recent.contains(&candidate.profile.id));

    let pool = if fresh.is_empty() { stale } else { fresh };
    let top = &pool[..pool.len().min(top_picks.max(1))];
    top.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::recommendation::RecommendationKind;
    use crate::matching::{pipeline::MatchingEngine, scoring::MatchingConfig, RankingCriteria};
    use crate::profile::{fixtures::profile, Similarity};
    use chrono::Utc;
    use rand::{rngs::StdRng, SeedableRng};

    fn ranked(count: usize) -> Vec<RankedCandidate> {
        let user = profile("Me");
        let pool: Vec<_> = (0..count).map(|i| profile(&format!("P{i}"))).collect();
        let criteria = RankingCriteria::new(RecommendationKind::DailyMatch, Similarity::Similar)
            .with_limit(20);
        MatchingEngine::new(MatchingConfig::default())
            .rank(&user, &pool, &HashSet::new(), &criteria, Utc::now())
            .ranked
    }

    #[test]
    fn picks_from_top_five_fresh_candidates() {
        let list = ranked(10);
        let recent: HashSet<Uuid> = list.iter().take(2).map(|c| c.profile.id).collect();
        let allowed: HashSet<Uuid> = list.iter().skip(2).take(5).map(|c| c.profile.id).collect();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let pick = select_daily(list.clone(), &recent, 5, &mut rng).unwrap();
            assert!(allowed.contains(&pick.profile.id));
        }
    }

    #[test]
    fn falls_back_when_everyone_is_recent() {
        let list = ranked(3);
        let recent: HashSet<Uuid> = list.iter().map(|c| c.profile.id).collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_daily(list, &recent, 5, &mut rng).is_some());
    }

    #[test]
    fn empty_ranking_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_daily(Vec::new(), &HashSet::new(), 5, &mut rng).is_none());
    }
}
