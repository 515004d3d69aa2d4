use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{
    factors::gender_compatible,
    scoring::{CompatibilityEngine, CompatibilityScore, MatchingConfig},
};
use crate::api::recommendation::RecommendationKind;
use crate::profile::{Campus, Similarity, UserProfile};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;
/// Ranks that are never reshuffled by the diversity pass.
pub const DIVERSITY_PROTECTED: usize = 3;
pub const DIVERSITY_PENALTY: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct RankingCriteria {
    pub kind: RecommendationKind,
    pub similarity: Similarity,
    /// Overrides [`MatchingConfig::min_score`] when set.
    pub min_score: Option<f64>,
    pub limit: usize,
    pub offset: usize,
    pub require_verified: bool,
    pub campus: Option<Campus>,
    pub active_within_days: Option<i64>,
    /// Spreads repeated (campus, branch) groups below the protected ranks.
    /// Off by default: plain ranking is strictly descending.
    pub diversify: bool,
}

impl RankingCriteria {
    pub fn new(kind: RecommendationKind, similarity: Similarity) -> Self {
        Self {
            kind,
            similarity,
            min_score: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            require_verified: true,
            campus: None,
            active_within_days: None,
            diversify: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_diversity(mut self) -> Self {
        self.diversify = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub profile: UserProfile,
    pub score: CompatibilityScore,
}

#[derive(Debug, Clone, Default)]
pub struct RankingOutcome {
    pub ranked: Vec<RankedCandidate>,
    /// Candidates that passed every filter and the threshold, before pagination.
    pub total_candidates: usize,
}

pub struct MatchingEngine {
    engine: CompatibilityEngine,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            engine: CompatibilityEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn compatibility(&self) -> &CompatibilityEngine {
        &self.engine
    }

    /// Filter, score, order and paginate `candidates` for `user`.
    pub fn rank(
        &self,
        user: &UserProfile,
        candidates: &[UserProfile],
        exclusions: &HashSet<Uuid>,
        criteria: &RankingCriteria,
        now: DateTime<Utc>,
    ) -> RankingOutcome {
        let min_score = criteria.min_score.unwrap_or(self.config.min_score);

        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .filter(|candidate| self.is_eligible(user, candidate, exclusions, criteria, now))
            .filter_map(|candidate| {
                let score =
                    self.engine
                        .score(user, candidate, criteria.kind, criteria.similarity, now);
                (score.total > min_score).then(|| RankedCandidate {
                    profile: candidate.clone(),
                    score,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            match b
                .score
                .total
                .partial_cmp(&a.score.total)
                .unwrap_or(Ordering::Equal)
            {
                Ordering::Equal => a.profile.id.cmp(&b.profile.id),
                other => other,
            }
        });

        let total_candidates = ranked.len();
        let ranked = if criteria.diversify {
            apply_diversity(ranked)
        } else {
            ranked
        };
        let ranked = ranked
            .into_iter()
            .skip(criteria.offset)
            .take(criteria.limit.clamp(1, MAX_LIMIT))
            .collect();

        RankingOutcome {
            ranked,
            total_candidates,
        }
    }

    fn is_eligible(
        &self,
        user: &UserProfile,
        candidate: &UserProfile,
        exclusions: &HashSet<Uuid>,
        criteria: &RankingCriteria,
        now: DateTime<Utc>,
    ) -> bool {
        if candidate.id == user.id || exclusions.contains(&candidate.id) {
            return false;
        }
        if !candidate.is_active || !candidate.profile_completed {
            return false;
        }
        if criteria.require_verified && !candidate.verified {
            return false;
        }
        if criteria.campus.is_some_and(|campus| campus != candidate.campus) {
            return false;
        }
        if let Some(days) = criteria.active_within_days {
            let cutoff = now - Duration::days(days);
            if !candidate.last_seen.is_some_and(|seen| seen >= cutoff) {
                return false;
            }
        }
        if criteria.kind == RecommendationKind::Dating {
            if !user.preferences.gender_preference.accepts(candidate.gender) {
                return false;
            }
            if !gender_compatible(user, candidate) {
                return false;
            }
        }
        true
    }
}

/// Keeps the leading ranks and spreads repeated (campus, branch) pairs over the
/// tail. The penalty only affects ordering; reported scores are untouched.
fn apply_diversity(sorted: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    if sorted.len() <= DIVERSITY_PROTECTED {
        return sorted;
    }

    let key = |c: &RankedCandidate| (c.profile.campus, c.profile.branch.trim().to_lowercase());

    let mut remaining = sorted;
    let mut tail = remaining.split_off(DIVERSITY_PROTECTED);
    let mut seen: HashMap<(Campus, String), usize> = HashMap::new();
    for candidate in &remaining {
        *seen.entry(key(candidate)).or_default() += 1;
    }

    while !tail.is_empty() {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (idx, candidate) in tail.iter().enumerate() {
            let repeats = seen.get(&key(candidate)).copied().unwrap_or(0);
            let value = candidate.score.total - DIVERSITY_PENALTY * repeats as f64;
            if value > best_value {
                best = idx;
                best_value = value;
            }
        }
        let picked = tail.remove(best);
        *seen.entry(key(&picked)).or_default() += 1;
        remaining.push(picked);
    }

    remaining
}
