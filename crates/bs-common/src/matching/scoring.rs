use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    factors::{
        academic_compatibility, activity_compatibility, dealbreaker_penalty,
        physical_compatibility,
    },
    interests::{common_interests, interest_similarity, novelty},
    lifestyle::lifestyle_compatibility,
    personality::{personality_compatibility, PersonalityMatch},
    reasons::{explanation, match_reasons},
    weights::Weights,
};
use crate::api::recommendation::RecommendationKind;
use crate::profile::{Similarity, UserProfile};

pub const DEFAULT_MIN_SCORE: f64 = 0.3;
pub const DEFAULT_DAILY_RECENT_DAYS: i64 = 7;
pub const DAILY_CANDIDATE_POOL: usize = 20;
pub const DAILY_TOP_PICKS: usize = 5;

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Candidates must score strictly above this.
    pub min_score: f64,
    /// Previous daily matches within this many days are not repeated.
    pub daily_recent_days: i64,
    pub daily_candidate_pool: usize,
    pub daily_top_picks: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            daily_recent_days: DEFAULT_DAILY_RECENT_DAYS,
            daily_candidate_pool: DAILY_CANDIDATE_POOL,
            daily_top_picks: DAILY_TOP_PICKS,
        }
    }
}

impl MatchingConfig {
    /// Defaults overridden by `BS_MIN_COMPATIBILITY_SCORE` and `BS_DAILY_RECENT_DAYS`.
    pub fn from_env() -> Self {
        Self {
            min_score: env_min_score(),
            daily_recent_days: env_daily_recent_days(),
            ..Self::default()
        }
    }
}

/// Per-factor scores. Factors not used by the recommendation kind are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub interests: f64,
    pub personality: f64,
    pub lifestyle: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic: Option<f64>,
    pub activity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novelty: Option<f64>,
}

impl ScoreBreakdown {
    fn values(&self) -> Vec<f64> {
        let mut values = vec![self.interests, self.personality, self.lifestyle, self.activity];
        values.extend(self.academic);
        values.extend(self.physical);
        values.extend(self.novelty);
        values
    }

    fn weighted(&self, weights: &Weights) -> f64 {
        self.interests * weights.interests
            + self.personality * weights.personality
            + self.lifestyle * weights.lifestyle
            + self.academic.unwrap_or(0.0) * weights.academic
            + self.activity * weights.activity
            + self.physical.unwrap_or(0.0) * weights.physical
            + self.novelty.unwrap_or(0.0) * weights.novelty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    /// Weighted total after dealbreakers, always in `[0, 1]`.
    pub total: f64,
    pub breakdown: ScoreBreakdown,
    pub dealbreaker_penalty: f64,
    pub common_interests: Vec<String>,
    pub personality_match: PersonalityMatch,
    pub reasons: Vec<String>,
    pub explanation: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CompatibilityEngine;

impl CompatibilityEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        user: &UserProfile,
        candidate: &UserProfile,
        kind: RecommendationKind,
        similarity: Similarity,
        now: DateTime<Utc>,
    ) -> CompatibilityScore {
        let common = common_interests(&user.interests, &candidate.interests);
        let personality_match = personality_compatibility(user, candidate, kind);

        let mut breakdown = ScoreBreakdown {
            interests: interest_similarity(&user.interests, &candidate.interests),
            personality: personality_match.mean(),
            lifestyle: lifestyle_compatibility(user, candidate),
            academic: (kind == RecommendationKind::Friends)
                .then(|| academic_compatibility(user, candidate)),
            activity: activity_compatibility(user, candidate, now),
            physical: (kind == RecommendationKind::Dating)
                .then(|| physical_compatibility(user, candidate)),
            novelty: (kind == RecommendationKind::DailyMatch)
                .then(|| novelty(&user.interests, &candidate.interests)),
        };

        let complementary = similarity == Similarity::Opposite;
        if complementary {
            breakdown.personality = 1.0 - breakdown.personality;
            breakdown.lifestyle = 1.0 - breakdown.lifestyle;
        }

        let penalty = dealbreaker_penalty(user, candidate);
        let weights = Weights::for_kind(kind);
        let total = clamp_unit(breakdown.weighted(&weights) * (1.0 - penalty));

        let reasons = match_reasons(user, candidate, &common, &breakdown, complementary);
        let explanation = explanation(&breakdown);
        let confidence = confidence(user, candidate, &breakdown);

        CompatibilityScore {
            total,
            breakdown,
            dealbreaker_penalty: penalty,
            common_interests: common,
            personality_match,
            reasons,
            explanation,
            confidence,
        }
    }
}

/// Rough completeness: 70% spread over core fields, 30% over lifestyle fields.
pub fn profile_completeness(profile: &UserProfile) -> f64 {
    let core = [
        !profile.display_name.trim().is_empty(),
        profile.age.is_some(),
        profile.bio.as_deref().is_some_and(|bio| bio.chars().count() >= 50),
        profile.interests.len() >= 3,
        true, // preferences always carry defaults
    ];
    let lifestyle = [
        profile.food_preference.is_some(),
        profile.smoking.is_some(),
        profile.drinking.is_some(),
    ];

    let score = core.iter().filter(|present| **present).count() as f64 * 0.14
        + lifestyle.iter().filter(|present| **present).count() as f64 * 0.10;
    score.min(1.0)
}

fn confidence(user: &UserProfile, candidate: &UserProfile, breakdown: &ScoreBreakdown) -> f64 {
    let completeness = (profile_completeness(user) + profile_completeness(candidate)) / 2.0;

    let values = breakdown.values();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let consistency = (1.0 - variance).max(0.0);

    clamp_unit((completeness + consistency + breakdown.activity) / 3.0)
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn env_min_score() -> f64 {
    std::env::var("BS_MIN_COMPATIBILITY_SCORE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| (0.0..1.0).contains(v))
        .unwrap_or(DEFAULT_MIN_SCORE)
}

fn env_daily_recent_days() -> i64 {
    std::env::var("BS_DAILY_RECENT_DAYS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(DEFAULT_DAILY_RECENT_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::reasons::COMPLEMENTARY_REASON;
    use crate::profile::{fixtures::profile, PersonalityTraits, Smoking};

    fn engine() -> CompatibilityEngine {
        CompatibilityEngine::new()
    }

    #[test]
    fn twins_score_high_for_friends() {
        let a = profile("A");
        let b = profile("B");
        let score = engine().score(&a, &b, RecommendationKind::Friends, Similarity::Similar, Utc::now());
        assert!(score.total > 0.8, "got {}", score.total);
        assert!(score.breakdown.academic.is_some());
        assert!(score.breakdown.physical.is_none());
        assert_eq!(score.common_interests.len(), 3);
        assert!(score.reasons.len() <= 3);
        assert!((0.0..=1.0).contains(&score.confidence));
    }

    #[test]
    fn opposite_mode_inverts_personality_and_lifestyle() {
        let mut a = profile("A");
        a.personality = PersonalityTraits {
            openness: Some(0.9),
            conscientiousness: Some(0.9),
            extraversion: Some(0.9),
            agreeableness: Some(0.9),
            neuroticism: Some(0.9),
        };
        let b = a.clone();

        let similar = engine().score(&a, &b, RecommendationKind::Friends, Similarity::Similar, Utc::now());
        let opposite = engine().score(&a, &b, RecommendationKind::Friends, Similarity::Opposite, Utc::now());
        assert_eq!(similar.breakdown.personality, 1.0);
        assert_eq!(opposite.breakdown.personality, 0.0);
        assert!(opposite.total < similar.total);
    }

    #[test]
    fn opposite_mode_explains_itself() {
        let a = profile("A");
        let mut b = profile("B");
        b.campus = crate::profile::Campus::Goa;
        b.year = 5;
        b.branch = "Economics".into();
        b.interests = vec!["cricket".into()];
        let score = engine().score(&a, &b, RecommendationKind::Friends, Similarity::Opposite, Utc::now());
        assert_eq!(score.reasons, vec![COMPLEMENTARY_REASON.to_string()]);
    }

    #[test]
    fn dealbreaker_zeroes_total() {
        let mut a = profile("A");
        a.preferences.dealbreakers.no_smoking = true;
        let mut b = profile("B");
        b.smoking = Some(Smoking::Regularly);
        b.age = Some(40);
        let score = engine().score(&a, &b, RecommendationKind::Dating, Similarity::Similar, Utc::now());
        assert_eq!(score.dealbreaker_penalty, 1.0);
        assert_eq!(score.total, 0.0);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let a = profile("A");
        let mut b = profile("B");
        b.interests = vec![];
        b.last_seen = None;
        for kind in [
            RecommendationKind::Friends,
            RecommendationKind::Dating,
            RecommendationKind::DailyMatch,
        ] {
            for similarity in [Similarity::Similar, Similarity::Opposite] {
                let score = engine().score(&a, &b, kind, similarity, Utc::now());
                assert!((0.0..=1.0).contains(&score.total));
                assert!((0.0..=1.0).contains(&score.confidence));
            }
        }
    }

    #[test]
    fn completeness_counts_core_and_lifestyle_fields() {
        let a = profile("A");
        assert!((profile_completeness(&a) - 1.0).abs() < 1e-9);

        let mut b = profile("B");
        b.bio = Some("short".into());
        b.smoking = None;
        assert!((profile_completeness(&b) - (0.56 + 0.2)).abs() < 1e-9);
    }
}
