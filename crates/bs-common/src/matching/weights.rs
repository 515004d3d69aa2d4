use crate::api::recommendation::RecommendationKind;

/// Friend matching: shared interests dominate, campus life matters.
pub const FRIENDS_WEIGHTS: Weights = Weights {
    interests: 0.35,
    personality: 0.25,
    lifestyle: 0.20,
    academic: 0.15,
    activity: 0.05,
    physical: 0.0,
    novelty: 0.0,
};

/// Dating: personality and lifestyle fit plus stated physical preferences.
pub const DATING_WEIGHTS: Weights = Weights {
    interests: 0.25,
    personality: 0.30,
    lifestyle: 0.25,
    academic: 0.0,
    activity: 0.05,
    physical: 0.15,
    novelty: 0.0,
};

/// Daily match: rewards recently active users and some unfamiliar interests.
pub const DAILY_MATCH_WEIGHTS: Weights = Weights {
    interests: 0.30,
    personality: 0.25,
    lifestyle: 0.20,
    academic: 0.0,
    activity: 0.10,
    physical: 0.0,
    novelty: 0.15,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub interests: f64,
    pub personality: f64,
    pub lifestyle: f64,
    pub academic: f64,
    pub activity: f64,
    pub physical: f64,
    pub novelty: f64,
}

impl Weights {
    pub fn for_kind(kind: RecommendationKind) -> Self {
        match kind {
            RecommendationKind::Friends => FRIENDS_WEIGHTS,
            RecommendationKind::Dating => DATING_WEIGHTS,
            RecommendationKind::DailyMatch => DAILY_MATCH_WEIGHTS,
        }
    }

    pub fn sum(&self) -> f64 {
        self.interests
            + self.personality
            + self.lifestyle
            + self.academic
            + self.activity
            + self.physical
            + self.novelty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for weights in [FRIENDS_WEIGHTS, DATING_WEIGHTS, DAILY_MATCH_WEIGHTS] {
            assert!((weights.sum() - 1.0).abs() < 1e-6, "{weights:?}");
        }
    }

    #[test]
    fn kind_selects_weight_table() {
        assert_eq!(
            Weights::for_kind(RecommendationKind::Dating),
            DATING_WEIGHTS
        );
        assert_eq!(Weights::for_kind(RecommendationKind::DailyMatch).novelty, 0.15);
    }
}
