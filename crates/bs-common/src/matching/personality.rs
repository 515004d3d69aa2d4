use serde::{Deserialize, Serialize};

use super::interests::{mentions_any, CREATIVE_KEYWORDS, SOCIAL_KEYWORDS, TECH_KEYWORDS};
use crate::api::recommendation::RecommendationKind;
use crate::profile::{PersonalityTraits, UserProfile};

/// Per-trait compatibility in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityMatch {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl PersonalityMatch {
    pub fn mean(&self) -> f64 {
        (self.openness
            + self.conscientiousness
            + self.extraversion
            + self.agreeableness
            + self.neuroticism)
            / 5.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Traits {
    openness: f64,
    conscientiousness: f64,
    extraversion: f64,
    agreeableness: f64,
    neuroticism: f64,
}

impl Traits {
    fn from_declared(traits: &PersonalityTraits) -> Self {
        Self {
            openness: traits.openness.unwrap_or(0.5),
            conscientiousness: traits.conscientiousness.unwrap_or(0.5),
            extraversion: traits.extraversion.unwrap_or(0.5),
            agreeableness: traits.agreeableness.unwrap_or(0.5),
            neuroticism: traits.neuroticism.unwrap_or(0.5),
        }
    }

    /// Rough estimate from interest tags when no questionnaire was answered.
    fn estimated(profile: &UserProfile) -> Self {
        let count = |keywords: &[&str]| {
            profile
                .interests
                .iter()
                .filter(|interest| mentions_any(interest, keywords))
                .count() as f64
        };
        let creative = count(CREATIVE_KEYWORDS);
        let tech = count(TECH_KEYWORDS);
        let social = count(SOCIAL_KEYWORDS);

        Self {
            openness: ((creative + tech) * 0.2 + 0.3).min(1.0),
            conscientiousness: 0.5,
            extraversion: (social * 0.3 + 0.2).min(1.0),
            agreeableness: 0.6,
            neuroticism: 0.4,
        }
    }
}

/// Mean per-trait closeness. Both sides fall back to interest-based estimates
/// when either side has no declared traits.
pub fn personality_compatibility(
    user: &UserProfile,
    candidate: &UserProfile,
    kind: RecommendationKind,
) -> PersonalityMatch {
    let (a, b) = if user.personality.is_empty() || candidate.personality.is_empty() {
        (Traits::estimated(user), Traits::estimated(candidate))
    } else {
        (
            Traits::from_declared(&user.personality),
            Traits::from_declared(&candidate.personality),
        )
    };

    let similar = |x: f64, y: f64| 1.0 - (x - y).abs();
    // Dating tolerates some difference in the steadier traits.
    let tolerant = |x: f64, y: f64| match kind {
        RecommendationKind::Dating => 1.0 - 0.7 * (x - y).abs(),
        _ => similar(x, y),
    };

    PersonalityMatch {
        openness: similar(a.openness, b.openness),
        conscientiousness: tolerant(a.conscientiousness, b.conscientiousness),
        extraversion: similar(a.extraversion, b.extraversion),
        agreeableness: tolerant(a.agreeableness, b.agreeableness),
        neuroticism: tolerant(a.neuroticism, b.neuroticism),
    }
}
