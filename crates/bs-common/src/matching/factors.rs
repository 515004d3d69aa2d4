use chrono::{DateTime, Utc};

use crate::profile::{GenderPreference, Smoking, UserProfile};

/// Campus, year, branch and responsiveness closeness, capped at 1.
pub fn academic_compatibility(user: &UserProfile, candidate: &UserProfile) -> f64 {
    let mut score = 0.0;

    if user.campus == candidate.campus {
        score += 0.4;
    }

    let year_diff = (user.year - candidate.year).abs() as f64;
    score += (1.0 - year_diff * 0.2).max(0.0) * 0.3;

    score += if same_branch(user, candidate) { 0.2 } else { 0.1 };

    let a = user.response_rate.unwrap_or(0.5);
    let b = candidate.response_rate.unwrap_or(0.5);
    score += (1.0 - (a - b).abs()) * 0.1;

    score.min(1.0)
}

pub fn same_branch(user: &UserProfile, candidate: &UserProfile) -> bool {
    user.branch.trim().eq_ignore_ascii_case(candidate.branch.trim())
}

/// Both users recently active scores highest; unknown activity is neutral.
pub fn activity_compatibility(
    user: &UserProfile,
    candidate: &UserProfile,
    now: DateTime<Utc>,
) -> f64 {
    let (Some(a), Some(b)) = (user.last_seen, candidate.last_seen) else {
        return 0.5;
    };
    let days_a = (now - a).num_days();
    let days_b = (now - b).num_days();

    if days_a <= 1 && days_b <= 1 {
        1.0
    } else if days_a <= 7 && days_b <= 7 {
        0.8
    } else if days_a <= 30 && days_b <= 30 {
        0.6
    } else {
        0.3
    }
}

/// Dating only: the candidate's age and gender against the requester's stated preferences.
pub fn physical_compatibility(user: &UserProfile, candidate: &UserProfile) -> f64 {
    if !user.preferences.gender_preference.accepts(candidate.gender) {
        return 0.0;
    }
    match candidate.age {
        Some(age) if user.preferences.age_range.contains(age) => 1.0,
        Some(_) => 0.0,
        None => 0.5,
    }
}

/// Summed dealbreaker penalty in `[0, 1]`, applied as `total * (1 - penalty)`.
pub fn dealbreaker_penalty(user: &UserProfile, candidate: &UserProfile) -> f64 {
    let dealbreakers = &user.preferences.dealbreakers;
    let mut penalty = 0.0;

    if dealbreakers.no_smoking
        && matches!(
            candidate.smoking,
            Some(Smoking::Socially | Smoking::Regularly)
        )
    {
        penalty += 0.8;
    }

    if let (Some(required), Some(actual)) = (dealbreakers.food_preference, candidate.food_preference)
    {
        if required != actual {
            penalty += 0.6;
        }
    }

    if let Some(age) = candidate.age {
        if !user.preferences.age_range.contains(age) {
            penalty += 1.0;
        }
    }

    f64::min(penalty, 1.0)
}

/// Mutual gender preference check used to filter dating candidates.
pub fn gender_compatible(user: &UserProfile, candidate: &UserProfile) -> bool {
    let mine = user.preferences.gender_preference;
    let theirs = candidate.preferences.gender_preference;

    match (mine, theirs) {
        (GenderPreference::Any, GenderPreference::Any) => true,
        (GenderPreference::Any, _) => candidate.gender.is_some(),
        (_, GenderPreference::Any) => user.gender.is_some(),
        _ => mine.accepts(candidate.gender) && theirs.accepts(user.gender),
    }
}
