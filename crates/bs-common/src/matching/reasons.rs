use super::factors::same_branch;
use super::scoring::ScoreBreakdown;
use crate::profile::UserProfile;

pub const MAX_REASONS: usize = 3;
pub const COMPLEMENTARY_REASON: &str = "Complementary personalities detected";

/// Short human-readable reasons, most concrete first, at most [`MAX_REASONS`].
pub fn match_reasons(
    user: &UserProfile,
    candidate: &UserProfile,
    common_interests: &[String],
    breakdown: &ScoreBreakdown,
    complementary: bool,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if user.campus == candidate.campus {
        reasons.push(format!("Both at BITS {}", user.campus.as_str()));
    }
    if (user.year - candidate.year).abs() <= 1 {
        reasons.push("Similar academic year".to_string());
    }
    if same_branch(user, candidate) {
        reasons.push(format!("Both studying {}", user.branch.trim()));
    }
    if !common_interests.is_empty() {
        let shown: Vec<&str> = common_interests.iter().take(2).map(String::as_str).collect();
        reasons.push(format!("Share interests in {}", shown.join(", ")));
    }
    if breakdown.interests > 0.7 {
        reasons.push(format!("Share {} common interests", common_interests.len()));
    }
    if complementary {
        reasons.push(COMPLEMENTARY_REASON.to_string());
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

pub fn explanation(breakdown: &ScoreBreakdown) -> String {
    let mut parts = Vec::new();

    if breakdown.interests > 0.7 {
        parts.push("Strong interest alignment");
    } else if breakdown.interests > 0.5 {
        parts.push("Good interest compatibility");
    }

    if breakdown.personality > 0.7 {
        parts.push("Excellent personality match");
    } else if breakdown.personality > 0.5 {
        parts.push("Compatible personalities");
    }

    if breakdown.lifestyle > 0.7 {
        parts.push("Similar lifestyle preferences");
    }

    if breakdown.academic.is_some_and(|score| score > 0.7) {
        parts.push("Great academic compatibility");
    }

    if parts.is_empty() {
        return "Potential for good connection".to_string();
    }
    parts.join(" • ")
}
