use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use super::connection::ConnectionType;
use crate::matching::personality::PersonalityMatch;
use crate::profile::{Campus, ProfileSummary};

pub const ALGORITHM_VERSION: &str = "2.0";
pub const DEFAULT_COUNT: usize = 10;
pub const MAX_COUNT: usize = 50;
/// `active_recently` keeps users seen within this many days.
pub const ACTIVE_RECENTLY_DAYS: i64 = 7;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecommendationKind {
    Friends,
    Dating,
    DailyMatch,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl From<ConnectionType> for RecommendationKind {
    fn from(value: ConnectionType) -> Self {
        match value {
            ConnectionType::Friend => RecommendationKind::Friends,
            ConnectionType::Date => RecommendationKind::Dating,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    #[serde(default)]
    pub exclude_user_ids: Vec<Uuid>,
    #[serde(default)]
    pub min_compatibility_score: Option<f64>,
    #[serde(default)]
    pub campus_filter: Option<Campus>,
    #[serde(default = "default_true")]
    pub verified_only: bool,
    #[serde(default)]
    pub active_recently: bool,
}

impl Default for RecommendationFilters {
    fn default() -> Self {
        Self {
            exclude_user_ids: Vec::new(),
            min_compatibility_score: None,
            campus_filter: None,
            verified_only: true,
            active_recently: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    /// Required with service credentials; taken from the token otherwise.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub recommendation_type: RecommendationKind,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub filters: RecommendationFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub user_id: Uuid,
    pub compatibility_score: f64,
    pub confidence: f64,
    pub common_interests: Vec<String>,
    pub match_reasons: Vec<String>,
    pub personality_match: PersonalityMatch,
    pub explanation: String,
    pub profile: ProfileSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: Uuid,
    pub recommendation_type: RecommendationKind,
    pub recommendations: Vec<RecommendationItem>,
    pub algorithm_version: String,
    pub generated_at: DateTime<Utc>,
    pub total_candidates: usize,
    pub fallback_used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_default_to_verified_only() {
        let filters: RecommendationFilters = serde_json::from_str("{}").unwrap();
        assert!(filters.verified_only);
        assert!(!filters.active_recently);
        assert_eq!(filters, RecommendationFilters::default());
    }

    #[test]
    fn kind_uses_snake_case() {
        let kind: RecommendationKind = serde_json::from_str("\"daily_match\"").unwrap();
        assert_eq!(kind, RecommendationKind::DailyMatch);
        assert_eq!(kind.as_str(), "daily_match");
    }
}
