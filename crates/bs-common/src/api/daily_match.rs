use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::profile::ProfileSummary;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const STREAK_LOOKBACK_DAYS: i64 = 30;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DailyAction {
    Connect,
    Pass,
    SuperLike,
}

impl DailyAction {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMatch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub matched_user_id: Uuid,
    pub match_date: NaiveDate,
    pub compatibility_score: f64,
    pub algorithm_version: String,
    pub viewed: bool,
    pub action: Option<DailyAction>,
    pub acted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DailyMatch {
    pub fn is_acted(&self) -> bool {
        self.action.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDailyMatch {
    pub user_id: Uuid,
    pub matched_user_id: Uuid,
    pub match_date: NaiveDate,
    pub compatibility_score: f64,
    pub algorithm_version: String,
}

/// A daily match together with the matched user's public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMatchView {
    #[serde(flatten)]
    pub daily_match: DailyMatch,
    pub matched_user: Option<ProfileSummary>,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordActionRequest {
    pub action: DailyAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Recorded,
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActionResponse {
    pub daily_match: DailyMatch,
    pub outcome: ActionOutcome,
    pub connection_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyMatchStats {
    pub total_matches: usize,
    pub viewed: usize,
    pub connected: usize,
    pub passed: usize,
    pub super_liked: usize,
    /// connected / viewed as a percentage, 0 when nothing was viewed.
    pub connection_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResponse {
    pub streak: u32,
}
