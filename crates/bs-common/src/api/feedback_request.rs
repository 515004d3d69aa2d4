use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedbackAction {
    Like,
    Pass,
    SuperLike,
    Block,
    Report,
}

impl FeedbackAction {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, FeedbackAction::Like | FeedbackAction::SuperLike)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub target_user_id: Uuid,
    pub action: FeedbackAction,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Stored feedback, one row per (user, target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub user_id: Uuid,
    pub target_user_id: Uuid,
    pub action: FeedbackAction,
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
