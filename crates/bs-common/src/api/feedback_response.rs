use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedbackStatus {
    Created,
    Updated,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackResponse {
    pub status: FeedbackStatus,
    /// Set when this feedback completed a mutual like.
    pub mutual_match: bool,
    pub connection_id: Option<Uuid>,
}
