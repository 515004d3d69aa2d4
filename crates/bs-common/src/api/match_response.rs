use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::connection::ConnectionType;
use crate::profile::{ProfileSummary, Similarity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchItem {
    pub user: ProfileSummary,
    pub compatibility_score: f64,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub user_id: Uuid,
    pub connection_type: ConnectionType,
    pub similarity: Similarity,
    pub matches: Vec<MatchItem>,
    pub total_candidates: usize,
}
