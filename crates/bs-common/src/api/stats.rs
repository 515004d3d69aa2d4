use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub likes_given: usize,
    pub passes_given: usize,
    pub total_connections: usize,
    /// Mean compatibility over the user's connections, 0 without any.
    pub avg_compatibility: f64,
    /// connections / likes given, 0 without likes.
    pub match_rate: f64,
}
