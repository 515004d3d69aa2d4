use serde::Deserialize;
use uuid::Uuid;

use super::connection::ConnectionType;
use crate::profile::Similarity;

/// Swipe-deck request for friend or dating candidates.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub connection_type: ConnectionType,
    /// Defaults to the user's stored preference for the connection type.
    #[serde(default)]
    pub similarity: Option<Similarity>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}
