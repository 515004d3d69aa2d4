use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionType {
    Friend,
    Date,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Directed edge: `user1_id` asked, `user2_id` answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub connection_type: ConnectionType,
    pub compatibility_score: f64,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn other_user(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConnection {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub connection_type: ConnectionType,
    pub compatibility_score: f64,
    pub status: ConnectionStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConnectionRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub target_user_id: Uuid,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub compatibility_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConnectionResponse {
    pub connection: Connection,
    pub created: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub blocked_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionView {
    #[serde(flatten)]
    pub connection: Connection,
    pub other_user_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub total: usize,
    pub accepted: usize,
    pub pending: usize,
    pub friends: usize,
    pub dates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedResponse {
    pub connected: bool,
}
