use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

/// Score given to a connection created from an accepted ship.
pub const SHIP_CONNECTION_SCORE: f64 = 0.8;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipStatus {
    Pending,
    Accepted,
    Declined,
}

impl ShipStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipDecision {
    Accept,
    Decline,
}

impl ShipDecision {
    pub fn status(&self) -> ShipStatus {
        match self {
            ShipDecision::Accept => ShipStatus::Accepted,
            ShipDecision::Decline => ShipStatus::Declined,
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            ShipDecision::Accept => "accepted",
            ShipDecision::Decline => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: Uuid,
    pub shipper_id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub message: String,
    pub is_anonymous: bool,
    pub status: ShipStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Ship {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// Same shipper and the same unordered pair.
    pub fn same_pair(&self, shipper_id: Uuid, a: Uuid, b: Uuid) -> bool {
        self.shipper_id == shipper_id
            && ((self.user1_id == a && self.user2_id == b)
                || (self.user1_id == b && self.user2_id == a))
    }

    /// Received ships hide the shipper when anonymous.
    pub fn redacted_for_recipient(mut self) -> Self {
        if self.is_anonymous {
            self.shipper_id = Uuid::nil();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShip {
    pub shipper_id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub message: String,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShipRequest {
    #[serde(default)]
    pub shipper_id: Option<Uuid>,
    pub user1_email: String,
    pub user2_email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondShipRequest {
    pub response: ShipDecision,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipCounts {
    pub total: usize,
    pub accepted: usize,
    pub pending: usize,
    pub declined: usize,
}

impl ShipCounts {
    pub fn tally<'a>(ships: impl IntoIterator<Item = &'a Ship>) -> Self {
        ships.into_iter().fold(Self::default(), |mut counts, ship| {
            counts.total += 1;
            match ship.status {
                ShipStatus::Accepted => counts.accepted += 1,
                ShipStatus::Pending => counts.pending += 1,
                ShipStatus::Declined => counts.declined += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStats {
    pub sent: ShipCounts,
    pub received: ShipCounts,
}
