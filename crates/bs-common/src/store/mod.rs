//! Storage seam for the match service.
//!
//! [`MatchStore`] is implemented by [`memory::MemoryStore`] (tests and local
//! development) and by [`crate::db::PgStore`]. Every method is a single atomic
//! unit from the caller's point of view; uniqueness rules are enforced here and
//! not by callers.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::api::connection::{Connection, ConnectionStatus, NewConnection};
use crate::api::daily_match::{DailyAction, DailyMatch, NewDailyMatch};
use crate::api::feedback_request::Feedback;
use crate::api::feedback_response::FeedbackStatus;
use crate::api::notification::{NewNotification, Notification};
use crate::api::ship::{NewShip, Ship, ShipStatus};
use crate::db::db_error;
use crate::deep_links::{Platform, PlatformRedirection};
use crate::profile::UserProfile;

pub use memory::MemoryStore;

db_error!(StoreError {
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error("stored row could not be decoded: {0}")]
    Mapping(String),
});

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn find_profiles_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserProfile>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the id or e-mail is taken.
    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Returns `false` when no profile has this id.
    async fn update_profile(&self, profile: &UserProfile) -> Result<bool, StoreError>;

    /// Active profiles with a completed profile, excluding `requester`.
    async fn list_candidate_profiles(
        &self,
        requester: Uuid,
    ) -> Result<Vec<UserProfile>, StoreError>;

    /// Idempotent on `(user1_id, user2_id, connection_type)`; the flag is `true`
    /// only when a row was created.
    async fn insert_connection(
        &self,
        connection: &NewConnection,
    ) -> Result<(Connection, bool), StoreError>;

    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, StoreError>;

    /// Connections in either direction, newest first.
    async fn list_connections(&self, user_id: Uuid) -> Result<Vec<Connection>, StoreError>;

    /// Every edge between the pair, any type or direction, newest first.
    async fn connections_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Connection>, StoreError>;

    /// Moves a connection from `from` to `to`; `None` when it was not in `from`.
    async fn transition_connection(
        &self,
        id: Uuid,
        from: ConnectionStatus,
        to: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Connection>, StoreError>;

    /// Blocks every edge between the two users, creating a blocked friend edge
    /// when none exists.
    async fn block_pair(
        &self,
        user_id: Uuid,
        blocked_user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Connection>, StoreError>;

    async fn get_daily_match_for_date(
        &self,
        user_id: Uuid,
        match_date: NaiveDate,
    ) -> Result<Option<DailyMatch>, StoreError>;

    async fn get_daily_match(&self, id: Uuid) -> Result<Option<DailyMatch>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the user already has a record
    /// for that date.
    async fn insert_daily_match(&self, new: &NewDailyMatch) -> Result<DailyMatch, StoreError>;

    /// Swaps an acted-upon record for a fresh one. `None` when `existing_id` is
    /// gone or has not been acted upon.
    async fn replace_acted_daily_match(
        &self,
        existing_id: Uuid,
        new: &NewDailyMatch,
    ) -> Result<Option<DailyMatch>, StoreError>;

    /// Sets the action, `viewed` and `acted_at` when no action was recorded yet.
    /// `None` when the record is missing or already acted upon.
    async fn record_daily_action(
        &self,
        id: Uuid,
        action: DailyAction,
        at: DateTime<Utc>,
    ) -> Result<Option<DailyMatch>, StoreError>;

    /// Newest match date first.
    async fn list_daily_matches(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<DailyMatch>, StoreError>;

    async fn recent_daily_match_user_ids(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Inserts or overwrites the action for `(user_id, target_user_id)`.
    async fn upsert_feedback(&self, feedback: &Feedback) -> Result<FeedbackStatus, StoreError>;

    async fn get_feedback(
        &self,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<Option<Feedback>, StoreError>;

    async fn list_feedback_by_user(&self, user_id: Uuid) -> Result<Vec<Feedback>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the shipper already shipped this pair.
    async fn insert_ship(&self, ship: &NewShip) -> Result<Ship, StoreError>;

    async fn get_ship(&self, id: Uuid) -> Result<Option<Ship>, StoreError>;

    /// Answers a pending ship; `None` when it is missing or already answered.
    async fn respond_ship(
        &self,
        id: Uuid,
        status: ShipStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ship>, StoreError>;

    async fn list_ships_received(&self, user_id: Uuid) -> Result<Vec<Ship>, StoreError>;

    async fn list_ships_sent(&self, user_id: Uuid) -> Result<Vec<Ship>, StoreError>;

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError>;

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Creates the row or bumps `redirect_count`.
    async fn record_redirection(
        &self,
        connection_id: Uuid,
        platform: Platform,
        at: DateTime<Utc>,
    ) -> Result<PlatformRedirection, StoreError>;

    /// Redirect totals per platform over the user's connections.
    async fn platform_stats(&self, user_id: Uuid) -> Result<HashMap<Platform, i64>, StoreError>;
}
