use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::api::connection::{Connection, ConnectionStatus, NewConnection};
use crate::api::daily_match::{DailyAction, DailyMatch, NewDailyMatch};
use crate::api::feedback_request::Feedback;
use crate::api::feedback_response::FeedbackStatus;
use crate::api::notification::{NewNotification, Notification};
use crate::api::ship::{NewShip, Ship, ShipStatus};
use crate::db::{
    connections, daily_matches, feedback, notifications, profiles, redirections, ships, PgPool,
};
use crate::deep_links::{Platform, PlatformRedirection};
use crate::profile::UserProfile;
use crate::store::{MatchStore, StoreError};

/// [`MatchStore`] backed by the `bitspark` Postgres schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MatchStore for PgStore {
    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let client = self.pool.get().await?;
        profiles::get_profile(&client, id).await
    }

    async fn find_profiles_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserProfile>, StoreError> {
        let client = self.pool.get().await?;
        profiles::find_by_emails(&client, emails).await
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        profiles::insert_profile(&client, profile).await
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        profiles::update_profile(&client, profile).await
    }

    async fn list_candidate_profiles(
        &self,
        requester: Uuid,
    ) -> Result<Vec<UserProfile>, StoreError> {
        let client = self.pool.get().await?;
        profiles::list_candidates(&client, requester).await
    }

    async fn insert_connection(
        &self,
        connection: &NewConnection,
    ) -> Result<(Connection, bool), StoreError> {
        let client = self.pool.get().await?;
        connections::insert_connection(&client, connection).await
    }

    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, StoreError> {
        let client = self.pool.get().await?;
        connections::get_connection(&client, id).await
    }

    async fn list_connections(&self, user_id: Uuid) -> Result<Vec<Connection>, StoreError> {
        let client = self.pool.get().await?;
        connections::list_connections(&client, user_id).await
    }

    async fn connections_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Connection>, StoreError> {
        let client = self.pool.get().await?;
        connections::connections_between(&client, a, b).await
    }

    async fn transition_connection(
        &self,
        id: Uuid,
        from: ConnectionStatus,
        to: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Connection>, StoreError> {
        let client = self.pool.get().await?;
        connections::transition_connection(&client, id, from, to, at).await
    }

    async fn block_pair(
        &self,
        user_id: Uuid,
        blocked_user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Connection>, StoreError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let blocked = connections::block_pair(&tx, user_id, blocked_user_id, at).await?;
        tx.commit().await?;
        Ok(blocked)
    }

    async fn get_daily_match_for_date(
        &self,
        user_id: Uuid,
        match_date: NaiveDate,
    ) -> Result<Option<DailyMatch>, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::get_for_date(&client, user_id, match_date).await
    }

    async fn get_daily_match(&self, id: Uuid) -> Result<Option<DailyMatch>, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::get_daily_match(&client, id).await
    }

    async fn insert_daily_match(&self, new: &NewDailyMatch) -> Result<DailyMatch, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::insert_daily_match(&client, new).await
    }

    async fn replace_acted_daily_match(
        &self,
        existing_id: Uuid,
        new: &NewDailyMatch,
    ) -> Result<Option<DailyMatch>, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::replace_acted(&client, existing_id, new).await
    }

    async fn record_daily_action(
        &self,
        id: Uuid,
        action: DailyAction,
        at: DateTime<Utc>,
    ) -> Result<Option<DailyMatch>, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::record_action(&client, id, action, at).await
    }

    async fn list_daily_matches(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<DailyMatch>, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::list_daily_matches(&client, user_id, limit).await
    }

    async fn recent_daily_match_user_ids(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<Uuid>, StoreError> {
        let client = self.pool.get().await?;
        daily_matches::recent_matched_user_ids(&client, user_id, since).await
    }

    async fn upsert_feedback(&self, feedback: &Feedback) -> Result<FeedbackStatus, StoreError> {
        let client = self.pool.get().await?;
        feedback::upsert_feedback(&client, feedback).await
    }

    async fn get_feedback(
        &self,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<Option<Feedback>, StoreError> {
        let client = self.pool.get().await?;
        feedback::get_feedback(&client, user_id, target_user_id).await
    }

    async fn list_feedback_by_user(&self, user_id: Uuid) -> Result<Vec<Feedback>, StoreError> {
        let client = self.pool.get().await?;
        feedback::list_by_user(&client, user_id).await
    }

    async fn insert_ship(&self, ship: &NewShip) -> Result<Ship, StoreError> {
        let client = self.pool.get().await?;
        ships::insert_ship(&client, ship).await
    }

    async fn get_ship(&self, id: Uuid) -> Result<Option<Ship>, StoreError> {
        let client = self.pool.get().await?;
        ships::get_ship(&client, id).await
    }

    async fn respond_ship(
        &self,
        id: Uuid,
        status: ShipStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ship>, StoreError> {
        let client = self.pool.get().await?;
        ships::respond_ship(&client, id, status, at).await
    }

    async fn list_ships_received(&self, user_id: Uuid) -> Result<Vec<Ship>, StoreError> {
        let client = self.pool.get().await?;
        ships::list_received(&client, user_id).await
    }

    async fn list_ships_sent(&self, user_id: Uuid) -> Result<Vec<Ship>, StoreError> {
        let client = self.pool.get().await?;
        ships::list_sent(&client, user_id).await
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError> {
        let client = self.pool.get().await?;
        notifications::insert_notification(&client, notification).await
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let client = self.pool.get().await?;
        notifications::list_notifications(&client, user_id, limit).await
    }

    async fn record_redirection(
        &self,
        connection_id: Uuid,
        platform: Platform,
        at: DateTime<Utc>,
    ) -> Result<PlatformRedirection, StoreError> {
        let client = self.pool.get().await?;
        redirections::record_redirection(&client, connection_id, platform, at).await
    }

    async fn platform_stats(&self, user_id: Uuid) -> Result<HashMap<Platform, i64>, StoreError> {
        let client = self.pool.get().await?;
        redirections::platform_stats(&client, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::connection::ConnectionType;
    use crate::db::{create_pool_from_url, run_migrations};
    use crate::profile::fixtures::profile;

    async fn store() -> PgStore {
        let url = std::env::var("BS_TEST_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("BS_TEST_DATABASE_URL or DATABASE_URL must point at a scratch database");
        let pool = create_pool_from_url(&url).expect("pool");
        run_migrations(&pool).await.expect("migrations");
        PgStore::new(pool)
    }

    fn unique_profile(name: &str) -> UserProfile {
        let mut user = profile(name);
        user.email = format!("{}@pilani.bits-pilani.ac.in", user.id.simple());
        user
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL database"]
    async fn profiles_round_trip_and_reject_duplicates() {
        let store = store().await;
        store.ping().await.unwrap();

        let user = unique_profile("Asha");
        store.insert_profile(&user).await.unwrap();
        let loaded = store.get_profile(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.email, user.email);
        assert_eq!(loaded.campus, user.campus);
        assert!(loaded.profile_completed);

        let mut twin = unique_profile("Asha");
        twin.email = user.email.to_uppercase();
        assert!(matches!(
            store.insert_profile(&twin).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL database"]
    async fn connections_are_idempotent_and_blocking_sticks() {
        let store = store().await;
        let a = unique_profile("Asha");
        let b = unique_profile("Ravi");
        store.insert_profile(&a).await.unwrap();
        store.insert_profile(&b).await.unwrap();

        let new = NewConnection {
            user1_id: a.id,
            user2_id: b.id,
            connection_type: ConnectionType::Friend,
            compatibility_score: 0.7,
            status: ConnectionStatus::Pending,
        };
        let (first, created) = store.insert_connection(&new).await.unwrap();
        assert!(created);
        let (again, created) = store.insert_connection(&new).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);
        assert_eq!(store.connections_between(b.id, a.id).await.unwrap().len(), 1);

        let blocked = store.block_pair(b.id, a.id, Utc::now()).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].status, ConnectionStatus::Blocked);
        assert!(store
            .transition_connection(
                first.id,
                ConnectionStatus::Pending,
                ConnectionStatus::Accepted,
                Utc::now(),
            )
            .await
            .unwrap()
            .is_none());
    }
}
