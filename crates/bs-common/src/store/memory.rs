use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MatchStore, StoreError};
use crate::api::connection::{Connection, ConnectionStatus, ConnectionType, NewConnection};
use crate::api::daily_match::{DailyAction, DailyMatch, NewDailyMatch};
use crate::api::feedback_request::Feedback;
use crate::api::feedback_response::FeedbackStatus;
use crate::api::notification::{NewNotification, Notification};
use crate::api::ship::{NewShip, Ship, ShipStatus};
use crate::deep_links::{Platform, PlatformRedirection};
use crate::profile::UserProfile;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, UserProfile>,
    connections: Vec<Connection>,
    daily_matches: Vec<DailyMatch>,
    feedback: HashMap<(Uuid, Uuid), Feedback>,
    ships: Vec<Ship>,
    notifications: Vec<Notification>,
    redirections: Vec<PlatformRedirection>,
}

/// In-process store. One lock guards every table so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn find_profiles_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserProfile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|p| emails.iter().any(|e| e.eq_ignore_ascii_case(&p.email)))
            .cloned()
            .collect())
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let taken = tables.profiles.contains_key(&profile.id)
            || tables
                .profiles
                .values()
                .any(|p| p.email.eq_ignore_ascii_case(&profile.email));
        if taken {
            return Err(StoreError::Duplicate("profile"));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.profiles.get_mut(&profile.id) {
            Some(existing) => {
                *existing = profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_candidate_profiles(
        &self,
        requester: Uuid,
    ) -> Result<Vec<UserProfile>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<UserProfile> = tables
            .profiles
            .values()
            .filter(|p| p.id != requester && p.is_active && p.profile_completed)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.id);
        Ok(out)
    }

    async fn insert_connection(
        &self,
        connection: &NewConnection,
    ) -> Result<(Connection, bool), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.connections.iter().find(|c| {
            c.user1_id == connection.user1_id
                && c.user2_id == connection.user2_id
                && c.connection_type == connection.connection_type
        }) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let row = Connection {
            id: Uuid::new_v4(),
            user1_id: connection.user1_id,
            user2_id: connection.user2_id,
            connection_type: connection.connection_type,
            compatibility_score: connection.compatibility_score,
            status: connection.status,
            created_at: now,
            responded_at: (connection.status != ConnectionStatus::Pending).then_some(now),
        };
        tables.connections.push(row.clone());
        Ok((row, true))
    }

    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.connections.iter().find(|c| c.id == id).cloned())
    }

    async fn list_connections(&self, user_id: Uuid) -> Result<Vec<Connection>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<Connection> = tables
            .connections
            .iter()
            .filter(|c| c.involves(user_id))
            .cloned()
            .collect();
        newest_first(&mut out, |c| c.created_at);
        Ok(out)
    }

    async fn connections_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Connection>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<Connection> = tables
            .connections
            .iter()
            .filter(|c| c.involves(a) && c.involves(b))
            .cloned()
            .collect();
        newest_first(&mut out, |c| c.created_at);
        Ok(out)
    }

    async fn transition_connection(
        &self,
        id: Uuid,
        from: ConnectionStatus,
        to: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Connection>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .connections
            .iter_mut()
            .find(|c| c.id == id && c.status == from)
        else {
            return Ok(None);
        };
        row.status = to;
        row.responded_at = Some(at);
        Ok(Some(row.clone()))
    }

    async fn block_pair(
        &self,
        user_id: Uuid,
        blocked_user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Connection>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut blocked = Vec::new();
        for row in tables
            .connections
            .iter_mut()
            .filter(|c| c.involves(user_id) && c.involves(blocked_user_id))
        {
            row.status = ConnectionStatus::Blocked;
            row.responded_at = Some(at);
            blocked.push(row.clone());
        }

        if blocked.is_empty() {
            let row = Connection {
                id: Uuid::new_v4(),
                user1_id: user_id,
                user2_id: blocked_user_id,
                connection_type: ConnectionType::Friend,
                compatibility_score: 0.0,
                status: ConnectionStatus::Blocked,
                created_at: at,
                responded_at: Some(at),
            };
            tables.connections.push(row.clone());
            blocked.push(row);
        }
        Ok(blocked)
    }

    async fn get_daily_match_for_date(
        &self,
        user_id: Uuid,
        match_date: NaiveDate,
    ) -> Result<Option<DailyMatch>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .daily_matches
            .iter()
            .find(|m| m.user_id == user_id && m.match_date == match_date)
            .cloned())
    }

    async fn get_daily_match(&self, id: Uuid) -> Result<Option<DailyMatch>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.daily_matches.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_daily_match(&self, new: &NewDailyMatch) -> Result<DailyMatch, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .daily_matches
            .iter()
            .any(|m| m.user_id == new.user_id && m.match_date == new.match_date)
        {
            return Err(StoreError::Duplicate("daily match"));
        }
        let row = fresh_daily_match(new);
        tables.daily_matches.push(row.clone());
        Ok(row)
    }

    async fn replace_acted_daily_match(
        &self,
        existing_id: Uuid,
        new: &NewDailyMatch,
    ) -> Result<Option<DailyMatch>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables
            .daily_matches
            .iter_mut()
            .find(|m| m.id == existing_id && m.action.is_some())
        else {
            return Ok(None);
        };
        *slot = fresh_daily_match(new);
        Ok(Some(slot.clone()))
    }

    async fn record_daily_action(
        &self,
        id: Uuid,
        action: DailyAction,
        at: DateTime<Utc>,
    ) -> Result<Option<DailyMatch>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .daily_matches
            .iter_mut()
            .find(|m| m.id == id && m.action.is_none())
        else {
            return Ok(None);
        };
        row.action = Some(action);
        row.acted_at = Some(at);
        row.viewed = true;
        Ok(Some(row.clone()))
    }

    async fn list_daily_matches(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<DailyMatch>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<DailyMatch> = tables
            .daily_matches
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.match_date.cmp(&a.match_date));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn recent_daily_match_user_ids(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .daily_matches
            .iter()
            .filter(|m| m.user_id == user_id && m.match_date >= since)
            .map(|m| m.matched_user_id)
            .collect())
    }

    async fn upsert_feedback(&self, feedback: &Feedback) -> Result<FeedbackStatus, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (feedback.user_id, feedback.target_user_id);
        let status = match tables.feedback.get_mut(&key) {
            Some(existing) => {
                existing.action = feedback.action;
                existing.context = feedback.context.clone();
                FeedbackStatus::Updated
            }
            None => {
                tables.feedback.insert(key, feedback.clone());
                FeedbackStatus::Created
            }
        };
        Ok(status)
    }

    async fn get_feedback(
        &self,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<Option<Feedback>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.feedback.get(&(user_id, target_user_id)).cloned())
    }

    async fn list_feedback_by_user(&self, user_id: Uuid) -> Result<Vec<Feedback>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<Feedback> = tables
            .feedback
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut out, |f| f.created_at);
        Ok(out)
    }

    async fn insert_ship(&self, ship: &NewShip) -> Result<Ship, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .ships
            .iter()
            .any(|s| s.same_pair(ship.shipper_id, ship.user1_id, ship.user2_id))
        {
            return Err(StoreError::Duplicate("ship"));
        }
        let row = Ship {
            id: Uuid::new_v4(),
            shipper_id: ship.shipper_id,
            user1_id: ship.user1_id,
            user2_id: ship.user2_id,
            message: ship.message.clone(),
            is_anonymous: ship.is_anonymous,
            status: ShipStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        };
        tables.ships.push(row.clone());
        Ok(row)
    }

    async fn get_ship(&self, id: Uuid) -> Result<Option<Ship>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.ships.iter().find(|s| s.id == id).cloned())
    }

    async fn respond_ship(
        &self,
        id: Uuid,
        status: ShipStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ship>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .ships
            .iter_mut()
            .find(|s| s.id == id && s.status == ShipStatus::Pending)
        else {
            return Ok(None);
        };
        row.status = status;
        row.responded_at = Some(at);
        Ok(Some(row.clone()))
    }

    async fn list_ships_received(&self, user_id: Uuid) -> Result<Vec<Ship>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<Ship> = tables
            .ships
            .iter()
            .filter(|s| s.involves(user_id))
            .cloned()
            .collect();
        newest_first(&mut out, |s| s.created_at);
        Ok(out)
    }

    async fn list_ships_sent(&self, user_id: Uuid) -> Result<Vec<Ship>, StoreError> {
        let tables = self.tables.read().await;
        let mut out: Vec<Ship> = tables
            .ships
            .iter()
            .filter(|s| s.shipper_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut out, |s| s.created_at);
        Ok(out)
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError> {
        let mut tables = self.tables.write().await;
        let row = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            data: notification.data.clone(),
            read: false,
            created_at: Utc::now(),
        };
        tables.notifications.push(row.clone());
        Ok(row)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let tables = self.tables.read().await;
        // insertion order doubles as creation order
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn record_redirection(
        &self,
        connection_id: Uuid,
        platform: Platform,
        at: DateTime<Utc>,
    ) -> Result<PlatformRedirection, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(row) = tables
            .redirections
            .iter_mut()
            .find(|r| r.connection_id == connection_id && r.platform == platform)
        {
            row.redirect_count += 1;
            row.last_redirect_at = at;
            return Ok(row.clone());
        }
        let row = PlatformRedirection {
            id: Uuid::new_v4(),
            connection_id,
            platform,
            redirect_count: 1,
            last_redirect_at: at,
        };
        tables.redirections.push(row.clone());
        Ok(row)
    }

    async fn platform_stats(&self, user_id: Uuid) -> Result<HashMap<Platform, i64>, StoreError> {
        let tables = self.tables.read().await;
        let mut stats = HashMap::new();
        for redirection in &tables.redirections {
            let involved = tables
                .connections
                .iter()
                .any(|c| c.id == redirection.connection_id && c.involves(user_id));
            if involved {
                *stats.entry(redirection.platform).or_insert(0) += redirection.redirect_count;
            }
        }
        Ok(stats)
    }
}

fn fresh_daily_match(new: &NewDailyMatch) -> DailyMatch {
    DailyMatch {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        matched_user_id: new.matched_user_id,
        match_date: new.match_date,
        compatibility_score: new.compatibility_score,
        algorithm_version: new.algorithm_version.clone(),
        viewed: false,
        action: None,
        acted_at: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::fixtures::profile;

    fn daily(user_id: Uuid, date: NaiveDate) -> NewDailyMatch {
        NewDailyMatch {
            user_id,
            matched_user_id: Uuid::new_v4(),
            match_date: date,
            compatibility_score: 0.7,
            algorithm_version: "2.0".into(),
        }
    }

    #[tokio::test]
    async fn daily_match_is_unique_per_user_and_date() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        store.insert_daily_match(&daily(user, date)).await.unwrap();
        let err = store.insert_daily_match(&daily(user, date)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let next_day = date.succ_opt().unwrap();
        assert!(store.insert_daily_match(&daily(user, next_day)).await.is_ok());
    }

    #[tokio::test]
    async fn action_is_recorded_once() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let row = store
            .insert_daily_match(&daily(Uuid::new_v4(), date))
            .await
            .unwrap();

        let acted = store
            .record_daily_action(row.id, DailyAction::Pass, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert!(acted.viewed);
        assert_eq!(acted.action, Some(DailyAction::Pass));

        let again = store
            .record_daily_action(row.id, DailyAction::Connect, Utc::now())
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn replace_only_touches_acted_records() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let row = store.insert_daily_match(&daily(user, date)).await.unwrap();

        assert!(store
            .replace_acted_daily_match(row.id, &daily(user, date))
            .await
            .unwrap()
            .is_none());

        store
            .record_daily_action(row.id, DailyAction::Pass, Utc::now())
            .await
            .unwrap();
        let replaced = store
            .replace_acted_daily_match(row.id, &daily(user, date))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(replaced.id, row.id);
        assert!(replaced.action.is_none());
        assert_eq!(store.list_daily_matches(user, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn connection_insert_is_idempotent() {
        let store = MemoryStore::new();
        let new = NewConnection {
            user1_id: Uuid::new_v4(),
            user2_id: Uuid::new_v4(),
            connection_type: ConnectionType::Friend,
            compatibility_score: 0.5,
            status: ConnectionStatus::Pending,
        };
        let (first, created) = store.insert_connection(&new).await.unwrap();
        let (second, created_again) = store.insert_connection(&new).await.unwrap();
        assert!(created);
        assert!(!created_again);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn block_creates_edge_when_missing() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let blocked = store.block_pair(a, b, Utc::now()).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].status, ConnectionStatus::Blocked);

        let again = store.block_pair(b, a, Utc::now()).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, blocked[0].id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let first = profile("Asha");
        let mut second = profile("Asha");
        second.email = first.email.to_uppercase();
        store.insert_profile(&first).await.unwrap();
        assert!(matches!(
            store.insert_profile(&second).await,
            Err(StoreError::Duplicate("profile"))
        ));
    }

    #[tokio::test]
    async fn redirections_accumulate_per_platform() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (connection, _) = store
            .insert_connection(&NewConnection {
                user1_id: a,
                user2_id: b,
                connection_type: ConnectionType::Friend,
                compatibility_score: 0.9,
                status: ConnectionStatus::Accepted,
            })
            .await
            .unwrap();

        store
            .record_redirection(connection.id, Platform::Whatsapp, Utc::now())
            .await
            .unwrap();
        let row = store
            .record_redirection(connection.id, Platform::Whatsapp, Utc::now())
            .await
            .unwrap();
        assert_eq!(row.redirect_count, 2);

        let stats = store.platform_stats(b).await.unwrap();
        assert_eq!(stats.get(&Platform::Whatsapp), Some(&2));
    }
}
