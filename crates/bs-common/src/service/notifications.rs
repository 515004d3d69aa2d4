use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::ConnectionType;
use crate::api::notification::{NewNotification, Notification, NotificationKind};

pub const DEFAULT_NOTIFICATION_LIMIT: usize = 20;

impl MatchService {
    /// Writes a notification. Failures are logged and swallowed so the
    /// triggering operation still succeeds.
    pub(crate) async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: Value,
    ) {
        let notification = NewNotification {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            data,
        };
        if let Err(err) = self.store.insert_notification(&notification).await {
            warn!(
                error = %err,
                user_id = %user_id,
                kind = kind.as_str(),
                "notification_write_failed"
            );
        }
    }

    pub(crate) async fn notify_daily_match(&self, user_id: Uuid, match_id: Uuid, matched_name: &str) {
        self.notify(
            user_id,
            NotificationKind::DailyMatch,
            "Your Daily Match is Here!",
            format!("Check out {matched_name} - they might be perfect for you!"),
            json!({ "daily_match_id": match_id }),
        )
        .await;
    }

    pub(crate) async fn notify_connection_request(
        &self,
        receiver: Uuid,
        connection_id: Uuid,
        connection_type: ConnectionType,
        requester_name: &str,
    ) {
        let title = match connection_type {
            ConnectionType::Friend => "New friend request",
            ConnectionType::Date => "New date request",
        };
        self.notify(
            receiver,
            NotificationKind::ConnectionRequest,
            title,
            format!("{requester_name} wants to connect with you"),
            json!({ "connection_id": connection_id }),
        )
        .await;
    }

    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let limit = limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).clamp(1, 100);
        Ok(self.store.list_notifications(user_id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seeded, service};
    use super::*;
    use crate::store::MatchStore;

    #[tokio::test]
    async fn notifications_are_listed_newest_first() {
        let (service, store) = service();
        let user = seeded(&store, "Asha").await;

        service
            .notify_daily_match(user.id, Uuid::new_v4(), "Ravi")
            .await;
        service
            .notify_connection_request(user.id, Uuid::new_v4(), ConnectionType::Date, "Meera")
            .await;

        let listed = service.list_notifications(user.id, None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "New date request");
        assert_eq!(listed[1].message, "Check out Ravi - they might be perfect for you!");
        assert_eq!(store.list_notifications(user.id, 1).await.unwrap().len(), 1);
    }
}
