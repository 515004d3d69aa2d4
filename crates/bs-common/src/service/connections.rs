use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::{
    Connection, ConnectionStats, ConnectionStatus, ConnectionType, ConnectionView,
    CreateConnectionRequest, CreateConnectionResponse, NewConnection,
};
use crate::api::notification::NotificationKind;
use crate::matching::scoring::clamp_unit;
use crate::profile::UserProfile;

impl MatchService {
    /// Idempotent per (requester, target, type). A pending request from the
    /// target is accepted instead of being mirrored. The score is computed when
    /// the caller does not supply one.
    #[instrument(skip(self, request), fields(user_id = %user_id, target_user_id = %request.target_user_id))]
    pub async fn create_connection(
        &self,
        user_id: Uuid,
        request: &CreateConnectionRequest,
    ) -> Result<CreateConnectionResponse, ServiceError> {
        if request.target_user_id == user_id {
            return Err(ServiceError::Invalid("cannot connect with yourself".into()));
        }
        if let Some(score) = request.compatibility_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ServiceError::Invalid(
                    "compatibility_score must lie in [0, 1]".into(),
                ));
            }
        }

        let user = self.require_complete_profile(user_id).await?;
        let target = self.require_profile(request.target_user_id).await?;
        let score = match request.compatibility_score {
            Some(score) => score,
            None => {
                let similarity = match request.connection_type {
                    ConnectionType::Friend => user.preferences.connect_similarity,
                    ConnectionType::Date => user.preferences.dating_similarity,
                };
                self.engine
                    .compatibility()
                    .score(
                        &user,
                        &target,
                        request.connection_type.into(),
                        similarity,
                        self.now(),
                    )
                    .total
            }
        };

        let (connection, created) = self
            .open_request(&user, target.id, request.connection_type, clamp_unit(score))
            .await?;
        Ok(CreateConnectionResponse {
            connection,
            created,
        })
    }

    pub(super) async fn pair_is_blocked(&self, a: Uuid, b: Uuid) -> Result<bool, ServiceError> {
        Ok(self
            .store
            .connections_between(a, b)
            .await?
            .iter()
            .any(|c| c.status == ConnectionStatus::Blocked))
    }

    /// Pending request from `requester` to `target_id`, notifying the target
    /// when a row is created. Blocked pairs are refused.
    pub(super) async fn open_request(
        &self,
        requester: &UserProfile,
        target_id: Uuid,
        connection_type: ConnectionType,
        score: f64,
    ) -> Result<(Connection, bool), ServiceError> {
        let between = self
            .store
            .connections_between(requester.id, target_id)
            .await?;
        if between.iter().any(|c| c.status == ConnectionStatus::Blocked) {
            return Err(ServiceError::Forbidden("users have blocked each other"));
        }

        let reverse = between.into_iter().find(|c| {
            c.user1_id == target_id
                && c.connection_type == connection_type
                && matches!(
                    c.status,
                    ConnectionStatus::Pending | ConnectionStatus::Accepted
                )
        });
        if let Some(reverse) = reverse {
            if reverse.status == ConnectionStatus::Accepted {
                return Ok((reverse, false));
            }
            if let Some(accepted) = self
                .store
                .transition_connection(
                    reverse.id,
                    ConnectionStatus::Pending,
                    ConnectionStatus::Accepted,
                    self.now(),
                )
                .await?
            {
                info!(connection_id = %accepted.id, "crossed_requests_accepted");
                self.notify(
                    target_id,
                    NotificationKind::Match,
                    "Connection Accepted!",
                    format!("{} accepted your connection request", requester.display_name),
                    json!({ "connection_id": accepted.id }),
                )
                .await;
                return Ok((accepted, false));
            }
            let current = self
                .store
                .get_connection(reverse.id)
                .await?
                .unwrap_or(reverse);
            return Ok((current, false));
        }

        let (connection, created) = self
            .store
            .insert_connection(&NewConnection {
                user1_id: requester.id,
                user2_id: target_id,
                connection_type,
                compatibility_score: score,
                status: ConnectionStatus::Pending,
            })
            .await?;

        if created {
            info!(connection_id = %connection.id, "connection_created");
            self.notify_connection_request(
                target_id,
                connection.id,
                connection.connection_type,
                &requester.display_name,
            )
            .await;
        }
        Ok((connection, created))
    }

    pub async fn list_connections(&self, user_id: Uuid) -> Result<Vec<ConnectionView>, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let connections = self.store.list_connections(user_id).await?;
        Ok(connections
            .into_iter()
            .map(|connection| view(connection, user_id))
            .collect())
    }

    /// Pending requests the user has received.
    pub async fn pending_requests(&self, user_id: Uuid) -> Result<Vec<ConnectionView>, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let connections = self.store.list_connections(user_id).await?;
        Ok(connections
            .into_iter()
            .filter(|c| c.status == ConnectionStatus::Pending && c.user2_id == user_id)
            .map(|connection| view(connection, user_id))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn accept_connection(
        &self,
        user_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Connection, ServiceError> {
        let accepter = self.require_complete_profile(user_id).await?;
        let connection = self
            .answer_connection(user_id, connection_id, ConnectionStatus::Accepted)
            .await?;

        self.notify(
            connection.user1_id,
            NotificationKind::Match,
            "Connection Accepted!",
            format!("{} accepted your connection request", accepter.display_name),
            json!({ "connection_id": connection.id }),
        )
        .await;
        Ok(connection)
    }

    #[instrument(skip(self))]
    pub async fn decline_connection(
        &self,
        user_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Connection, ServiceError> {
        self.require_complete_profile(user_id).await?;
        self.answer_connection(user_id, connection_id, ConnectionStatus::Declined)
            .await
    }

    async fn answer_connection(
        &self,
        user_id: Uuid,
        connection_id: Uuid,
        to: ConnectionStatus,
    ) -> Result<Connection, ServiceError> {
        let connection = self
            .store
            .get_connection(connection_id)
            .await?
            .ok_or(ServiceError::NotFound("connection"))?;
        if connection.user2_id != user_id {
            return Err(ServiceError::Forbidden(
                "only the receiver can answer a connection request",
            ));
        }
        self.store
            .transition_connection(connection_id, ConnectionStatus::Pending, to, self.now())
            .await?
            .ok_or_else(|| ServiceError::Conflict("connection request was already answered".into()))
    }

    #[instrument(skip(self))]
    pub async fn block_user(
        &self,
        user_id: Uuid,
        blocked_user_id: Uuid,
    ) -> Result<Vec<Connection>, ServiceError> {
        if user_id == blocked_user_id {
            return Err(ServiceError::Invalid("cannot block yourself".into()));
        }
        self.require_complete_profile(user_id).await?;
        self.require_profile(blocked_user_id).await?;
        Ok(self
            .store
            .block_pair(user_id, blocked_user_id, self.now())
            .await?)
    }

    /// True when an accepted connection exists in either direction.
    pub async fn are_users_connected(&self, a: Uuid, b: Uuid) -> Result<bool, ServiceError> {
        self.require_complete_profile(a).await?;
        let connections = self.store.list_connections(a).await?;
        Ok(connections
            .iter()
            .any(|c| c.involves(b) && c.status == ConnectionStatus::Accepted))
    }

    pub async fn connection_stats(&self, user_id: Uuid) -> Result<ConnectionStats, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let connections = self.store.list_connections(user_id).await?;
        let mut stats = ConnectionStats {
            total: connections.len(),
            ..ConnectionStats::default()
        };
        for connection in &connections {
            match connection.status {
                ConnectionStatus::Accepted => stats.accepted += 1,
                ConnectionStatus::Pending => stats.pending += 1,
                ConnectionStatus::Declined | ConnectionStatus::Blocked => {}
            }
            match connection.connection_type {
                ConnectionType::Friend => stats.friends += 1,
                ConnectionType::Date => stats.dates += 1,
            }
        }
        Ok(stats)
    }
}

fn view(connection: Connection, user_id: Uuid) -> ConnectionView {
    ConnectionView {
        other_user_id: connection.other_user(user_id),
        connection,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seeded, service};
    use super::*;
    use crate::store::MatchStore;

    fn request(target: Uuid) -> CreateConnectionRequest {
        CreateConnectionRequest {
            user_id: None,
            target_user_id: target,
            connection_type: ConnectionType::Friend,
            compatibility_score: None,
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_and_notifies_once() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;

        let first = service.create_connection(me.id, &request(other.id)).await.unwrap();
        let second = service.create_connection(me.id, &request(other.id)).await.unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.connection.id, second.connection.id);
        assert!((0.0..=1.0).contains(&first.connection.compatibility_score));

        let notes = store.list_notifications(other.id, 10).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "New friend request");
        assert_eq!(notes[0].message, "Asha wants to connect with you");
    }

    #[tokio::test]
    async fn only_receiver_answers_and_only_once() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;
        let created = service.create_connection(me.id, &request(other.id)).await.unwrap();
        let id = created.connection.id;

        assert_eq!(service.pending_requests(other.id).await.unwrap().len(), 1);
        assert!(service.pending_requests(me.id).await.unwrap().is_empty());

        let err = service.accept_connection(me.id, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let accepted = service.accept_connection(other.id, id).await.unwrap();
        assert_eq!(accepted.status, ConnectionStatus::Accepted);
        assert!(accepted.responded_at.is_some());
        assert!(service.are_users_connected(me.id, other.id).await.unwrap());
        assert!(service.are_users_connected(other.id, me.id).await.unwrap());

        let err = service.decline_connection(other.id, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let notes = store.list_notifications(me.id, 10).await.unwrap();
        assert_eq!(notes[0].title, "Connection Accepted!");
    }

    #[tokio::test]
    async fn block_without_edge_creates_blocked_friend_edge() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;

        let blocked = service.block_user(me.id, other.id).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].status, ConnectionStatus::Blocked);
        assert_eq!(blocked[0].connection_type, ConnectionType::Friend);

        let stats = service.connection_stats(me.id).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.friends, 1);
        assert_eq!(stats.accepted, 0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_score_and_self_connection() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;

        let err = service.create_connection(me.id, &request(me.id)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        let mut bad = request(other.id);
        bad.compatibility_score = Some(1.5);
        let err = service.create_connection(me.id, &bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn blocked_pair_cannot_request_in_either_direction() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Bala").await;
        service.block_user(me.id, other.id).await.unwrap();

        for (from, to) in [(other.id, me.id), (me.id, other.id)] {
            let err = service.create_connection(from, &request(to)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
        assert!(service.pending_requests(me.id).await.unwrap().is_empty());
        assert!(store.list_notifications(me.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crossed_request_accepts_the_pending_one() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;
        let first = service.create_connection(me.id, &request(other.id)).await.unwrap();

        let back = service.create_connection(other.id, &request(me.id)).await.unwrap();
        assert!(!back.created);
        assert_eq!(back.connection.id, first.connection.id);
        assert_eq!(back.connection.status, ConnectionStatus::Accepted);
        assert_eq!(store.list_connections(me.id).await.unwrap().len(), 1);

        let notes = store.list_notifications(me.id, 10).await.unwrap();
        assert_eq!(notes[0].title, "Connection Accepted!");
        assert_eq!(notes[0].message, "Ravi accepted your connection request");
    }

    #[tokio::test]
    async fn incomplete_profile_is_gated_everywhere() {
        let (service, store) = service();
        let mut me = crate::profile::fixtures::profile("Newbie");
        me.profile_completed = false;
        store.insert_profile(&me).await.unwrap();
        let other = seeded(&store, "Ravi").await;

        let results = [
            service.list_connections(me.id).await.map(|_| ()),
            service.pending_requests(me.id).await.map(|_| ()),
            service.connection_stats(me.id).await.map(|_| ()),
            service.are_users_connected(me.id, other.id).await.map(|_| ()),
            service.block_user(me.id, other.id).await.map(|_| ()),
            service.get_user_streak(me.id).await.map(|_| ()),
            service.get_match_history(me.id, None).await.map(|_| ()),
            service.received_ships(me.id).await.map(|_| ()),
            service.list_notifications(me.id, None).await.map(|_| ()),
            service.platform_stats(me.id).await.map(|_| ()),
            service.get_user_stats(me.id).await.map(|_| ()),
        ];
        for result in results {
            assert!(matches!(result, Err(ServiceError::ProfileIncomplete(id)) if id == me.id));
        }
    }
}
