use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::{ConnectionStatus, ConnectionType, NewConnection};
use crate::api::notification::NotificationKind;
use crate::api::ship::{
    CreateShipRequest, NewShip, Ship, ShipCounts, ShipDecision, ShipStats, SHIP_CONNECTION_SCORE,
};
use crate::profile::UserProfile;
use crate::store::StoreError;

const ANONYMOUS_SHIPPER: &str = "Someone";

impl MatchService {
    /// A third user suggests that two others would click. Both are notified.
    #[instrument(skip(self, request), fields(shipper_id = %shipper_id))]
    pub async fn create_ship(
        &self,
        shipper_id: Uuid,
        request: &CreateShipRequest,
    ) -> Result<Ship, ServiceError> {
        let first = request.user1_email.trim().to_lowercase();
        let second = request.user2_email.trim().to_lowercase();
        if first.is_empty() || second.is_empty() {
            return Err(ServiceError::Invalid("both e-mail addresses are required".into()));
        }
        if first == second {
            return Err(ServiceError::Invalid("cannot ship someone with themselves".into()));
        }

        let shipper = self.require_complete_profile(shipper_id).await?;
        let found = self
            .store
            .find_profiles_by_emails(&[first.clone(), second.clone()])
            .await?;
        let lookup = |email: &str| -> Result<UserProfile, ServiceError> {
            found
                .iter()
                .find(|p| p.email.eq_ignore_ascii_case(email))
                .cloned()
                .ok_or(ServiceError::NotFound("user"))
        };
        let user1 = lookup(&first)?;
        let user2 = lookup(&second)?;
        if user1.id == shipper.id || user2.id == shipper.id {
            return Err(ServiceError::Invalid("cannot ship yourself".into()));
        }

        let ship = match self
            .store
            .insert_ship(&NewShip {
                shipper_id,
                user1_id: user1.id,
                user2_id: user2.id,
                message: request.message.trim().to_string(),
                is_anonymous: request.is_anonymous,
            })
            .await
        {
            Ok(ship) => ship,
            Err(StoreError::Duplicate(_)) => {
                return Err(ServiceError::Conflict("you already shipped this pair".into()));
            }
            Err(err) => return Err(err.into()),
        };

        let shipper_name = if ship.is_anonymous {
            ANONYMOUS_SHIPPER
        } else {
            shipper.display_name.as_str()
        };
        let data = json!({
            "ship_id": ship.id,
            "shipper_id": (!ship.is_anonymous).then_some(shipper_id),
            "is_anonymous": ship.is_anonymous,
        });
        for recipient in [user1.id, user2.id] {
            self.notify(
                recipient,
                NotificationKind::Ship,
                "You've been shipped!",
                format!("{shipper_name} thinks you'd be perfect with someone"),
                data.clone(),
            )
            .await;
        }

        info!(ship_id = %ship.id, "ship_created");
        Ok(ship)
    }

    /// Ships naming the user; anonymous shippers are hidden.
    pub async fn received_ships(&self, user_id: Uuid) -> Result<Vec<Ship>, ServiceError> {
        self.require_complete_profile(user_id).await?;
        Ok(self
            .store
            .list_ships_received(user_id)
            .await?
            .into_iter()
            .map(Ship::redacted_for_recipient)
            .collect())
    }

    pub async fn sent_ships(&self, user_id: Uuid) -> Result<Vec<Ship>, ServiceError> {
        self.require_complete_profile(user_id).await?;
        Ok(self.store.list_ships_sent(user_id).await?)
    }

    /// Either shipped user answers a pending ship. Accepting connects the pair
    /// as friends.
    #[instrument(skip(self))]
    pub async fn respond_to_ship(
        &self,
        user_id: Uuid,
        ship_id: Uuid,
        decision: ShipDecision,
    ) -> Result<Ship, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let ship = self
            .store
            .get_ship(ship_id)
            .await?
            .ok_or(ServiceError::NotFound("ship"))?;
        if !ship.involves(user_id) {
            return Err(ServiceError::Forbidden("only shipped users can respond"));
        }
        if decision == ShipDecision::Accept
            && self.pair_is_blocked(ship.user1_id, ship.user2_id).await?
        {
            return Err(ServiceError::Forbidden("users have blocked each other"));
        }

        let ship = self
            .store
            .respond_ship(ship_id, decision.status(), self.now())
            .await?
            .ok_or_else(|| ServiceError::Conflict("ship was already answered".into()))?;

        if decision == ShipDecision::Accept {
            self.connect_shipped_pair(&ship).await?;
        }

        let names = self.pair_names(&ship).await?;
        self.notify(
            ship.shipper_id,
            NotificationKind::Ship,
            match decision {
                ShipDecision::Accept => "Ship accepted!",
                ShipDecision::Decline => "Ship declined!",
            },
            format!("{names} {} your ship", decision.past_tense()),
            json!({ "ship_id": ship.id }),
        )
        .await;

        Ok(ship.redacted_for_recipient())
    }

    /// Reuses a friend edge in either direction, accepting a pending one.
    async fn connect_shipped_pair(&self, ship: &Ship) -> Result<(), ServiceError> {
        let existing = self
            .store
            .connections_between(ship.user1_id, ship.user2_id)
            .await?
            .into_iter()
            .find(|c| c.connection_type == ConnectionType::Friend);

        match existing {
            Some(c) if c.status == ConnectionStatus::Pending => {
                self.store
                    .transition_connection(
                        c.id,
                        ConnectionStatus::Pending,
                        ConnectionStatus::Accepted,
                        self.now(),
                    )
                    .await?;
            }
            Some(_) => {}
            None => {
                self.store
                    .insert_connection(&NewConnection {
                        user1_id: ship.user1_id,
                        user2_id: ship.user2_id,
                        connection_type: ConnectionType::Friend,
                        compatibility_score: SHIP_CONNECTION_SCORE,
                        status: ConnectionStatus::Accepted,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    async fn pair_names(&self, ship: &Ship) -> Result<String, ServiceError> {
        let mut names = Vec::with_capacity(2);
        for id in [ship.user1_id, ship.user2_id] {
            if let Some(profile) = self.store.get_profile(id).await? {
                names.push(profile.display_name);
            }
        }
        Ok(names.join(" and "))
    }

    pub async fn ship_stats(&self, user_id: Uuid) -> Result<ShipStats, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let sent = self.store.list_ships_sent(user_id).await?;
        let received = self.store.list_ships_received(user_id).await?;
        Ok(ShipStats {
            sent: ShipCounts::tally(&sent),
            received: ShipCounts::tally(&received),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seeded, service};
    use super::*;
    use crate::api::ship::ShipStatus;
    use crate::store::MatchStore;

    fn ship_request(a: &UserProfile, b: &UserProfile, anonymous: bool) -> CreateShipRequest {
        CreateShipRequest {
            shipper_id: None,
            user1_email: a.email.to_uppercase(),
            user2_email: b.email.clone(),
            message: "you two would get along".into(),
            is_anonymous: anonymous,
        }
    }

    #[tokio::test]
    async fn ship_notifies_both_and_hides_anonymous_shipper() {
        let (service, store) = service();
        let shipper = seeded(&store, "Asha").await;
        let a = seeded(&store, "Ravi").await;
        let b = seeded(&store, "Meera").await;

        let ship = service
            .create_ship(shipper.id, &ship_request(&a, &b, true))
            .await
            .unwrap();
        assert_eq!(ship.status, ShipStatus::Pending);

        for user in [&a, &b] {
            let notes = store.list_notifications(user.id, 10).await.unwrap();
            assert_eq!(notes[0].message, "Someone thinks you'd be perfect with someone");
            assert!(notes[0].data["shipper_id"].is_null());
        }

        let received = service.received_ships(a.id).await.unwrap();
        assert_eq!(received[0].shipper_id, Uuid::nil());
        let sent = service.sent_ships(shipper.id).await.unwrap();
        assert_eq!(sent[0].shipper_id, shipper.id);
    }

    #[tokio::test]
    async fn one_ship_per_pair_regardless_of_order() {
        let (service, store) = service();
        let shipper = seeded(&store, "Asha").await;
        let a = seeded(&store, "Ravi").await;
        let b = seeded(&store, "Meera").await;

        service
            .create_ship(shipper.id, &ship_request(&a, &b, false))
            .await
            .unwrap();
        let err = service
            .create_ship(shipper.id, &ship_request(&b, &a, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn cannot_ship_self_or_unknown_users() {
        let (service, store) = service();
        let shipper = seeded(&store, "Asha").await;
        let a = seeded(&store, "Ravi").await;

        let err = service
            .create_ship(shipper.id, &ship_request(&shipper, &a, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        let mut request = ship_request(&a, &a, false);
        request.user2_email = "ghost@pilani.bits-pilani.ac.in".into();
        let err = service.create_ship(shipper.id, &request).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("user")));
    }

    #[tokio::test]
    async fn accepting_connects_the_pair_and_tells_the_shipper() {
        let (service, store) = service();
        let shipper = seeded(&store, "Asha").await;
        let a = seeded(&store, "Ravi").await;
        let b = seeded(&store, "Meera").await;
        let ship = service
            .create_ship(shipper.id, &ship_request(&a, &b, false))
            .await
            .unwrap();

        let outsider = service
            .respond_to_ship(shipper.id, ship.id, ShipDecision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(outsider, ServiceError::Forbidden(_)));

        let answered = service
            .respond_to_ship(b.id, ship.id, ShipDecision::Accept)
            .await
            .unwrap();
        assert_eq!(answered.status, ShipStatus::Accepted);

        let connections = store.list_connections(a.id).await.unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].compatibility_score, SHIP_CONNECTION_SCORE);
        assert_eq!(connections[0].status, ConnectionStatus::Accepted);

        let notes = store.list_notifications(shipper.id, 10).await.unwrap();
        assert_eq!(notes[0].title, "Ship accepted!");
        assert_eq!(notes[0].message, "Ravi and Meera accepted your ship");

        let again = service
            .respond_to_ship(a.id, ship.id, ShipDecision::Decline)
            .await
            .unwrap_err();
        assert!(matches!(again, ServiceError::Conflict(_)));

        let stats = service.ship_stats(shipper.id).await.unwrap();
        assert_eq!(stats.sent.accepted, 1);
        assert_eq!(stats.received.total, 0);
    }

    #[tokio::test]
    async fn blocked_pair_cannot_accept_a_ship() {
        let (service, store) = service();
        let shipper = seeded(&store, "Asha").await;
        let a = seeded(&store, "Ravi").await;
        let b = seeded(&store, "Meera").await;
        let ship = service
            .create_ship(shipper.id, &ship_request(&a, &b, false))
            .await
            .unwrap();
        service.block_user(b.id, a.id).await.unwrap();

        let err = service
            .respond_to_ship(a.id, ship.id, ShipDecision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let edges = store.list_connections(a.id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].status, ConnectionStatus::Blocked);
        assert_eq!(
            store.get_ship(ship.id).await.unwrap().map(|s| s.status),
            Some(ShipStatus::Pending)
        );
    }
}
