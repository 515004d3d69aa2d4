use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::{Connection, ConnectionStatus, ConnectionType, NewConnection};
use crate::api::feedback_request::{Feedback, FeedbackAction, FeedbackRequest};
use crate::api::feedback_response::FeedbackResponse;
use crate::api::notification::NotificationKind;
use crate::api::recommendation::{
    RecommendationItem, RecommendationKind, RecommendationRequest, RecommendationResponse,
    ACTIVE_RECENTLY_DAYS, ALGORITHM_VERSION, DEFAULT_COUNT, MAX_COUNT,
};
use crate::api::stats::UserStats;
use crate::matching::RankingCriteria;
use crate::profile::UserProfile;

impl MatchService {
    #[instrument(skip(self, request), fields(user_id = %user_id, kind = request.recommendation_type.as_str()))]
    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ServiceError> {
        let filters = &request.filters;
        if let Some(min) = filters.min_compatibility_score {
            if !(0.0..=1.0).contains(&min) {
                return Err(ServiceError::Invalid(
                    "min_compatibility_score must lie in [0, 1]".into(),
                ));
            }
        }

        let user = self.require_complete_profile(user_id).await?;
        let kind = request.recommendation_type;
        let similarity = match kind {
            RecommendationKind::Dating => user.preferences.dating_similarity,
            RecommendationKind::Friends | RecommendationKind::DailyMatch => {
                user.preferences.connect_similarity
            }
        };

        let mut exclusions = self.seen_user_ids(user_id).await?;
        exclusions.extend(filters.exclude_user_ids.iter().copied());
        let candidates = self.store.list_candidate_profiles(user_id).await?;

        let mut criteria = RankingCriteria::new(kind, similarity)
            .with_limit(request.count.unwrap_or(DEFAULT_COUNT).min(MAX_COUNT))
            .with_diversity();
        criteria.min_score = filters.min_compatibility_score;
        criteria.require_verified = filters.verified_only;
        criteria.campus = filters.campus_filter;
        criteria.active_within_days = filters.active_recently.then_some(ACTIVE_RECENTLY_DAYS);

        let now = self.now();
        let outcome = self
            .engine
            .rank(&user, &candidates, &exclusions, &criteria, now);

        Ok(RecommendationResponse {
            user_id,
            recommendation_type: kind,
            total_candidates: outcome.total_candidates,
            recommendations: outcome
                .ranked
                .into_iter()
                .map(|ranked| RecommendationItem {
                    user_id: ranked.profile.id,
                    compatibility_score: ranked.score.total,
                    confidence: ranked.score.confidence,
                    common_interests: ranked.score.common_interests,
                    match_reasons: ranked.score.reasons,
                    personality_match: ranked.score.personality_match,
                    explanation: ranked.score.explanation,
                    profile: ranked.profile.summary(),
                })
                .collect(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
            generated_at: now,
            fallback_used: false,
        })
    }

    /// Stores the latest action for the pair. A like answered by a like from
    /// the other side becomes an accepted friend connection.
    #[instrument(skip(self, request), fields(user_id = %user_id, target_user_id = %request.target_user_id, action = request.action.as_str()))]
    pub async fn submit_feedback(
        &self,
        user_id: Uuid,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, ServiceError> {
        if request.target_user_id == user_id {
            return Err(ServiceError::Invalid("cannot give feedback on yourself".into()));
        }
        let user = self.require_complete_profile(user_id).await?;
        let target = self.require_profile(request.target_user_id).await?;

        let status = self
            .store
            .upsert_feedback(&Feedback {
                user_id,
                target_user_id: target.id,
                action: request.action,
                context: request.context.clone(),
                created_at: self.now(),
            })
            .await?;

        if request.action == FeedbackAction::Block {
            self.store.block_pair(user_id, target.id, self.now()).await?;
        }

        let reciprocated = request.action.is_positive()
            && self
                .store
                .get_feedback(target.id, user_id)
                .await?
                .is_some_and(|theirs| theirs.action.is_positive());

        let connection_id = if reciprocated {
            self.mutual_connection(&user, &target)
                .await?
                .map(|connection| connection.id)
        } else {
            None
        };

        Ok(FeedbackResponse {
            status,
            mutual_match: connection_id.is_some(),
            connection_id,
        })
    }

    /// Accepted friend edge between two users who liked each other. Reuses an
    /// existing friend edge in either direction; a pending one is accepted.
    /// `None` when the pair is blocked or the friend request was declined.
    async fn mutual_connection(
        &self,
        user: &UserProfile,
        target: &UserProfile,
    ) -> Result<Option<Connection>, ServiceError> {
        let now = self.now();
        let between = self.store.connections_between(user.id, target.id).await?;
        if between.iter().any(|c| c.status == ConnectionStatus::Blocked) {
            return Ok(None);
        }
        let friend_edge = |status: ConnectionStatus| {
            between
                .iter()
                .find(|c| c.connection_type == ConnectionType::Friend && c.status == status)
                .cloned()
        };

        if let Some(accepted) = friend_edge(ConnectionStatus::Accepted) {
            return Ok(Some(accepted));
        }
        let existing = friend_edge(ConnectionStatus::Pending)
            .or_else(|| friend_edge(ConnectionStatus::Declined));

        let connection = match existing {
            Some(c) if c.status == ConnectionStatus::Pending => {
                let accepted = self
                    .store
                    .transition_connection(c.id, ConnectionStatus::Pending, ConnectionStatus::Accepted, now)
                    .await?;
                match accepted {
                    Some(accepted) => accepted,
                    None => {
                        return Ok(self
                            .store
                            .get_connection(c.id)
                            .await?
                            .filter(|c| c.status == ConnectionStatus::Accepted))
                    }
                }
            }
            Some(_) => return Ok(None),
            None => {
                let score = self
                    .engine
                    .compatibility()
                    .score(
                        user,
                        target,
                        RecommendationKind::Friends,
                        user.preferences.connect_similarity,
                        now,
                    )
                    .total;
                let (connection, created) = self
                    .store
                    .insert_connection(&NewConnection {
                        // the earlier like asked first
                        user1_id: target.id,
                        user2_id: user.id,
                        connection_type: ConnectionType::Friend,
                        compatibility_score: score,
                        status: ConnectionStatus::Accepted,
                    })
                    .await?;
                if !created {
                    return Ok((connection.status == ConnectionStatus::Accepted).then_some(connection));
                }
                connection
            }
        };

        info!(connection_id = %connection.id, "mutual_match");
        for (recipient, other) in [(user, target), (target, user)] {
            self.notify(
                recipient.id,
                NotificationKind::Match,
                "It's a match!",
                format!("You and {} liked each other", other.display_name),
                json!({ "connection_id": connection.id, "user_id": other.id }),
            )
            .await;
        }
        Ok(Some(connection))
    }

    pub async fn get_user_stats(&self, user_id: Uuid) -> Result<UserStats, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let feedback = self.store.list_feedback_by_user(user_id).await?;
        let likes_given = feedback.iter().filter(|f| f.action.is_positive()).count();
        let passes_given = feedback
            .iter()
            .filter(|f| f.action == FeedbackAction::Pass)
            .count();

        let connections: Vec<Connection> = self
            .store
            .list_connections(user_id)
            .await?
            .into_iter()
            .filter(|c| c.status == ConnectionStatus::Accepted)
            .collect();
        let total_connections = connections.len();
        let avg_compatibility = if total_connections == 0 {
            0.0
        } else {
            connections.iter().map(|c| c.compatibility_score).sum::<f64>()
                / total_connections as f64
        };
        let match_rate = if likes_given == 0 {
            0.0
        } else {
            total_connections as f64 / likes_given as f64
        };

        Ok(UserStats {
            user_id,
            likes_given,
            passes_given,
            total_connections,
            avg_compatibility,
            match_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seeded, service};
    use super::*;
    use crate::api::feedback_response::FeedbackStatus;
    use crate::api::recommendation::RecommendationFilters;
    use crate::profile::Campus;
    use crate::store::MatchStore;

    fn feedback(target: Uuid, action: FeedbackAction) -> FeedbackRequest {
        FeedbackRequest {
            user_id: None,
            target_user_id: target,
            action,
            context: None,
        }
    }

    fn request(kind: RecommendationKind) -> RecommendationRequest {
        RecommendationRequest {
            user_id: None,
            recommendation_type: kind,
            count: Some(5),
            filters: RecommendationFilters::default(),
        }
    }

    #[tokio::test]
    async fn recommendations_carry_version_and_scores() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        seeded(&store, "Ravi").await;
        seeded(&store, "Meera").await;

        let response = service
            .get_recommendations(me.id, &request(RecommendationKind::Friends))
            .await
            .unwrap();
        assert_eq!(response.algorithm_version, "2.0");
        assert!(!response.fallback_used);
        assert_eq!(response.recommendations.len(), 2);
        for item in &response.recommendations {
            assert!((0.0..=1.0).contains(&item.compatibility_score));
            assert!((0.0..=1.0).contains(&item.confidence));
            assert_ne!(item.user_id, me.id);
        }
    }

    #[tokio::test]
    async fn filters_exclude_ids_and_campus() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let excluded = seeded(&store, "Ravi").await;
        let mut goa = crate::profile::fixtures::profile("Meera");
        goa.campus = Campus::Goa;
        store.insert_profile(&goa).await.unwrap();
        let kept = seeded(&store, "Kabir").await;

        let mut req = request(RecommendationKind::Friends);
        req.filters.exclude_user_ids = vec![excluded.id];
        req.filters.campus_filter = Some(Campus::Pilani);
        let response = service.get_recommendations(me.id, &req).await.unwrap();
        let ids: Vec<Uuid> = response.recommendations.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![kept.id]);
    }

    #[tokio::test]
    async fn mutual_like_creates_one_accepted_connection() {
        let (service, store) = service();
        let a = seeded(&store, "Asha").await;
        let b = seeded(&store, "Ravi").await;

        let first = service
            .submit_feedback(a.id, &feedback(b.id, FeedbackAction::Like))
            .await
            .unwrap();
        assert_eq!(first.status, FeedbackStatus::Created);
        assert!(!first.mutual_match);

        let second = service
            .submit_feedback(b.id, &feedback(a.id, FeedbackAction::SuperLike))
            .await
            .unwrap();
        assert!(second.mutual_match);
        let connection_id = second.connection_id.unwrap();

        let again = service
            .submit_feedback(b.id, &feedback(a.id, FeedbackAction::Like))
            .await
            .unwrap();
        assert_eq!(again.status, FeedbackStatus::Updated);
        assert_eq!(again.connection_id, Some(connection_id));

        let connections = store.list_connections(a.id).await.unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].status, ConnectionStatus::Accepted);

        let stats = service.get_user_stats(a.id).await.unwrap();
        assert_eq!(stats.likes_given, 1);
        assert_eq!(stats.total_connections, 1);
        assert!((stats.match_rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn pass_is_not_a_match_and_counts_as_pass() {
        let (service, store) = service();
        let a = seeded(&store, "Asha").await;
        let b = seeded(&store, "Ravi").await;

        service
            .submit_feedback(b.id, &feedback(a.id, FeedbackAction::Like))
            .await
            .unwrap();
        let response = service
            .submit_feedback(a.id, &feedback(b.id, FeedbackAction::Pass))
            .await
            .unwrap();
        assert!(!response.mutual_match);

        let stats = service.get_user_stats(a.id).await.unwrap();
        assert_eq!(stats.passes_given, 1);
        assert_eq!(stats.match_rate, 0.0);
    }

    #[tokio::test]
    async fn declined_or_blocked_pairs_are_not_mutual() {
        let (service, store) = service();
        let a = seeded(&store, "Asha").await;
        let b = seeded(&store, "Ravi").await;
        let request = crate::api::connection::CreateConnectionRequest {
            user_id: None,
            target_user_id: b.id,
            connection_type: ConnectionType::Friend,
            compatibility_score: None,
        };
        let sent = service.create_connection(a.id, &request).await.unwrap();
        service.decline_connection(b.id, sent.connection.id).await.unwrap();

        service
            .submit_feedback(a.id, &feedback(b.id, FeedbackAction::Like))
            .await
            .unwrap();
        let declined = service
            .submit_feedback(b.id, &feedback(a.id, FeedbackAction::Like))
            .await
            .unwrap();
        assert!(!declined.mutual_match);
        assert_eq!(declined.connection_id, None);

        let c = seeded(&store, "Meera").await;
        let d = seeded(&store, "Kabir").await;
        service.block_user(c.id, d.id).await.unwrap();
        service
            .submit_feedback(d.id, &feedback(c.id, FeedbackAction::Like))
            .await
            .unwrap();
        let blocked = service
            .submit_feedback(c.id, &feedback(d.id, FeedbackAction::SuperLike))
            .await
            .unwrap();
        assert!(!blocked.mutual_match);
        let edges = store.list_connections(c.id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].status, ConnectionStatus::Blocked);
    }
}
