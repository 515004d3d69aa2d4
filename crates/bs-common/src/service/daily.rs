use std::collections::HashSet;

use chrono::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::ConnectionType;
use crate::api::daily_match::{
    ActionOutcome, DailyAction, DailyMatch, DailyMatchStats, DailyMatchView, NewDailyMatch,
    RecordActionResponse, DEFAULT_HISTORY_LIMIT, STREAK_LOOKBACK_DAYS,
};
use crate::api::recommendation::{RecommendationKind, ALGORITHM_VERSION};
use crate::matching::daily::select_daily;
use crate::matching::RankingCriteria;
use crate::profile::UserProfile;
use crate::store::StoreError;

impl MatchService {
    /// Today's match, generating one when the user has no record for today.
    /// An acted-upon record is returned as is; no new candidate is drawn.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_todays_match(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DailyMatchView>, ServiceError> {
        let user = self.require_complete_profile(user_id).await?;
        let today = self.clock.match_date(self.now());

        let daily_match = match self.store.get_daily_match_for_date(user_id, today).await? {
            Some(existing) => Some(existing),
            None => self.generate_for(&user).await?,
        };

        match daily_match {
            Some(daily_match) => Ok(Some(self.daily_view(&user, daily_match, true).await?)),
            None => Ok(None),
        }
    }

    /// Creates today's record, or replaces it when it was already acted upon.
    /// An unacted record for today is returned unchanged.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn generate_daily_match(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DailyMatchView>, ServiceError> {
        let user = self.require_complete_profile(user_id).await?;
        match self.generate_for(&user).await? {
            Some(daily_match) => Ok(Some(self.daily_view(&user, daily_match, true).await?)),
            None => Ok(None),
        }
    }

    async fn generate_for(&self, user: &UserProfile) -> Result<Option<DailyMatch>, ServiceError> {
        let now = self.now();
        let today = self.clock.match_date(now);
        let existing = self.store.get_daily_match_for_date(user.id, today).await?;

        if let Some(existing) = &existing {
            if !existing.is_acted() {
                return Ok(Some(existing.clone()));
            }
        }

        let Some((matched, score)) = self.pick_daily_candidate(user).await? else {
            info!(user_id = %user.id, "no_daily_candidate");
            return Ok(existing);
        };

        let new = NewDailyMatch {
            user_id: user.id,
            matched_user_id: matched.id,
            match_date: today,
            compatibility_score: score,
            algorithm_version: ALGORITHM_VERSION.to_string(),
        };

        let created = match &existing {
            Some(acted) => self.store.replace_acted_daily_match(acted.id, &new).await?,
            None => match self.store.insert_daily_match(&new).await {
                Ok(created) => Some(created),
                Err(StoreError::Duplicate(_)) => None,
                Err(err) => return Err(err.into()),
            },
        };

        match created {
            Some(created) => {
                info!(
                    user_id = %user.id,
                    matched_user_id = %created.matched_user_id,
                    match_date = %created.match_date,
                    "daily_match_generated"
                );
                self.notify_daily_match(user.id, created.id, &matched.display_name)
                    .await;
                Ok(Some(created))
            }
            // A concurrent request won; hand back its record.
            None => Ok(self.store.get_daily_match_for_date(user.id, today).await?),
        }
    }

    async fn pick_daily_candidate(
        &self,
        user: &UserProfile,
    ) -> Result<Option<(UserProfile, f64)>, ServiceError> {
        let now = self.now();
        let config = self.engine.config();
        let since = self.clock.days_ago(now, config.daily_recent_days);
        let recent: HashSet<Uuid> = self
            .store
            .recent_daily_match_user_ids(user.id, since)
            .await?
            .into_iter()
            .collect();
        let exclusions = self.seen_user_ids(user.id).await?;
        let candidates = self.store.list_candidate_profiles(user.id).await?;

        let criteria = RankingCriteria::new(
            RecommendationKind::DailyMatch,
            user.preferences.connect_similarity,
        )
        .with_limit(config.daily_candidate_pool);
        let outcome = self
            .engine
            .rank(user, &candidates, &exclusions, &criteria, now);

        let picked = select_daily(
            outcome.ranked,
            &recent,
            config.daily_top_picks,
            &mut rand::thread_rng(),
        );
        Ok(picked.map(|ranked| (ranked.profile, ranked.score.total)))
    }

    async fn daily_view(
        &self,
        user: &UserProfile,
        daily_match: DailyMatch,
        with_reasons: bool,
    ) -> Result<DailyMatchView, ServiceError> {
        let matched = self.store.get_profile(daily_match.matched_user_id).await?;
        let match_reasons = match (&matched, with_reasons) {
            (Some(matched), true) => {
                self.engine
                    .compatibility()
                    .score(
                        user,
                        matched,
                        RecommendationKind::DailyMatch,
                        user.preferences.connect_similarity,
                        self.now(),
                    )
                    .reasons
            }
            _ => Vec::new(),
        };
        Ok(DailyMatchView {
            daily_match,
            matched_user: matched.as_ref().map(UserProfile::summary),
            match_reasons,
        })
    }

    /// Marks the match as consumed. Repeating the same action is a no-op; a
    /// different action on an acted match is a conflict. `connect` also opens a
    /// friend request to the matched user.
    #[instrument(skip(self), fields(user_id = %user_id, match_id = %match_id, action = action.as_str()))]
    pub async fn record_action(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        action: DailyAction,
    ) -> Result<RecordActionResponse, ServiceError> {
        let user = self.require_complete_profile(user_id).await?;
        let current = self
            .store
            .get_daily_match(match_id)
            .await?
            .ok_or(ServiceError::NotFound("daily match"))?;
        if current.user_id != user_id {
            return Err(ServiceError::Forbidden("daily match belongs to another user"));
        }
        if action == DailyAction::Connect
            && current.action.is_none()
            && self.pair_is_blocked(user_id, current.matched_user_id).await?
        {
            return Err(ServiceError::Forbidden("users have blocked each other"));
        }

        let recorded = match current.action {
            Some(_) => None,
            None => {
                self.store
                    .record_daily_action(match_id, action, self.now())
                    .await?
            }
        };

        let Some(daily_match) = recorded else {
            let latest = self
                .store
                .get_daily_match(match_id)
                .await?
                .ok_or(ServiceError::NotFound("daily match"))?;
            return match latest.action {
                Some(previous) if previous == action => Ok(RecordActionResponse {
                    daily_match: latest,
                    outcome: ActionOutcome::Unchanged,
                    connection_id: None,
                }),
                Some(previous) => Err(ServiceError::Conflict(format!(
                    "daily match already answered with {}",
                    previous.as_str()
                ))),
                None => Err(ServiceError::Conflict("daily match was replaced".into())),
            };
        };

        let connection_id = if action == DailyAction::Connect {
            let (connection, _) = self
                .open_request(
                    &user,
                    daily_match.matched_user_id,
                    ConnectionType::Friend,
                    daily_match.compatibility_score,
                )
                .await?;
            Some(connection.id)
        } else {
            None
        };

        Ok(RecordActionResponse {
            daily_match,
            outcome: ActionOutcome::Recorded,
            connection_id,
        })
    }

    /// Consecutive days, ending today, with a viewed daily match.
    pub async fn get_user_streak(&self, user_id: Uuid) -> Result<u32, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let today = self.clock.match_date(self.now());
        let history = self
            .store
            .list_daily_matches(user_id, Some(STREAK_LOOKBACK_DAYS as usize))
            .await?;

        let mut streak = 0u32;
        for (offset, daily_match) in history.iter().enumerate() {
            let expected = today - Duration::days(offset as i64);
            if daily_match.match_date != expected || !daily_match.viewed {
                break;
            }
            streak += 1;
        }
        Ok(streak)
    }

    pub async fn get_match_history(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<DailyMatchView>, ServiceError> {
        let user = self.require_complete_profile(user_id).await?;
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 100);
        let history = self.store.list_daily_matches(user_id, Some(limit)).await?;

        let mut views = Vec::with_capacity(history.len());
        for daily_match in history {
            views.push(self.daily_view(&user, daily_match, false).await?);
        }
        Ok(views)
    }

    pub async fn get_daily_match_stats(
        &self,
        user_id: Uuid,
    ) -> Result<DailyMatchStats, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let history = self.store.list_daily_matches(user_id, None).await?;
        let count = |action: DailyAction| {
            history
                .iter()
                .filter(|m| m.action == Some(action))
                .count()
        };

        let viewed = history.iter().filter(|m| m.viewed).count();
        let connected = count(DailyAction::Connect);
        let connection_rate = if viewed == 0 {
            0.0
        } else {
            connected as f64 / viewed as f64 * 100.0
        };

        Ok(DailyMatchStats {
            total_matches: history.len(),
            viewed,
            connected,
            passed: count(DailyAction::Pass),
            super_liked: count(DailyAction::SuperLike),
            connection_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seeded, service};
    use super::*;
    use crate::api::connection::ConnectionStatus;
    use crate::store::MatchStore;

    #[tokio::test]
    async fn todays_match_is_stable_within_a_day() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        seeded(&store, "Ravi").await;
        seeded(&store, "Meera").await;

        let first = service.get_todays_match(me.id).await.unwrap().unwrap();
        let second = service.get_todays_match(me.id).await.unwrap().unwrap();
        assert_eq!(first.daily_match.id, second.daily_match.id);
        assert!(first.matched_user.is_some());
        assert_eq!(store.list_daily_matches(me.id, None).await.unwrap().len(), 1);

        let notifications = store.list_notifications(me.id, 10).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Your Daily Match is Here!");
    }

    #[tokio::test]
    async fn acted_match_is_returned_without_new_candidate() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        seeded(&store, "Ravi").await;
        seeded(&store, "Meera").await;

        let today = service.get_todays_match(me.id).await.unwrap().unwrap();
        let response = service
            .record_action(me.id, today.daily_match.id, DailyAction::Pass)
            .await
            .unwrap();
        assert_eq!(response.outcome, ActionOutcome::Recorded);
        assert!(response.daily_match.viewed);

        let again = service.get_todays_match(me.id).await.unwrap().unwrap();
        assert_eq!(again.daily_match.id, today.daily_match.id);
        assert_eq!(again.daily_match.action, Some(DailyAction::Pass));
        assert_eq!(
            again.daily_match.matched_user_id,
            today.daily_match.matched_user_id
        );
    }

    #[tokio::test]
    async fn repeated_action_is_a_noop_and_different_action_conflicts() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        seeded(&store, "Ravi").await;

        let today = service.get_todays_match(me.id).await.unwrap().unwrap();
        let id = today.daily_match.id;
        service.record_action(me.id, id, DailyAction::Pass).await.unwrap();

        let repeat = service.record_action(me.id, id, DailyAction::Pass).await.unwrap();
        assert_eq!(repeat.outcome, ActionOutcome::Unchanged);

        let err = service
            .record_action(me.id, id, DailyAction::Connect)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn connect_creates_pending_friend_request() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;

        let today = service.get_todays_match(me.id).await.unwrap().unwrap();
        let response = service
            .record_action(me.id, today.daily_match.id, DailyAction::Connect)
            .await
            .unwrap();
        let connection_id = response.connection_id.unwrap();

        let connection = store.get_connection(connection_id).await.unwrap().unwrap();
        assert_eq!(connection.user2_id, other.id);
        assert_eq!(connection.status, ConnectionStatus::Pending);
        assert_eq!(
            connection.compatibility_score,
            today.daily_match.compatibility_score
        );
    }

    #[tokio::test]
    async fn generate_replaces_only_acted_records() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        seeded(&store, "Ravi").await;
        seeded(&store, "Meera").await;

        let first = service.generate_daily_match(me.id).await.unwrap().unwrap();
        let unacted = service.generate_daily_match(me.id).await.unwrap().unwrap();
        assert_eq!(first.daily_match.id, unacted.daily_match.id);

        service
            .record_action(me.id, first.daily_match.id, DailyAction::Pass)
            .await
            .unwrap();
        let replaced = service.generate_daily_match(me.id).await.unwrap().unwrap();
        assert_ne!(replaced.daily_match.id, first.daily_match.id);
        assert!(!replaced.daily_match.is_acted());
        assert_eq!(store.list_daily_matches(me.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_candidates_means_no_match() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        assert!(service.get_todays_match(me.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_match_is_forbidden() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let intruder = seeded(&store, "Ravi").await;

        let today = service.get_todays_match(me.id).await.unwrap().unwrap();
        let err = service
            .record_action(intruder.id, today.daily_match.id, DailyAction::Pass)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn streak_and_stats_follow_viewed_history() {
        let (service, store) = service();
        let me = seeded(&store, "Asha").await;
        let other = seeded(&store, "Ravi").await;
        let today = service.clock().match_date(chrono::Utc::now());

        for days_back in 0..3 {
            let created = store
                .insert_daily_match(&NewDailyMatch {
                    user_id: me.id,
                    matched_user_id: other.id,
                    match_date: today - Duration::days(days_back),
                    compatibility_score: 0.7,
                    algorithm_version: ALGORITHM_VERSION.into(),
                })
                .await
                .unwrap();
            let action = if days_back == 0 {
                DailyAction::Connect
            } else {
                DailyAction::Pass
            };
            store
                .record_daily_action(created.id, action, chrono::Utc::now())
                .await
                .unwrap();
        }

        assert_eq!(service.get_user_streak(me.id).await.unwrap(), 3);

        let stats = service.get_daily_match_stats(me.id).await.unwrap();
        assert_eq!(stats.total_matches, 3);
        assert_eq!(stats.connected, 1);
        assert_eq!(stats.passed, 2);
        assert!((stats.connection_rate - 100.0 / 3.0).abs() < 1e-9);

        let history = service.get_match_history(me.id, Some(2)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].daily_match.match_date, today);
    }
}
