//! Operations behind the HTTP API.
//!
//! [`MatchService`] owns the scoring engine and talks to storage only through
//! [`MatchStore`]; it never assumes a particular backend.

mod connections;
mod daily;
mod invitations;
mod matches;
mod notifications;
mod profiles;
mod recommendations;
mod shipping;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::deep_links::DeepLinkConfig;
use crate::identity::{EmailPolicy, IdentityError};
use crate::matching::{MatchingConfig, MatchingEngine};
use crate::profile::UserProfile;
use crate::store::{MatchStore, StoreError};
use crate::timezone::MatchDayClock;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("profile is incomplete for user {0}")]
    ProfileIncomplete(Uuid),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Tunables shared by every operation.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub matching: MatchingConfig,
    pub clock: MatchDayClock,
    pub email_policy: EmailPolicy,
    pub deep_links: DeepLinkConfig,
}

impl ServiceConfig {
    /// `BS_MATCH_DAY_UTC_OFFSET_MINUTES` plus the per-component variables.
    pub fn from_env() -> Self {
        let clock = std::env::var("BS_MATCH_DAY_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .map(MatchDayClock::from_offset_minutes)
            .unwrap_or_default();
        Self {
            matching: MatchingConfig::from_env(),
            clock,
            email_policy: EmailPolicy::from_env(),
            deep_links: DeepLinkConfig::from_env(),
        }
    }
}

pub struct MatchService {
    store: Arc<dyn MatchStore>,
    engine: MatchingEngine,
    clock: MatchDayClock,
    email_policy: EmailPolicy,
    deep_links: DeepLinkConfig,
}

impl MatchService {
    pub fn new(store: Arc<dyn MatchStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            engine: MatchingEngine::new(config.matching),
            clock: config.clock,
            email_policy: config.email_policy,
            deep_links: config.deep_links,
        }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    pub fn email_policy(&self) -> &EmailPolicy {
        &self.email_policy
    }

    pub fn clock(&self) -> &MatchDayClock {
        &self.clock
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn require_profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))
    }

    /// Gate for user-scoped operations: the profile must exist and be complete.
    pub async fn require_complete_profile(
        &self,
        user_id: Uuid,
    ) -> Result<UserProfile, ServiceError> {
        let profile = self.require_profile(user_id).await?;
        if !profile.profile_completed {
            return Err(ServiceError::ProfileIncomplete(user_id));
        }
        Ok(profile)
    }

    /// Everyone the user already has an edge with (any status, either
    /// direction) or has given feedback on.
    async fn seen_user_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, ServiceError> {
        let mut seen: HashSet<Uuid> = self
            .store
            .list_connections(user_id)
            .await?
            .iter()
            .map(|c| c.other_user(user_id))
            .collect();
        seen.extend(
            self.store
                .list_feedback_by_user(user_id)
                .await?
                .into_iter()
                .map(|f| f.target_user_id),
        );
        Ok(seen)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::profile::fixtures::profile;
    use crate::store::MemoryStore;

    pub fn service() -> (MatchService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = MatchService::new(store.clone(), ServiceConfig::default());
        (service, store)
    }

    pub async fn seeded(store: &MemoryStore, name: &str) -> UserProfile {
        let user = profile(name);
        store
            .insert_profile(&user)
            .await
            .expect("seed profile");
        user
    }
}
