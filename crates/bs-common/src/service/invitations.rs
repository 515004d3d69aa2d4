use std::collections::HashMap;

use tracing::instrument;
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::ConnectionStatus;
use crate::deep_links::{DeepLink, Platform};

impl MatchService {
    pub fn deep_link(&self, platform: Platform, handle: Option<&str>, message: Option<&str>) -> DeepLink {
        self.deep_links.link(platform, handle, message)
    }

    /// Moves an accepted connection to an outside messenger and counts the
    /// redirect.
    #[instrument(skip(self, handle, message))]
    pub async fn create_platform_invitation(
        &self,
        user_id: Uuid,
        connection_id: Uuid,
        platform: Platform,
        handle: Option<&str>,
        message: Option<&str>,
    ) -> Result<DeepLink, ServiceError> {
        self.require_complete_profile(user_id).await?;
        let connection = self
            .store
            .get_connection(connection_id)
            .await?
            .ok_or(ServiceError::NotFound("connection"))?;
        if !connection.involves(user_id) {
            return Err(ServiceError::Forbidden("connection belongs to other users"));
        }
        if connection.status != ConnectionStatus::Accepted {
            return Err(ServiceError::Conflict(
                "only accepted connections can be invited".into(),
            ));
        }

        self.store
            .record_redirection(connection_id, platform, self.now())
            .await?;
        Ok(self.deep_links.link(platform, handle, message))
    }

    pub async fn platform_stats(&self, user_id: Uuid) -> Result<HashMap<Platform, i64>, ServiceError> {
        self.require_complete_profile(user_id).await?;
        Ok(self.store.platform_stats(user_id).await?)
    }
}
