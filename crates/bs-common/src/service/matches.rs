use tracing::{debug, instrument};
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::connection::ConnectionType;
use crate::api::match_request::MatchRequest;
use crate::api::match_response::{MatchItem, MatchResponse};
use crate::matching::pipeline::DEFAULT_LIMIT;
use crate::matching::RankingCriteria;

impl MatchService {
    /// Swipe deck for friend or dating mode.
    ///
    /// Anyone the requester already has a connection with, or has given
    /// feedback on, is left out.
    #[instrument(skip(self, request), fields(user_id = %user_id, connection_type = request.connection_type.as_str()))]
    pub async fn get_matches(
        &self,
        user_id: Uuid,
        request: &MatchRequest,
    ) -> Result<MatchResponse, ServiceError> {
        let user = self.require_complete_profile(user_id).await?;
        let similarity = request.similarity.unwrap_or(match request.connection_type {
            ConnectionType::Friend => user.preferences.connect_similarity,
            ConnectionType::Date => user.preferences.dating_similarity,
        });

        let exclusions = self.seen_user_ids(user_id).await?;
        let candidates = self.store.list_candidate_profiles(user_id).await?;

        let criteria = RankingCriteria::new(request.connection_type.into(), similarity)
            .with_limit(request.max_results.unwrap_or(DEFAULT_LIMIT))
            .with_offset(request.offset.unwrap_or(0));
        let outcome = self
            .engine
            .rank(&user, &candidates, &exclusions, &criteria, self.now());

        debug!(
            pool = candidates.len(),
            excluded = exclusions.len(),
            eligible = outcome.total_candidates,
            "ranked_matches"
        );

        Ok(MatchResponse {
            user_id,
            connection_type: request.connection_type,
            similarity,
            total_candidates: outcome.total_candidates,
            matches: outcome
                .ranked
                .into_iter()
                .map(|ranked| MatchItem {
                    user: ranked.profile.summary(),
                    compatibility_score: ranked.score.total,
                    match_reasons: ranked.score.reasons,
                })
                .collect(),
        })
    }
}
