use tracing::{info, instrument};
use uuid::Uuid;

use super::{MatchService, ServiceError};
use crate::api::profile_request::{CreateProfileRequest, ProfilePatch};
use crate::identity::{
    campus_from_email, decide_callback, email_local_part, generate_username, CallbackIdentity,
    CallbackOutcome,
};
use crate::profile::{
    normalize_interests, PersonalityTraits, Preferences, UserProfile, Verification,
};
use crate::store::StoreError;

pub const DEFAULT_BRANCH: &str = "Computer Science";
pub const MIN_AGE: i32 = 16;
pub const MAX_AGE: i32 = 100;
pub const MAX_YEAR: i32 = 5;

impl MatchService {
    /// First sign-in: builds the profile from the identity and optional onboarding
    /// fields. Only institutional addresses are accepted.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_profile(
        &self,
        user_id: Uuid,
        request: &CreateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        let email = request.email.trim().to_lowercase();
        self.email_policy.validate(&email)?;

        let display_name = request
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email_local_part(&email))
            .to_string();
        let username = generate_username(&display_name, &mut rand::thread_rng());
        let now = self.now();

        let mut profile = UserProfile {
            id: user_id,
            campus: campus_from_email(&email),
            email,
            display_name,
            username,
            branch: DEFAULT_BRANCH.to_string(),
            year: 1,
            age: None,
            gender: None,
            bio: None,
            interests: Vec::new(),
            personality: PersonalityTraits::default(),
            food_preference: None,
            smoking: None,
            drinking: None,
            preferences: Preferences::default(),
            verification: Verification {
                email: true,
                photo: false,
                student_id: false,
            },
            verified: true,
            is_active: true,
            profile_completed: false,
            response_rate: None,
            last_seen: Some(now),
            created_at: now,
            updated_at: now,
        };
        apply_patch(&mut profile, &request.profile)?;
        profile.profile_completed = profile.is_profile_complete();

        match self.store.insert_profile(&profile).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(ServiceError::Conflict("profile already exists".into()));
            }
            Err(err) => return Err(err.into()),
        }
        info!(campus = profile.campus.as_str(), completed = profile.profile_completed, "profile_created");
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        self.require_profile(user_id).await
    }

    #[instrument(skip(self, patch), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<UserProfile, ServiceError> {
        let mut profile = self.require_profile(user_id).await?;
        apply_patch(&mut profile, patch)?;
        profile.profile_completed = profile.is_profile_complete();
        profile.updated_at = self.now();
        profile.last_seen = Some(profile.updated_at);

        if !self.store.update_profile(&profile).await? {
            return Err(ServiceError::UserNotFound(user_id));
        }
        Ok(profile)
    }

    /// Where the sign-in callback sends the browser.
    pub async fn resolve_callback(
        &self,
        identity: &CallbackIdentity,
    ) -> Result<CallbackOutcome, ServiceError> {
        let profile = match identity {
            CallbackIdentity::Authenticated { user_id, email }
                if self.email_policy.is_allowed(email) =>
            {
                self.store.get_profile(*user_id).await?
            }
            _ => None,
        };
        Ok(decide_callback(identity, &self.email_policy, profile.as_ref()))
    }
}

fn invalid(message: &str) -> ServiceError {
    ServiceError::Invalid(message.to_string())
}

fn unit_interval(value: Option<f64>) -> bool {
    value.map_or(true, |v| (0.0..=1.0).contains(&v))
}

/// Validates and applies `patch`. Nothing is written when validation fails.
pub(crate) fn apply_patch(profile: &mut UserProfile, patch: &ProfilePatch) -> Result<(), ServiceError> {
    if let Some(name) = &patch.display_name {
        if name.trim().is_empty() {
            return Err(invalid("display_name must not be empty"));
        }
    }
    if let Some(year) = patch.year {
        if !(1..=MAX_YEAR).contains(&year) {
            return Err(invalid("year must be between 1 and 5"));
        }
    }
    if let Some(age) = patch.age {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(invalid("age must be between 16 and 100"));
        }
    }
    if let Some(preferences) = &patch.preferences {
        if !preferences.age_range.is_valid() {
            return Err(invalid("age_range minimum must be below its maximum"));
        }
    }
    if let Some(traits) = &patch.personality {
        let in_range = [
            traits.openness,
            traits.conscientiousness,
            traits.extraversion,
            traits.agreeableness,
            traits.neuroticism,
        ]
        .into_iter()
        .all(unit_interval);
        if !in_range {
            return Err(invalid("personality traits must lie in [0, 1]"));
        }
    }

    if let Some(name) = &patch.display_name {
        profile.display_name = name.trim().to_string();
    }
    if let Some(bio) = &patch.bio {
        let bio = bio.trim();
        profile.bio = (!bio.is_empty()).then(|| bio.to_string());
    }
    if let Some(branch) = &patch.branch {
        profile.branch = branch.trim().to_string();
    }
    if let Some(year) = patch.year {
        profile.year = year;
    }
    if let Some(age) = patch.age {
        profile.age = Some(age);
    }
    if let Some(gender) = patch.gender {
        profile.gender = Some(gender);
    }
    if let Some(interests) = &patch.interests {
        profile.interests = normalize_interests(interests);
    }
    if let Some(traits) = &patch.personality {
        profile.personality = traits.clone();
    }
    if let Some(food) = patch.food_preference {
        profile.food_preference = Some(food);
    }
    if let Some(smoking) = patch.smoking {
        profile.smoking = Some(smoking);
    }
    if let Some(drinking) = patch.drinking {
        profile.drinking = Some(drinking);
    }
    if let Some(preferences) = &patch.preferences {
        profile.preferences = preferences.clone();
    }
    if let Some(active) = patch.is_active {
        profile.is_active = active;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seeded, service};
    use super::*;
    use crate::profile::{AgeRange, Campus, Gender};

    fn identity(email: &str) -> CreateProfileRequest {
        CreateProfileRequest {
            email: email.to_string(),
            full_name: Some("Asha Verma".into()),
            email_verified: true,
            profile: ProfilePatch::default(),
        }
    }

    #[tokio::test]
    async fn creates_incomplete_profile_with_defaults() {
        let (service, _) = service();
        let id = Uuid::new_v4();
        let profile = service
            .create_profile(id, &identity("F2021@Goa.bits-pilani.ac.in"))
            .await
            .unwrap();

        assert_eq!(profile.email, "f2021@goa.bits-pilani.ac.in");
        assert_eq!(profile.campus, Campus::Goa);
        assert_eq!(profile.year, 1);
        assert!(profile.username.starts_with("ashaverma"));
        assert!(!profile.profile_completed);
        assert_eq!(profile.preferences.age_range, AgeRange(18, 30));
    }

    #[tokio::test]
    async fn rejects_non_institutional_email() {
        let (service, _) = service();
        let err = service
            .create_profile(Uuid::new_v4(), &identity("asha@gmail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Identity(_)));
    }

    #[tokio::test]
    async fn duplicate_profile_is_a_conflict() {
        let (service, _) = service();
        let id = Uuid::new_v4();
        let request = identity("asha@pilani.bits-pilani.ac.in");
        service.create_profile(id, &request).await.unwrap();
        let err = service.create_profile(id, &request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn completing_the_patch_marks_profile_complete() {
        let (service, _) = service();
        let id = Uuid::new_v4();
        service
            .create_profile(id, &identity("asha@pilani.bits-pilani.ac.in"))
            .await
            .unwrap();

        let patch = ProfilePatch {
            bio: Some("Robotics club and chai.".into()),
            age: Some(20),
            gender: Some(Gender::Female),
            interests: Some(vec![" Robotics ".into(), "robotics".into(), "Chess".into()]),
            ..ProfilePatch::default()
        };
        let updated = service.update_profile(id, &patch).await.unwrap();
        assert!(updated.profile_completed);
        assert_eq!(updated.interests, vec!["robotics".to_string(), "chess".to_string()]);
    }

    #[tokio::test]
    async fn invalid_patch_leaves_profile_untouched() {
        let (service, store) = service();
        let user = seeded(&store, "Asha").await;
        let patch = ProfilePatch {
            bio: Some("changed".into()),
            preferences: Some(Preferences {
                age_range: AgeRange(25, 20),
                ..Preferences::default()
            }),
            ..ProfilePatch::default()
        };
        let err = service.update_profile(user.id, &patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert_eq!(service.get_profile(user.id).await.unwrap().bio, user.bio);
    }

    #[tokio::test]
    async fn callback_routes_by_profile_state() {
        let (service, store) = service();
        let complete = seeded(&store, "Asha").await;

        let outcome = service
            .resolve_callback(&CallbackIdentity::Authenticated {
                user_id: complete.id,
                email: complete.email.clone(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Dashboard);

        let outcome = service
            .resolve_callback(&CallbackIdentity::Authenticated {
                user_id: Uuid::new_v4(),
                email: "new@hyderabad.bits-pilani.ac.in".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Onboarding);

        let outcome = service
            .resolve_callback(&CallbackIdentity::Authenticated {
                user_id: Uuid::new_v4(),
                email: "someone@gmail.com".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::InvalidEmail);
        assert!(outcome.clears_session());
    }
}
