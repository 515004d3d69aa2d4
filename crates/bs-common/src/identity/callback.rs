use uuid::Uuid;

use super::EmailPolicy;
use crate::profile::UserProfile;

/// What the sign-in callback learned from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackIdentity {
    ProviderError,
    Anonymous,
    Authenticated { user_id: Uuid, email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    AuthFailed,
    InvalidEmail,
    Onboarding,
    Dashboard,
    SignIn,
}

impl CallbackOutcome {
    /// Path relative to the application origin.
    pub fn path(&self) -> &'static str {
        match self {
            CallbackOutcome::AuthFailed => "/auth?error=auth-failed",
            CallbackOutcome::InvalidEmail => "/auth?error=invalid-email",
            CallbackOutcome::Onboarding => "/onboarding",
            CallbackOutcome::Dashboard => "/dashboard",
            CallbackOutcome::SignIn => "/auth",
        }
    }

    pub fn clears_session(&self) -> bool {
        matches!(self, CallbackOutcome::InvalidEmail)
    }
}

pub fn decide_callback(
    identity: &CallbackIdentity,
    policy: &EmailPolicy,
    profile: Option<&UserProfile>,
) -> CallbackOutcome {
    match identity {
        CallbackIdentity::ProviderError => CallbackOutcome::AuthFailed,
        CallbackIdentity::Anonymous => CallbackOutcome::SignIn,
        CallbackIdentity::Authenticated { email, .. } => {
            if !policy.is_allowed(email) {
                return CallbackOutcome::InvalidEmail;
            }
            match profile {
                Some(profile) if profile.profile_completed => CallbackOutcome::Dashboard,
                _ => CallbackOutcome::Onboarding,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::fixtures::profile;

    fn authenticated(email: &str) -> CallbackIdentity {
        CallbackIdentity::Authenticated {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
        }
    }

    #[test]
    fn rejects_non_institutional_email_and_clears_session() {
        let outcome = decide_callback(
            &authenticated("someone@gmail.com"),
            &EmailPolicy::default(),
            None,
        );
        assert_eq!(outcome, CallbackOutcome::InvalidEmail);
        assert!(outcome.clears_session());
        assert_eq!(outcome.path(), "/auth?error=invalid-email");
    }

    #[test]
    fn routes_by_profile_state() {
        let policy = EmailPolicy::default();
        let identity = authenticated("a@hyderabad.bits-pilani.ac.in");
        assert_eq!(
            decide_callback(&identity, &policy, None),
            CallbackOutcome::Onboarding
        );

        let mut existing = profile("A");
        existing.profile_completed = false;
        assert_eq!(
            decide_callback(&identity, &policy, Some(&existing)),
            CallbackOutcome::Onboarding
        );

        existing.profile_completed = true;
        assert_eq!(
            decide_callback(&identity, &policy, Some(&existing)),
            CallbackOutcome::Dashboard
        );
    }

    #[test]
    fn provider_error_and_missing_identity() {
        let policy = EmailPolicy::default();
        assert_eq!(
            decide_callback(&CallbackIdentity::ProviderError, &policy, None),
            CallbackOutcome::AuthFailed
        );
        assert_eq!(
            decide_callback(&CallbackIdentity::Anonymous, &policy, None).path(),
            "/auth"
        );
    }
}
