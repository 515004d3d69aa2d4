pub mod callback;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::profile::Campus;

pub use callback::{decide_callback, CallbackIdentity, CallbackOutcome};

pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "pilani.bits-pilani.ac.in",
    "goa.bits-pilani.ac.in",
    "hyderabad.bits-pilani.ac.in",
    "dubai.bits-pilani.ac.in",
];

static LOCAL_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+$").expect("local-part regex compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("please use your institutional email address")]
    InvalidEmail,
}

/// Institutional e-mail allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPolicy {
    domains: Vec<String>,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAINS.iter().copied())
    }
}

impl EmailPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Comma separated list from `BS_ALLOWED_EMAIL_DOMAINS`, default list otherwise.
    pub fn from_env() -> Self {
        match std::env::var("BS_ALLOWED_EMAIL_DOMAINS") {
            Ok(raw) if !raw.trim().is_empty() => Self::new(raw.split(',')),
            _ => Self::default(),
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        let Some((local, domain)) = email.trim().rsplit_once('@') else {
            return false;
        };
        LOCAL_PART.is_match(local)
            && self
                .domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(domain))
    }

    pub fn validate(&self, email: &str) -> Result<(), IdentityError> {
        if self.is_allowed(email) {
            Ok(())
        } else {
            Err(IdentityError::InvalidEmail)
        }
    }
}

/// Campus from the e-mail domain; unknown domains map to Pilani.
pub fn campus_from_email(email: &str) -> Campus {
    let domain = email
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .unwrap_or_default();

    if domain.starts_with("goa.") {
        Campus::Goa
    } else if domain.starts_with("hyderabad.") {
        Campus::Hyderabad
    } else if domain.starts_with("dubai.") {
        Campus::Dubai
    } else {
        Campus::Pilani
    }
}

/// Up to ten lowercase alphanumerics of `base` followed by a number below 1000.
pub fn generate_username<R: Rng + ?Sized>(base: &str, rng: &mut R) -> String {
    let stem: String = base
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(10)
        .collect();
    format!("{stem}{}", rng.gen_range(0..1000))
}

/// Local part of an e-mail address, used as a display name fallback.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn accepts_institutional_domains_only() {
        let policy = EmailPolicy::default();
        assert!(policy.is_allowed("f20210001@pilani.bits-pilani.ac.in"));
        assert!(policy.is_allowed("a.b+c@goa.bits-pilani.ac.in"));
        assert!(!policy.is_allowed("someone@gmail.com"));
        assert!(!policy.is_allowed("bad name@pilani.bits-pilani.ac.in"));
        assert!(!policy.is_allowed("x@evil.pilani.bits-pilani.ac.in"));
        assert!(!policy.is_allowed("no-at-sign"));
        assert_eq!(
            policy.validate("x@example.com"),
            Err(IdentityError::InvalidEmail)
        );
    }

    #[test]
    fn custom_domain_list() {
        let policy = EmailPolicy::new([" Example.edu ", ""]);
        assert_eq!(policy.domains(), ["example.edu".to_string()]);
        assert!(policy.is_allowed("me@example.edu"));
        assert!(!policy.is_allowed("me@pilani.bits-pilani.ac.in"));
    }

    #[test]
    fn campus_follows_domain() {
        assert_eq!(campus_from_email("a@goa.bits-pilani.ac.in"), Campus::Goa);
        assert_eq!(campus_from_email("a@Dubai.bits-pilani.ac.in"), Campus::Dubai);
        assert_eq!(campus_from_email("a@pilani.bits-pilani.ac.in"), Campus::Pilani);
    }

    #[test]
    fn username_is_trimmed_alphanumeric_with_suffix() {
        let mut rng = StdRng::seed_from_u64(3);
        let name = generate_username("Priya Sharma-Verma!", &mut rng);
        assert!(name.starts_with("priyasharm"));
        let suffix: u32 = name["priyasharm".len()..].parse().unwrap();
        assert!(suffix < 1000);
    }
}
