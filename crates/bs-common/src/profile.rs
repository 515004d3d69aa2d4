use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
pub enum Campus {
    Pilani,
    Goa,
    Hyderabad,
    Dubai,
}

impl Campus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenderPreference {
    Male,
    Female,
    #[default]
    Any,
}

impl GenderPreference {
    pub fn accepts(&self, gender: Option<Gender>) -> bool {
        match (self, gender) {
            (GenderPreference::Any, _) => true,
            (GenderPreference::Male, Some(Gender::Male)) => true,
            (GenderPreference::Female, Some(Gender::Female)) => true,
            _ => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FoodPreference {
    Vegetarian,
    NonVegetarian,
    Vegan,
    Jain,
    Eggetarian,
}

impl FoodPreference {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Smoking {
    Never,
    Socially,
    Regularly,
    TryingToQuit,
}

impl Smoking {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Drinking {
    Never,
    Occasionally,
    Socially,
    Regularly,
}

impl Drinking {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// `+1` favours the closest attribute match, `-1` the most divergent one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Similarity {
    #[default]
    Similar,
    Opposite,
}

impl TryFrom<i8> for Similarity {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Similarity::Similar),
            -1 => Ok(Similarity::Opposite),
            other => Err(format!("similarity must be 1 or -1, got {other}")),
        }
    }
}

impl From<Similarity> for i8 {
    fn from(value: Similarity) -> Self {
        match value {
            Similarity::Similar => 1,
            Similarity::Opposite => -1,
        }
    }
}

/// Inclusive `[min, max]` age window, serialised as a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange(pub i32, pub i32);

impl Default for AgeRange {
    fn default() -> Self {
        AgeRange(18, 30)
    }
}

impl AgeRange {
    pub fn contains(&self, age: i32) -> bool {
        age >= self.0 && age <= self.1
    }

    pub fn is_valid(&self) -> bool {
        self.0 < self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dealbreakers {
    #[serde(default)]
    pub no_smoking: bool,
    #[serde(default)]
    pub food_preference: Option<FoodPreference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub connect_similarity: Similarity,
    #[serde(default)]
    pub dating_similarity: Similarity,
    #[serde(default)]
    pub gender_preference: GenderPreference,
    #[serde(default)]
    pub age_range: AgeRange,
    #[serde(default)]
    pub dealbreakers: Dealbreakers,
}

/// Big-Five traits, each in `[0, 1]` when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub openness: Option<f64>,
    pub conscientiousness: Option<f64>,
    pub extraversion: Option<f64>,
    pub agreeableness: Option<f64>,
    pub neuroticism: Option<f64>,
}

impl PersonalityTraits {
    pub fn is_empty(&self) -> bool {
        self.openness.is_none()
            && self.conscientiousness.is_none()
            && self.extraversion.is_none()
            && self.agreeableness.is_none()
            && self.neuroticism.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub photo: bool,
    #[serde(default)]
    pub student_id: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub username: String,
    pub campus: Campus,
    pub branch: String,
    pub year: i32,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    #[serde(default)]
    pub personality: PersonalityTraits,
    pub food_preference: Option<FoodPreference>,
    pub smoking: Option<Smoking>,
    pub drinking: Option<Drinking>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub verification: Verification,
    pub verified: bool,
    pub is_active: bool,
    pub profile_completed: bool,
    pub response_rate: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Display name, bio, interests, year, branch, age and gender must all be filled in.
    pub fn is_profile_complete(&self) -> bool {
        !self.display_name.trim().is_empty()
            && self.bio.as_deref().is_some_and(|bio| !bio.trim().is_empty())
            && !self.interests.is_empty()
            && self.year > 0
            && !self.branch.trim().is_empty()
            && self.age.is_some()
            && self.gender.is_some()
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary::from(self)
    }
}

/// Public projection of a profile returned next to scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub display_name: String,
    pub username: String,
    pub campus: Campus,
    pub branch: String,
    pub year: i32,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub verified: bool,
}

impl From<&UserProfile> for ProfileSummary {
    fn from(value: &UserProfile) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name.clone(),
            username: value.username.clone(),
            campus: value.campus,
            branch: value.branch.clone(),
            year: value.year,
            age: value.age,
            gender: value.gender,
            bio: value.bio.clone(),
            interests: value.interests.clone(),
            verified: value.verified,
        }
    }
}

/// Lower-case, trim and de-duplicate interest tags, keeping first-seen order.
pub fn normalize_interests<I, S>(interests: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    interests
        .into_iter()
        .map(|interest| interest.as_ref().trim().to_lowercase())
        .filter(|interest| !interest.is_empty())
        .filter(|interest| seen.insert(interest.clone()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_uses_signed_wire_format() {
        let json = serde_json::to_string(&Similarity::Opposite).unwrap();
        assert_eq!(json, "-1");

        let parsed: Similarity = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Similarity::Similar);
        assert!(serde_json::from_str::<Similarity>("0").is_err());
    }

    #[test]
    fn age_range_serialises_as_pair() {
        let prefs = Preferences::default();
        let value = serde_json::to_value(&prefs).unwrap();
        assert_eq!(value["age_range"], serde_json::json!([18, 30]));
        assert!(prefs.age_range.contains(18));
        assert!(!prefs.age_range.contains(31));
    }

    #[test]
    fn profile_completion_requires_core_fields() {
        let mut profile = fixtures::profile("Asha");
        assert!(profile.is_profile_complete());

        profile.bio = Some("   ".into());
        assert!(!profile.is_profile_complete());

        profile.bio = Some("hello".into());
        profile.gender = None;
        assert!(!profile.is_profile_complete());
    }

    #[test]
    fn normalizes_interest_tags() {
        let tags = normalize_interests([" Coding", "coding", "", "Music "]);
        assert_eq!(tags, vec!["coding".to_string(), "music".to_string()]);
    }

    #[test]
    fn gender_preference_accepts_matching_gender() {
        assert!(GenderPreference::Any.accepts(None));
        assert!(GenderPreference::Female.accepts(Some(Gender::Female)));
        assert!(!GenderPreference::Female.accepts(Some(Gender::Male)));
        assert!(!GenderPreference::Male.accepts(None));
    }
}
