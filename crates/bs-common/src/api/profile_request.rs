use serde::Deserialize;

use crate::profile::{
    Drinking, FoodPreference, Gender, PersonalityTraits, Preferences, Smoking,
};

/// Identity handed over by the auth provider after sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileRequest {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub profile: ProfilePatch,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub branch: Option<String>,
    pub year: Option<i32>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub interests: Option<Vec<String>>,
    pub personality: Option<PersonalityTraits>,
    pub food_preference: Option<FoodPreference>,
    pub smoking: Option<Smoking>,
    pub drinking: Option<Drinking>,
    pub preferences: Option<Preferences>,
    pub is_active: Option<bool>,
}
