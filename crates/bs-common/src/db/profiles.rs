use deadpool_postgres::GenericClient;
use tokio_postgres::{types::Json, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::db::util::timed;
use crate::db::{map_unique_violation, parse_column, parse_optional_column};
use crate::profile::{PersonalityTraits, Preferences, UserProfile, Verification};
use crate::store::StoreError;

const PROFILE_COLUMNS: &str = "id, email, display_name, username, campus, branch, year, age,
    gender, bio, interests, personality, food_preference, smoking, drinking, preferences,
    email_verified, photo_verified, student_id_verified, verified, is_active,
    profile_completed, response_rate, last_seen, created_at, updated_at";

fn profile_from_row(row: &Row) -> Result<UserProfile, StoreError> {
    let campus: String = row.get("campus");
    let personality: Json<PersonalityTraits> = row.get("personality");
    let preferences: Json<Preferences> = row.get("preferences");

    Ok(UserProfile {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        username: row.get("username"),
        campus: parse_column(&campus, "users.campus")?,
        branch: row.get("branch"),
        year: row.get("year"),
        age: row.get("age"),
        gender: parse_optional_column(row.get("gender"), "users.gender")?,
        bio: row.get("bio"),
        interests: row.get("interests"),
        personality: personality.0,
        food_preference: parse_optional_column(
            row.get("food_preference"),
            "users.food_preference",
        )?,
        smoking: parse_optional_column(row.get("smoking"), "users.smoking")?,
        drinking: parse_optional_column(row.get("drinking"), "users.drinking")?,
        preferences: preferences.0,
        verification: Verification {
            email: row.get("email_verified"),
            photo: row.get("photo_verified"),
            student_id: row.get("student_id_verified"),
        },
        verified: row.get("verified"),
        is_active: row.get("is_active"),
        profile_completed: row.get("profile_completed"),
        response_rate: row.get("response_rate"),
        last_seen: row.get("last_seen"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[instrument(skip(client))]
pub async fn get_profile(
    client: &impl GenericClient,
    id: Uuid,
) -> Result<Option<UserProfile>, StoreError> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM bitspark.users WHERE id = $1");
    let row = timed("profiles.get", client.query_opt(sql.as_str(), &[&id])).await?;
    row.as_ref().map(profile_from_row).transpose()
}

#[instrument(skip(client, emails), fields(count = emails.len()))]
pub async fn find_by_emails(
    client: &impl GenericClient,
    emails: &[String],
) -> Result<Vec<UserProfile>, StoreError> {
    if emails.is_empty() {
        return Ok(Vec::new());
    }
    let lowered: Vec<String> = emails.iter().map(|e| e.trim().to_lowercase()).collect();
    let sql = format!(
        "SELECT {PROFILE_COLUMNS} FROM bitspark.users WHERE LOWER(email) = ANY($1)"
    );
    let rows = timed("profiles.find_by_emails", client.query(sql.as_str(), &[&lowered])).await?;
    rows.iter().map(profile_from_row).collect()
}

#[instrument(skip(client, profile), fields(user_id = %profile.id))]
pub async fn insert_profile(
    client: &impl GenericClient,
    profile: &UserProfile,
) -> Result<(), StoreError> {
    let sql = format!(
        "INSERT INTO bitspark.users ({PROFILE_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                 $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)"
    );
    let personality = Json(&profile.personality);
    let preferences = Json(&profile.preferences);
    let gender = profile.gender.map(|g| g.as_str());
    let food = profile.food_preference.map(|f| f.as_str());
    let smoking = profile.smoking.map(|s| s.as_str());
    let drinking = profile.drinking.map(|d| d.as_str());

    timed(
        "profiles.insert",
        client.execute(
            sql.as_str(),
            &[
                &profile.id,
                &profile.email,
                &profile.display_name,
                &profile.username,
                &profile.campus.as_str(),
                &profile.branch,
                &profile.year,
                &profile.age,
                &gender,
                &profile.bio,
                &profile.interests,
                &personality,
                &food,
                &smoking,
                &drinking,
                &preferences,
                &profile.verification.email,
                &profile.verification.photo,
                &profile.verification.student_id,
                &profile.verified,
                &profile.is_active,
                &profile.profile_completed,
                &profile.response_rate,
                &profile.last_seen,
                &profile.created_at,
                &profile.updated_at,
            ],
        ),
    )
    .await
    .map_err(|err| map_unique_violation(err, "profile"))?;
    Ok(())
}

#[instrument(skip(client, profile), fields(user_id = %profile.id))]
pub async fn update_profile(
    client: &impl GenericClient,
    profile: &UserProfile,
) -> Result<bool, StoreError> {
    let personality = Json(&profile.personality);
    let preferences = Json(&profile.preferences);
    let gender = profile.gender.map(|g| g.as_str());
    let food = profile.food_preference.map(|f| f.as_str());
    let smoking = profile.smoking.map(|s| s.as_str());
    let drinking = profile.drinking.map(|d| d.as_str());

    let updated = timed(
        "profiles.update",
        client.execute(
            "UPDATE bitspark.users SET
                display_name = $2, username = $3, campus = $4, branch = $5, year = $6,
                age = $7, gender = $8, bio = $9, interests = $10, personality = $11,
                food_preference = $12, smoking = $13, drinking = $14, preferences = $15,
                email_verified = $16, photo_verified = $17, student_id_verified = $18,
                verified = $19, is_active = $20, profile_completed = $21,
                response_rate = $22, last_seen = $23, updated_at = $24
             WHERE id = $1",
            &[
                &profile.id,
                &profile.display_name,
                &profile.username,
                &profile.campus.as_str(),
                &profile.branch,
                &profile.year,
                &profile.age,
                &gender,
                &profile.bio,
                &profile.interests,
                &personality,
                &food,
                &smoking,
                &drinking,
                &preferences,
                &profile.verification.email,
                &profile.verification.photo,
                &profile.verification.student_id,
                &profile.verified,
                &profile.is_active,
                &profile.profile_completed,
                &profile.response_rate,
                &profile.last_seen,
                &profile.updated_at,
            ],
        ),
    )
    .await?;
    Ok(updated > 0)
}

#[instrument(skip(client))]
pub async fn list_candidates(
    client: &impl GenericClient,
    requester: Uuid,
) -> Result<Vec<UserProfile>, StoreError> {
    let sql = format!(
        "SELECT {PROFILE_COLUMNS} FROM bitspark.users
         WHERE is_active AND profile_completed AND id <> $1"
    );
    let rows = timed("profiles.list_candidates", client.query(sql.as_str(), &[&requester])).await?;
    rows.iter().map(profile_from_row).collect()
}
