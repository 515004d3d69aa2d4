use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "users, connections and daily matches",
        sql: r#"
CREATE TABLE IF NOT EXISTS bitspark.users (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL,
    display_name TEXT NOT NULL,
    username TEXT NOT NULL,
    campus TEXT NOT NULL CHECK (campus IN ('Pilani', 'Goa', 'Hyderabad', 'Dubai')),
    branch TEXT NOT NULL DEFAULT '',
    year INTEGER NOT NULL CHECK (year BETWEEN 1 AND 5),
    age INTEGER CHECK (age IS NULL OR age BETWEEN 16 AND 100),
    gender TEXT CHECK (gender IS NULL OR gender IN ('male', 'female', 'other')),
    bio TEXT,
    interests TEXT[] NOT NULL DEFAULT '{}',
    personality JSONB NOT NULL DEFAULT '{}'::jsonb,
    food_preference TEXT,
    smoking TEXT,
    drinking TEXT,
    preferences JSONB NOT NULL DEFAULT '{}'::jsonb,
    email_verified BOOLEAN NOT NULL DEFAULT FALSE,
    photo_verified BOOLEAN NOT NULL DEFAULT FALSE,
    student_id_verified BOOLEAN NOT NULL DEFAULT FALSE,
    verified BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    profile_completed BOOLEAN NOT NULL DEFAULT FALSE,
    response_rate DOUBLE PRECISION CHECK (response_rate IS NULL OR response_rate BETWEEN 0 AND 1),
    last_seen TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_lower ON bitspark.users (LOWER(email));
CREATE INDEX IF NOT EXISTS idx_users_candidates
    ON bitspark.users (id)
    WHERE is_active AND profile_completed;

CREATE TABLE IF NOT EXISTS bitspark.connections (
    id UUID PRIMARY KEY,
    user1_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    user2_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    connection_type TEXT NOT NULL CHECK (connection_type IN ('friend', 'date')),
    compatibility_score DOUBLE PRECISION NOT NULL
        CHECK (compatibility_score BETWEEN 0 AND 1),
    status TEXT NOT NULL
        CHECK (status IN ('pending', 'accepted', 'declined', 'blocked')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    responded_at TIMESTAMPTZ,
    CONSTRAINT uq_connections_pair UNIQUE (user1_id, user2_id, connection_type),
    CONSTRAINT chk_connections_distinct CHECK (user1_id <> user2_id)
);

CREATE INDEX IF NOT EXISTS idx_connections_user2 ON bitspark.connections (user2_id);

CREATE TABLE IF NOT EXISTS bitspark.daily_matches (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    matched_user_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    match_date DATE NOT NULL,
    compatibility_score DOUBLE PRECISION NOT NULL
        CHECK (compatibility_score BETWEEN 0 AND 1),
    algorithm_version TEXT NOT NULL,
    viewed BOOLEAN NOT NULL DEFAULT FALSE,
    action TEXT CHECK (action IS NULL OR action IN ('connect', 'pass', 'super_like')),
    acted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_daily_matches_user_date UNIQUE (user_id, match_date)
);
"#,
    },
    Migration {
        id: 2,
        description: "feedback, ships, notifications and platform redirections",
        sql: r#"
CREATE TABLE IF NOT EXISTS bitspark.user_feedback (
    user_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    target_user_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    action TEXT NOT NULL
        CHECK (action IN ('like', 'pass', 'super_like', 'block', 'report')),
    context JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, target_user_id)
);

CREATE TABLE IF NOT EXISTS bitspark.ships (
    id UUID PRIMARY KEY,
    shipper_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    user1_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    user2_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    message TEXT NOT NULL DEFAULT '',
    is_anonymous BOOLEAN NOT NULL DEFAULT FALSE,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'accepted', 'declined')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    responded_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_ships_shipper_pair ON bitspark.ships (
    shipper_id, LEAST(user1_id, user2_id), GREATEST(user1_id, user2_id)
);

CREATE TABLE IF NOT EXISTS bitspark.notifications (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES bitspark.users(id) ON DELETE CASCADE,
    kind TEXT NOT NULL
        CHECK (kind IN ('daily_match', 'connection_request', 'match', 'ship')),
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    data JSONB NOT NULL DEFAULT '{}'::jsonb,
    read BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_created
    ON bitspark.notifications (user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS bitspark.platform_redirections (
    id UUID PRIMARY KEY,
    connection_id UUID NOT NULL REFERENCES bitspark.connections(id) ON DELETE CASCADE,
    platform TEXT NOT NULL CHECK (platform IN ('whatsapp', 'instagram', 'telegram')),
    redirect_count BIGINT NOT NULL DEFAULT 1 CHECK (redirect_count > 0),
    last_redirect_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_platform_redirections UNIQUE (connection_id, platform)
);
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS bitspark;
             CREATE TABLE IF NOT EXISTS bitspark.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM bitspark.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO bitspark.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
