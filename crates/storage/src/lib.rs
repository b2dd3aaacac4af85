//! Key-value preference storage for the desktop client.
//!
//! Three values survive across sessions: the last-selected guild, the build
//! id last seen by the onboarding flow, and whether onboarding was ever
//! completed. Everything else is in-memory UI state.

use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use shared::domain::Snowflake;

const KEY_LAST_SELECTED_GUILD: &str = "last_selected_guild";
const KEY_PREVIOUS_BUILD: &str = "previous_build";
const KEY_SEEN_ONBOARDING: &str = "seen_onboarding";

#[derive(Clone)]
pub struct Preferences {
    pool: Pool<Sqlite>,
}

impl Preferences {
    pub async fn open(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(connect_options)
            .await?;
        let prefs = Self { pool };
        prefs.ensure_preferences_table().await?;
        Ok(prefs)
    }

    async fn ensure_preferences_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create preferences table")?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read preference '{key}'"))?;
        Ok(row.map(|row| row.get::<String, _>(0)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write preference '{key}'"))?;
        Ok(())
    }

    pub async fn last_selected_guild(&self) -> Result<Option<Snowflake>> {
        Ok(self.get(KEY_LAST_SELECTED_GUILD).await?.map(Snowflake))
    }

    pub async fn set_last_selected_guild(&self, guild_id: &Snowflake) -> Result<()> {
        self.set(KEY_LAST_SELECTED_GUILD, guild_id.as_str()).await
    }

    pub async fn previous_build(&self) -> Result<Option<String>> {
        self.get(KEY_PREVIOUS_BUILD).await
    }

    pub async fn set_previous_build(&self, build: &str) -> Result<()> {
        self.set(KEY_PREVIOUS_BUILD, build).await
    }

    pub async fn seen_onboarding(&self) -> Result<bool> {
        Ok(self.get(KEY_SEEN_ONBOARDING).await?.as_deref() == Some("true"))
    }

    pub async fn set_seen_onboarding(&self, seen: bool) -> Result<()> {
        self.set(KEY_SEEN_ONBOARDING, if seen { "true" } else { "false" })
            .await
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }
    let trimmed = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
