//! SQLite-backed project store.
//!
//! One row per project. Chat transcripts and report lists are stored as JSON
//! arrays in text columns. Appends are a single `UPDATE` using SQLite's
//! `json_insert(.., '$[#]', ..)`, so concurrent writers (tasks or processes)
//! never read-modify-write the array.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{FieldUpdate, NewProject, Project, ProjectStore, ReportList, StoreResult};
use crate::chat::ChatMessage;
use crate::crew::{Domain, Report, Tier};
use crate::error::StoreError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id              TEXT PRIMARY KEY,
    owner_email     TEXT NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    domain          TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'draft',
    created_at      TEXT NOT NULL,

    -- Drafts
    macro_text      TEXT NOT NULL DEFAULT '',
    micro_text      TEXT NOT NULL DEFAULT '',

    -- JSON arrays
    macro_chat      TEXT NOT NULL DEFAULT '[]',
    micro_chat      TEXT NOT NULL DEFAULT '[]',
    reports_macro   TEXT NOT NULL DEFAULT '[]',
    reports_micro   TEXT NOT NULL DEFAULT '[]',

    updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_projects_owner_domain ON projects(owner_email, domain);
"#;

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) a database file in WAL mode.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        tracing::info!(path = %path.display(), "Project store opened");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Each connection to `:memory:` is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    fn row_to_project(row: &SqliteRow) -> StoreResult<Project> {
        let id: String = row.try_get("id")?;
        let domain: String = row.try_get("domain")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Project {
            id: Uuid::parse_str(&id)
                .map_err(|e| StoreError::Corrupt(format!("id '{}': {}", id, e)))?,
            owner_email: row.try_get("owner_email")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            domain: domain.parse().map_err(StoreError::Corrupt)?,
            status: status.parse().map_err(StoreError::Corrupt)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Corrupt(format!("created_at '{}': {}", created_at, e)))?,
            macro_text: row.try_get("macro_text")?,
            micro_text: row.try_get("micro_text")?,
            macro_chat: serde_json::from_str(row.try_get("macro_chat")?)?,
            micro_chat: serde_json::from_str(row.try_get("micro_chat")?)?,
            reports_macro: serde_json::from_str(row.try_get("reports_macro")?)?,
            reports_micro: serde_json::from_str(row.try_get("reports_micro")?)?,
        })
    }

    /// Appends serialized JSON values to the array in `column` in one statement.
    ///
    /// `column` comes from a fixed set of names, never from input.
    async fn append_json(&self, id: Uuid, column: &str, values: &[String]) -> StoreResult<()> {
        let mut expr = column.to_string();
        for n in 1..=values.len() {
            expr = format!("json_insert({}, '$[#]', json(?{}))", expr, n);
        }
        let sql = format!(
            "UPDATE projects SET {} = {}, updated_at = datetime('now') WHERE id = ?{}",
            column,
            expr,
            values.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for value in values {
            query = query.bind(value.as_str());
        }
        let result = query.bind(id.to_string()).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let project = Project::from_new(new);

        sqlx::query(
            "INSERT INTO projects (id, owner_email, title, description, domain, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(project.id.to_string())
        .bind(&project.owner_email)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.domain.as_str())
        .bind(project.status.as_str())
        .bind(
            project
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        )
        .execute(&self.pool)
        .await?;

        tracing::info!(id = %project.id, domain = %project.domain, "Project created");
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_project).transpose()
    }

    async fn list_projects(&self, owner_email: &str, domain: Domain) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query(
            "SELECT * FROM projects WHERE owner_email = ?1 AND domain = ?2
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(owner_email)
        .bind(domain.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_project).collect()
    }

    async fn update_field(&self, id: Uuid, update: FieldUpdate) -> StoreResult<()> {
        let column = update.field_name();
        let value = match update {
            FieldUpdate::Title(v) | FieldUpdate::Description(v) => v,
            FieldUpdate::Status(status) => status.as_str().to_string(),
            FieldUpdate::Text { text, .. } => text,
            FieldUpdate::Chat { messages, .. } => serde_json::to_string(&messages)?,
        };

        // `column` comes from a fixed set of names, never from input.
        let sql = format!(
            "UPDATE projects SET {} = ?1, updated_at = datetime('now') WHERE id = ?2",
            column
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(id = %id, field = column, "Project field updated");
        Ok(())
    }

    async fn append_report(&self, id: Uuid, list: ReportList, report: Report) -> StoreResult<()> {
        let column = list.field_name();
        let payload = serde_json::to_string(&report)?;

        self.append_json(id, column, &[payload]).await?;
        tracing::info!(id = %id, list = column, "Report appended");
        Ok(())
    }

    async fn append_chat(
        &self,
        id: Uuid,
        tier: Tier,
        messages: Vec<ChatMessage>,
    ) -> StoreResult<()> {
        let column = match tier {
            Tier::Macro => "macro_chat",
            Tier::Micro => "micro_chat",
        };
        let payloads = messages
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        self.append_json(id, column, &payloads).await?;
        tracing::debug!(id = %id, field = column, added = payloads.len(), "Chat extended");
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
