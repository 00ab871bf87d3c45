#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! # Recall Storage - SQL
//!
//! libSQL implementation of the relational metadata store: fact metadata
//! rows, extraction job rows, and materialised favourite summaries.
//!
//! The metadata store is the system of record for fact existence and job
//! lifecycle. Schema creation is idempotent; all statements are
//! parameterised.
//!
//! ## Example
//!
//! ```no_run
//! use recall_store_sql::SqlMetadataStore;
//! use recall_core::stores::MetadataStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = SqlMetadataStore::open("file:recall.db").await?;
//! store.init_schema().await?;
//! # Ok(())
//! # }
//! ```

mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Row};
use tracing::{debug, info};

use recall_core::error::{Error, Result};
use recall_core::stores::{KeywordHit, MetadataStore};
use recall_core::types::{Fact, FactCategory, FavoriteSummary, Job, JobStatus, Metadata};

/// libSQL-backed [`MetadataStore`].
pub struct SqlMetadataStore {
    _db: Database,
    conn: Connection,
}

impl SqlMetadataStore {
    /// Open a local database (`file:` path or `:memory:`).
    pub async fn open(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| Error::transient("failed to open metadata database", e))?;
        let conn = db
            .connect()
            .map_err(|e| Error::transient("failed to connect to metadata database", e))?;
        info!("Opened metadata database at {path}");
        Ok(Self { _db: db, conn })
    }

    fn connect(&self) -> Result<Connection> {
        Ok(self.conn.clone())
    }
}

fn storage_err(context: &str) -> impl Fn(libsql::Error) -> Error + '_ {
    move |e| Error::transient(context, e)
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn decode_json<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_fact(row: &Row) -> Result<Fact> {
    let fact_id: String = row.get(0).map_err(storage_err("fact_id column"))?;
    let user_id: String = row.get(1).map_err(storage_err("user_id column"))?;
    let content: String = row.get(2).map_err(storage_err("content column"))?;
    let category: String = row.get(3).map_err(storage_err("category column"))?;
    let confidence: f64 = row.get(4).map_err(storage_err("confidence column"))?;
    let entities_json: String = row.get(5).map_err(storage_err("entities column"))?;
    let created_at: i64 = row.get(6).map_err(storage_err("created_at column"))?;
    let meta_json: String = row.get(7).map_err(storage_err("meta_data column"))?;

    Ok(Fact {
        id: fact_id,
        user_id,
        content,
        category: FactCategory::from(category.as_str()),
        confidence: confidence as f32,
        embedding: None,
        entities: decode_json(&entities_json),
        created_at: from_millis(created_at),
        metadata: decode_json::<Metadata>(&meta_json),
    })
}

fn row_to_job(row: &Row) -> Result<Job> {
    let id: String = row.get(0).map_err(storage_err("id column"))?;
    let user_id: String = row.get(1).map_err(storage_err("user_id column"))?;
    let conversation_id: String = row.get(2).map_err(storage_err("conversation_id column"))?;
    let status: String = row.get(3).map_err(storage_err("status column"))?;
    let progress: i64 = row.get(4).map_err(storage_err("progress column"))?;
    let current_step: String = row.get(5).map_err(storage_err("current_step column"))?;
    let data_json: String = row.get(6).map_err(storage_err("data column"))?;
    let error: Option<String> = row.get(7).ok();
    let created_at: i64 = row.get(8).map_err(storage_err("created_at column"))?;
    let completed_at: Option<i64> = row.get(9).ok();

    Ok(Job {
        id,
        user_id,
        conversation_id,
        status: status.parse::<JobStatus>()?,
        progress: progress.clamp(0, 100) as u8,
        current_step,
        data: decode_json::<Metadata>(&data_json),
        error,
        created_at: from_millis(created_at),
        completed_at: completed_at.map(from_millis),
    })
}

#[async_trait]
impl MetadataStore for SqlMetadataStore {
    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        for statement in schema::ALL_STATEMENTS {
            conn.execute(statement, ())
                .await
                .map_err(storage_err("failed to initialise schema"))?;
        }
        info!("Metadata schema initialised");
        Ok(())
    }

    async fn upsert_fact(&self, fact: &Fact) -> Result<()> {
        let conn = self.connect()?;
        let sql = r#"
            INSERT INTO facts_metadata
                (fact_id, user_id, content, category, confidence, entities, created_at, meta_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (fact_id) DO UPDATE
            SET content = excluded.content,
                category = excluded.category,
                confidence = excluded.confidence,
                entities = excluded.entities,
                meta_data = excluded.meta_data
        "#;
        conn.execute(
            sql,
            libsql::params![
                fact.id.clone(),
                fact.user_id.clone(),
                fact.content.clone(),
                fact.category.to_string(),
                f64::from(fact.confidence),
                serde_json::to_string(&fact.entities)?,
                millis(fact.created_at),
                serde_json::to_string(&fact.metadata)?,
            ],
        )
        .await
        .map_err(storage_err("failed to upsert fact"))?;
        debug!("Upserted fact {}", fact.id);
        Ok(())
    }

    async fn fact_by_id(&self, fact_id: &str) -> Result<Option<Fact>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT fact_id, user_id, content, category, confidence, entities, created_at, meta_data
                 FROM facts_metadata WHERE fact_id = ?1",
                libsql::params![fact_id],
            )
            .await
            .map_err(storage_err("failed to query fact"))?;

        match rows.next().await.map_err(storage_err("failed to read fact row"))? {
            Some(row) => Ok(Some(row_to_fact(&row)?)),
            None => Ok(None),
        }
    }

    async fn facts_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Fact>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT fact_id, user_id, content, category, confidence, entities, created_at, meta_data
                 FROM facts_metadata WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
                libsql::params![user_id, limit as i64],
            )
            .await
            .map_err(storage_err("failed to query user facts"))?;

        let mut facts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(storage_err("failed to read fact row"))?
        {
            facts.push(row_to_fact(&row)?);
        }
        Ok(facts)
    }

    async fn facts_by_ids(&self, fact_ids: &[String]) -> Result<Vec<Fact>> {
        if fact_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.connect()?;
        let placeholders: Vec<String> = (1..=fact_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT fact_id, user_id, content, category, confidence, entities, created_at, meta_data
             FROM facts_metadata WHERE fact_id IN ({})",
            placeholders.join(",")
        );
        let mut rows = conn
            .query(&sql, libsql::params_from_iter(fact_ids.to_vec()))
            .await
            .map_err(storage_err("failed to query facts by ids"))?;

        let mut facts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(storage_err("failed to read fact row"))?
        {
            facts.push(row_to_fact(&row)?);
        }
        Ok(facts)
    }

    async fn keyword_search(
        &self,
        user_id: &str,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<KeywordHit>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.connect()?;
        // ?1 is the user, ?2 the limit; one LIKE pattern parameter per token.
        let conditions: Vec<String> = (0..tokens.len())
            .map(|i| format!("lower(content) LIKE ?{}", i + 3))
            .collect();
        let sql = format!(
            "SELECT fact_id, user_id, content, category, confidence, created_at
             FROM facts_metadata
             WHERE user_id = ?1 AND ({})
             ORDER BY created_at DESC LIMIT ?2",
            conditions.join(" OR ")
        );

        let mut params: Vec<libsql::Value> = vec![
            libsql::Value::from(user_id.to_string()),
            libsql::Value::from(limit as i64),
        ];
        for token in tokens {
            params.push(libsql::Value::from(format!("%{}%", token.to_lowercase())));
        }

        let mut rows = conn
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(storage_err("failed to run keyword search"))?;

        let mut hits = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(storage_err("failed to read keyword row"))?
        {
            let fact_id: String = row.get(0).map_err(storage_err("fact_id column"))?;
            let user_id: String = row.get(1).map_err(storage_err("user_id column"))?;
            let content: String = row.get(2).map_err(storage_err("content column"))?;
            let category: String = row.get(3).map_err(storage_err("category column"))?;
            let confidence: f64 = row.get(4).map_err(storage_err("confidence column"))?;
            let created_at: i64 = row.get(5).map_err(storage_err("created_at column"))?;
            hits.push(KeywordHit {
                fact_id,
                user_id,
                content,
                category,
                confidence: confidence as f32,
                created_at: from_millis(created_at),
                score: 1.0,
            });
        }
        Ok(hits)
    }

    async fn delete_fact(&self, fact_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM facts_metadata WHERE fact_id = ?1",
            libsql::params![fact_id],
        )
        .await
        .map_err(storage_err("failed to delete fact"))?;
        Ok(())
    }

    async fn delete_user_facts(&self, user_id: &str) -> Result<u64> {
        let conn = self.connect()?;
        let deleted = conn
            .execute(
                "DELETE FROM facts_metadata WHERE user_id = ?1",
                libsql::params![user_id],
            )
            .await
            .map_err(storage_err("failed to delete user facts"))?;
        Ok(deleted)
    }

    async fn list_user_ids(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT DISTINCT user_id FROM facts_metadata ORDER BY user_id",
                (),
            )
            .await
            .map_err(storage_err("failed to list users"))?;

        let mut user_ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(storage_err("failed to read user row"))?
        {
            user_ids.push(row.get::<String>(0).map_err(storage_err("user_id column"))?);
        }
        Ok(user_ids)
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO jobs
                 (id, user_id, conversation_id, status, progress, current_step, data, error, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            libsql::params![
                job.id.clone(),
                job.user_id.clone(),
                job.conversation_id.clone(),
                job.status.to_string(),
                i64::from(job.progress),
                job.current_step.clone(),
                serde_json::to_string(&job.data)?,
                job.error.clone(),
                millis(job.created_at),
                job.completed_at.map(millis),
            ],
        )
        .await
        .map_err(storage_err("failed to insert job"))?;
        debug!("Inserted job {}", job.id);
        Ok(())
    }

    async fn job_by_id(&self, job_id: &str) -> Result<Option<Job>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, conversation_id, status, progress, current_step, data, error, created_at, completed_at
                 FROM jobs WHERE id = ?1",
                libsql::params![job_id],
            )
            .await
            .map_err(storage_err("failed to query job"))?;

        match rows.next().await.map_err(storage_err("failed to read job row"))? {
            Some(row) => Ok(Some(row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let conn = self.connect()?;
        let updated = conn
            .execute(
                "UPDATE jobs
                 SET status = ?2, progress = ?3, current_step = ?4, data = ?5, error = ?6, completed_at = ?7
                 WHERE id = ?1",
                libsql::params![
                    job.id.clone(),
                    job.status.to_string(),
                    i64::from(job.progress),
                    job.current_step.clone(),
                    serde_json::to_string(&job.data)?,
                    job.error.clone(),
                    job.completed_at.map(millis),
                ],
            )
            .await
            .map_err(storage_err("failed to update job"))?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Job not found: {}", job.id)));
        }
        Ok(())
    }

    async fn upsert_favorite_summary(
        &self,
        user_id: &str,
        summary: &FavoriteSummary,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO user_favorite_summary (user_id, summary_json, last_updated)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id) DO UPDATE
             SET summary_json = excluded.summary_json,
                 last_updated = excluded.last_updated",
            libsql::params![
                user_id,
                serde_json::to_string(summary)?,
                millis(summary.last_updated.unwrap_or_else(Utc::now)),
            ],
        )
        .await
        .map_err(storage_err("failed to upsert favourite summary"))?;
        Ok(())
    }

    async fn favorite_summary(&self, user_id: &str) -> Result<Option<FavoriteSummary>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT summary_json FROM user_favorite_summary WHERE user_id = ?1",
                libsql::params![user_id],
            )
            .await
            .map_err(storage_err("failed to query favourite summary"))?;

        match rows
            .next()
            .await
            .map_err(storage_err("failed to read summary row"))?
        {
            Some(row) => {
                let raw: String = row.get(0).map_err(storage_err("summary_json column"))?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn delete_favorite_summary(&self, user_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM user_favorite_summary WHERE user_id = ?1",
            libsql::params![user_id],
        )
        .await
        .map_err(storage_err("failed to delete favourite summary"))?;
        Ok(())
    }
}
