//! Postgres-backed identity storage.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;

use fides_discovery::IdentityRecord;

use crate::config::RegistryConfig;

const IDLE_TIMEOUT: Duration = Duration::from_secs(20);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Row shape of the `identities` table.
#[derive(Debug, FromRow)]
struct IdentityRow {
    did: String,
    public_key: String,
    metadata: String,
    domain: Option<String>,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl IdentityRow {
    fn into_record(self) -> IdentityRecord {
        IdentityRecord {
            did: self.did,
            public_key: self.public_key,
            metadata: serde_json::from_str(&self.metadata)
                .unwrap_or(serde_json::Value::Null),
            domain: self.domain,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        }
    }
}

/// Identity persistence for the registry service.
#[derive(Clone)]
pub struct IdentityStore {
    pool: PgPool,
}

impl IdentityStore {
    /// Connect the pool and ensure the schema exists.
    pub async fn connect(config: &RegistryConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_pool_max)
            .idle_timeout(IDLE_TIMEOUT)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&config.database_url)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id          BIGSERIAL PRIMARY KEY,
                did         TEXT NOT NULL UNIQUE,
                public_key  TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                domain      TEXT,
                first_seen  TIMESTAMPTZ NOT NULL DEFAULT now(),
                last_seen   TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS identities_domain_idx ON identities (domain)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a new identity. Returns `None` when the identifier is already
    /// registered.
    pub async fn insert(
        &self,
        did: &str,
        public_key: &str,
        metadata: &serde_json::Value,
        domain: Option<&str>,
    ) -> Result<Option<IdentityRecord>, sqlx::Error> {
        let result = sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO identities (did, public_key, metadata, domain)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (did) DO NOTHING
            RETURNING did, public_key, metadata, domain, first_seen, last_seen
            "#,
        )
        .bind(did)
        .bind(public_key)
        .bind(metadata.to_string())
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(IdentityRow::into_record))
    }

    /// Look up a single identity.
    pub async fn get(&self, did: &str) -> Result<Option<IdentityRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT did, public_key, metadata, domain, first_seen, last_seen
            FROM identities WHERE did = $1
            "#,
        )
        .bind(did)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(IdentityRow::into_record))
    }

    /// All identities registered for a domain, oldest first.
    pub async fn list_by_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<IdentityRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT did, public_key, metadata, domain, first_seen, last_seen
            FROM identities WHERE domain = $1 ORDER BY id ASC
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(IdentityRow::into_record).collect())
    }

    /// Database liveness probe.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Close the pool during shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
