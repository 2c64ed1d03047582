//! Postgres-backed trust graph storage.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;

use fides_discovery::IdentityRecord;
use fides_trust::{ReputationScore, TrustEdge};

use crate::config::TrustConfig;

const IDLE_TIMEOUT: Duration = Duration::from_secs(20);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, FromRow)]
struct EdgeRow {
    id: i64,
    source: String,
    target: String,
    level: i16,
    attestation_id: String,
    signature: String,
    payload: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
}

impl EdgeRow {
    fn into_edge(self) -> TrustEdge {
        TrustEdge {
            id: self.id,
            source: self.source,
            target: self.target,
            level: self.level.clamp(0, 100) as u8,
            attestation_id: self.attestation_id,
            signature: self.signature,
            payload: self.payload,
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct IdentityRow {
    did: String,
    public_key: String,
    metadata: String,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ScoreRow {
    score: f64,
    direct_trusters: i32,
    transitive_trusters: i32,
    last_computed: DateTime<Utc>,
}

/// Trust graph persistence: edges, the service's local identity view, and
/// the materialized reputation cache.
#[derive(Clone)]
pub struct TrustStore {
    pool: PgPool,
}

impl TrustStore {
    /// Connect the pool and ensure the schema exists.
    pub async fn connect(config: &TrustConfig) -> Result<Self, sqlx::Error> {
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
            CREATE TABLE IF NOT EXISTS trust_edges (
                id              BIGSERIAL PRIMARY KEY,
                source          TEXT NOT NULL,
                target          TEXT NOT NULL,
                level           SMALLINT NOT NULL CHECK (level BETWEEN 0 AND 100),
                attestation_id  TEXT NOT NULL,
                signature       TEXT NOT NULL,
                payload         TEXT NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
                expires_at      TIMESTAMPTZ,
                revoked_at      TIMESTAMPTZ,
                UNIQUE (source, target)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trust_identities (
                did         TEXT PRIMARY KEY,
                public_key  TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                first_seen  TIMESTAMPTZ NOT NULL DEFAULT now(),
                last_seen   TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reputation_cache (
                did                  TEXT PRIMARY KEY,
                score                DOUBLE PRECISION NOT NULL,
                direct_trusters      INTEGER NOT NULL,
                transitive_trusters  INTEGER NOT NULL,
                last_computed        TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or update the edge for `(source, target)`.
    ///
    /// A replayed create-trust request updates the existing row in place;
    /// `created_at` (the total order) and `revoked_at` (terminal state) are
    /// preserved. Returns the edge id.
    pub async fn upsert_edge(
        &self,
        source: &str,
        target: &str,
        level: u8,
        attestation_id: &str,
        signature: &str,
        payload: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO trust_edges
                (source, target, level, attestation_id, signature, payload, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source, target) DO UPDATE SET
                level = EXCLUDED.level,
                attestation_id = EXCLUDED.attestation_id,
                signature = EXCLUDED.signature,
                payload = EXCLUDED.payload,
                expires_at = EXCLUDED.expires_at
            RETURNING id
            "#,
        )
        .bind(source)
        .bind(target)
        .bind(level as i16)
        .bind(attestation_id)
        .bind(signature)
        .bind(payload)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Every edge, primary key ascending: the documented enumeration order
    /// that makes BFS results deterministic.
    pub async fn load_edges(&self) -> Result<Vec<TrustEdge>, sqlx::Error> {
        let rows = sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT id, source, target, level, attestation_id, signature, payload,
                   created_at, expires_at, revoked_at
            FROM trust_edges ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EdgeRow::into_edge).collect())
    }

    /// The service's local view of an identity.
    pub async fn get_identity(&self, did: &str) -> Result<Option<IdentityRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT did, public_key, metadata, first_seen, last_seen
            FROM trust_identities WHERE did = $1
            "#,
        )
        .bind(did)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| IdentityRecord {
            did: r.did,
            public_key: r.public_key,
            metadata: serde_json::from_str(&r.metadata).unwrap_or(serde_json::Value::Null),
            domain: None,
            first_seen: r.first_seen,
            last_seen: r.last_seen,
        }))
    }

    /// Insert an identity or refresh its `last_seen` timestamp.
    pub async fn upsert_identity(
        &self,
        did: &str,
        public_key: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO trust_identities (did, public_key, metadata)
            VALUES ($1, $2, $3)
            ON CONFLICT (did) DO UPDATE SET last_seen = now()
            "#,
        )
        .bind(did)
        .bind(public_key)
        .bind(metadata.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cached reputation row, if any.
    pub async fn get_cached_score(
        &self,
        did: &str,
    ) -> Result<Option<(ReputationScore, DateTime<Utc>)>, sqlx::Error> {
        let row = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT score, direct_trusters, transitive_trusters, last_computed
            FROM reputation_cache WHERE did = $1
            "#,
        )
        .bind(did)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| {
            (
                ReputationScore {
                    score: r.score,
                    direct_trusters: r.direct_trusters.max(0) as usize,
                    transitive_trusters: r.transitive_trusters.max(0) as usize,
                },
                r.last_computed,
            )
        }))
    }

    /// Materialize a freshly computed score with `last_computed = now`.
    pub async fn upsert_score(
        &self,
        did: &str,
        score: &ReputationScore,
        computed_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reputation_cache
                (did, score, direct_trusters, transitive_trusters, last_computed)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (did) DO UPDATE SET
                score = EXCLUDED.score,
                direct_trusters = EXCLUDED.direct_trusters,
                transitive_trusters = EXCLUDED.transitive_trusters,
                last_computed = EXCLUDED.last_computed
            "#,
        )
        .bind(did)
        .bind(score.score)
        .bind(score.direct_trusters as i32)
        .bind(score.transitive_trusters as i32)
        .bind(computed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Invalidate a subject's cached score by resetting `last_computed` to
    /// the epoch; the next read recomputes.
    pub async fn invalidate_score(&self, did: &str) -> Result<(), sqlx::Error> {
        let epoch = Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now);
        sqlx::query("UPDATE reputation_cache SET last_computed = $2 WHERE did = $1")
            .bind(did)
            .bind(epoch)
            .execute(&self.pool)
            .await?;
        Ok(())
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
