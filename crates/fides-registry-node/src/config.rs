//! Registry service configuration from the environment.

/// Default size of the Postgres connection pool.
pub const DEFAULT_POOL_MAX: u32 = 10;

/// Runtime configuration for the registry service.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Postgres connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Maximum pool connections (`DB_POOL_MAX`, default 10).
    pub db_pool_max: u32,
    /// Allowed CORS origin (`CORS_ORIGIN`; any origin when unset).
    pub cors_origin: Option<String>,
    /// `development` or `production` (`NODE_ENV`).
    pub node_env: String,
    /// Listen port (`PORT`, default 4001).
    pub port: u16,
}

impl RegistryConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let db_pool_max = match std::env::var("DB_POOL_MAX") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_POOL_MAX must be an integer"))?,
            Err(_) => DEFAULT_POOL_MAX,
        };
        let cors_origin = std::env::var("CORS_ORIGIN").ok();
        let node_env =
            std::env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be an integer"))?,
            Err(_) => 4001,
        };

        Ok(Self {
            database_url,
            db_pool_max,
            cors_origin,
            node_env,
            port,
        })
    }

    /// Whether production error hygiene applies.
    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }
}
