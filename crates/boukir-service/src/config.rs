//! Service configuration.

use boukir_store::PgConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL URL. Without it the service runs on the in-memory backend.
    pub database_url: Option<String>,

    /// Pool size (default: 10).
    pub db_max_connections: u32,

    /// Per-transaction statement timeout in milliseconds (default: 5000).
    pub db_statement_timeout_ms: u64,

    /// Per-transaction lock wait timeout in milliseconds (default: 3000).
    pub db_lock_timeout_ms: u64,

    /// HS256 secret used to verify bearer tokens.
    pub jwt_secret: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_statement_timeout_ms: env_or(
                "DB_STATEMENT_TIMEOUT_MS",
                defaults.db_statement_timeout_ms,
            ),
            db_lock_timeout_ms: env_or("DB_LOCK_TIMEOUT_MS", defaults.db_lock_timeout_ms),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }

    /// PostgreSQL settings, if a database URL is configured.
    #[must_use]
    pub fn pg_config(&self) -> Option<PgConfig> {
        self.database_url.as_ref().map(|url| PgConfig {
            url: url.clone(),
            max_connections: self.db_max_connections,
            statement_timeout_ms: self.db_statement_timeout_ms,
            lock_timeout_ms: self.db_lock_timeout_ms,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            db_max_connections: 10,
            db_statement_timeout_ms: 5000,
            db_lock_timeout_ms: 3000,
            jwt_secret: "dev-secret".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
