use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// Process-local store; state is lost on restart.
    Memory,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Redis connection URL, built from the `REDIS_*` variables unless
    /// `REDIS_URL` is set.
    pub redis_url: String,
    /// Maximum pooled connections (default: `32`).
    pub pool_size: usize,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5063`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub store: StoreConfig,
    /// Base URL of the metadata service.
    pub metadata_service: String,
    /// Base URL of the queue service.
    pub queue_service: String,
    pub jwt: JwtConfig,
    /// Keep-alive comment interval on SSE responses (default: `5`).
    pub sse_ping_interval_secs: u64,
    /// Pause between reads of a tailed status log (default: `1000`).
    pub stream_poll_interval_ms: u64,
    /// Lifetime of job records in hours (default: `24`).
    pub job_ttl_hours: u64,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> T {
    env_or(name, default)
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

/// Job expiry in seconds. Panics when the hour count overflows.
fn job_ttl_secs(hours: u64) -> u64 {
    hours
        .checked_mul(60 * 60)
        .unwrap_or_else(|| panic!("JOB_TTL_HOURS is too large: {hours}"))
}

impl StoreConfig {
    /// | Env Var           | Default     |
    /// |-------------------|-------------|
    /// | `STORE_BACKEND`   | `redis`     |
    /// | `REDIS_URL`       | --          |
    /// | `REDIS_HOST`      | `127.0.0.1` |
    /// | `REDIS_PORT`      | `6379`      |
    /// | `REDIS_DB`        | `0`         |
    /// | `REDIS_PASSWORD`  | --          |
    /// | `REDIS_POOL_SIZE` | `32`        |
    pub fn from_env() -> Self {
        let backend_raw = env_or("STORE_BACKEND", "redis");
        let backend = StoreBackend::from_str(&backend_raw)
            .unwrap_or_else(|| panic!("STORE_BACKEND must be 'redis' or 'memory', got '{backend_raw}'"));

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| {
            let host = env_or("REDIS_HOST", "127.0.0.1");
            let port: u16 = parse_env("REDIS_PORT", "6379");
            let db: u32 = parse_env("REDIS_DB", "0");
            match std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()) {
                Some(password) => format!("redis://:{password}@{host}:{port}/{db}"),
                None => format!("redis://{host}:{port}/{db}"),
            }
        });

        Self {
            backend,
            redis_url,
            pool_size: parse_env("REDIS_POOL_SIZE", "32"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `5063`                  |
    /// | `CORS_ORIGINS`            | `*`                     |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `METADATA_SERVICE`        | `http://127.0.0.1:5065` |
    /// | `QUEUE_SERVICE`           | `http://127.0.0.1:6060` |
    /// | `SSE_PING_INTERVAL_SECS`  | `5`                     |
    /// | `STREAM_POLL_INTERVAL_MS` | `1000`                  |
    /// | `JOB_TTL_HOURS`           | `24`                    |
    ///
    /// Store settings are read by [`StoreConfig::from_env`] and JWT
    /// settings by [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let job_ttl_hours: u64 = parse_env("JOB_TTL_HOURS", "24");
        job_ttl_secs(job_ttl_hours);

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", "5063"),
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", "30"),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", "30"),
            store: StoreConfig::from_env(),
            metadata_service: env_or("METADATA_SERVICE", "http://127.0.0.1:5065"),
            queue_service: env_or("QUEUE_SERVICE", "http://127.0.0.1:6060"),
            jwt: JwtConfig::from_env(),
            sse_ping_interval_secs: parse_env("SSE_PING_INTERVAL_SECS", "5"),
            stream_poll_interval_ms: parse_env("STREAM_POLL_INTERVAL_MS", "1000"),
            job_ttl_hours,
        }
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(job_ttl_secs(self.job_ttl_hours))
    }

    pub fn stream_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stream_poll_interval_ms.max(1))
    }

    pub fn sse_ping_interval(&self) -> Duration {
        Duration::from_secs(self.sse_ping_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ttl_is_hours_in_seconds() {
        assert_eq!(job_ttl_secs(24), 86_400);
        assert_eq!(job_ttl_secs(0), 0);
    }

    #[test]
    fn zero_intervals_are_raised_to_one_unit() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                redis_url: String::new(),
                pool_size: 1,
            },
            metadata_service: String::new(),
            queue_service: String::new(),
            jwt: JwtConfig {
                secret: "secret".into(),
            },
            sse_ping_interval_secs: 0,
            stream_poll_interval_ms: 0,
            job_ttl_hours: 1,
        };
        assert_eq!(config.stream_poll_interval(), Duration::from_millis(1));
        assert_eq!(config.sse_ping_interval(), Duration::from_secs(1));
        assert_eq!(config.job_ttl(), Duration::from_secs(3600));
    }

    #[test]
    #[should_panic(expected = "JOB_TTL_HOURS is too large")]
    fn oversized_job_ttl_is_rejected() {
        job_ttl_secs(u64::MAX / 60);
    }
}
