use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Tunables of the ticketing core.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    /// Upper bound on any single persistence call.
    pub persistence_timeout: Duration,
    /// How long an unfinished checkout may hold inventory.
    pub reservation_ttl: Duration,
    /// Attempts at minting a unique token or order number before giving up.
    pub issuance_max_attempts: u32,
    pub max_units_per_line: u32,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            persistence_timeout: Duration::from_millis(5_000),
            reservation_ttl: Duration::from_secs(15 * 60),
            issuance_max_attempts: 5,
            max_units_per_line: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub sweep_interval: Duration,
    pub allowed_origins: Vec<String>,
    pub production: bool,
    pub core: CoreSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = CoreSettings::default();
        let core = CoreSettings {
            persistence_timeout: Duration::from_millis(parse_or(
                &lookup,
                "PERSISTENCE_TIMEOUT_MS",
                defaults.persistence_timeout.as_millis() as u64,
            )),
            reservation_ttl: Duration::from_secs(parse_or(
                &lookup,
                "RESERVATION_TTL_SECS",
                defaults.reservation_ttl.as_secs(),
            )),
            issuance_max_attempts: parse_or(&lookup, "ISSUANCE_MAX_ATTEMPTS", defaults.issuance_max_attempts)
                .max(1),
            max_units_per_line: parse_or(&lookup, "MAX_UNITS_PER_LINE", defaults.max_units_per_line),
        };

        let fallback_addr = SocketAddr::from(([0, 0, 0, 0], 3001));
        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            bind_addr: lookup("BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
                .parse()
                .unwrap_or_else(|e| {
                    tracing::warn!("Config: invalid BIND_ADDR ({}), using {}", e, fallback_addr);
                    fallback_addr
                }),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5),
            sweep_interval: Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", 60u64).max(1)),
            allowed_origins,
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            core,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Config: invalid {}='{}' ({}), using {}", key, raw, e, default);
            default
        }),
        None => default,
    }
}
