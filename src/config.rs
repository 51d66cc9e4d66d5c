use std::{fmt::Display, net::SocketAddr, str::FromStr, time::Duration};

use color_eyre::eyre::{eyre, WrapErr};

use crate::service::CacheSettings;

pub const DEFAULT_POKEAPI_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SPRITE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub pokeapi_url: String,
    pub sprite_url: String,
    pub upstream_timeout: Duration,
    pub catalog_limit: i64,
    pub cache: CacheSettings,
    pub jwt_secret: String,
    pub token_expiry: Duration,
}

impl Config {
    /// Reads the configuration from the environment; call `dotenvy::dotenv()` first.
    pub fn from_env() -> color_eyre::Result<Self> {
        Ok(Self {
            bind_addr: var_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: var_or("DATABASE_MAX_CONNECTIONS", 5)?,
            pokeapi_url: var_or("POKEAPI_URL", DEFAULT_POKEAPI_URL.to_owned())?,
            sprite_url: var_or("SPRITE_URL", DEFAULT_SPRITE_URL.to_owned())?,
            upstream_timeout: Duration::from_secs(var_or("UPSTREAM_TIMEOUT_SECS", 10)?),
            catalog_limit: var_or("CATALOG_LIMIT", 10_000)?,
            cache: CacheSettings {
                ttl: Duration::from_secs(var_or("CACHE_TTL_SECS", 6000)?),
                catalog_ttl: Duration::from_secs(var_or("CACHE_CATALOG_TTL_SECS", 86_400)?),
                check_period: Duration::from_secs(var_or("CACHE_CHECK_PERIOD_SECS", 600)?),
            },
            jwt_secret: required("JWT_SECRET")?,
            token_expiry: hours_or("TOKEN_EXPIRY_HOURS", 1)?,
        })
    }
}

fn required(name: &str) -> color_eyre::Result<String> {
    std::env::var(name).wrap_err_with(|| format!("{name} must be set"))
}

fn var_or<T>(name: &str, default: T) -> color_eyre::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|err| eyre!("invalid value {value:?} for {name}: {err}")),
        Err(_) => Ok(default),
    }
}

fn hours_or(name: &str, default: u64) -> color_eyre::Result<Duration> {
    let hours: u64 = var_or(name, default)?;
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| eyre!("{name} is too large: {hours} hours"))
}
