/// Configuration management for Content Service
///
/// This module handles loading and managing configuration from environment variables.
/// `main` loads a `.env` file first when one is present.
use crate::services::expiry::{DEFAULT_POST_DURATIONS, DEFAULT_STORY_HOURS, MAX_LIFETIME_HOURS};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Content lifecycle settings
    pub lifecycle: LifecycleConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Non-durable; for local runs without a database.
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Who receives the identities of a story's viewers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerPolicy {
    /// Only the story's author.
    #[default]
    AuthorOnly,
    /// Anyone who can read the story.
    AnyReader,
}

/// Content lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub story_lifetime_hours: u32,
    pub allowed_post_durations: Vec<u32>,
    pub viewer_policy: ViewerPolicy,
    /// Runs the `is_expired` reconcile job when true.
    pub reconcile_enabled: bool,
    pub reconcile_interval_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            story_lifetime_hours: DEFAULT_STORY_HOURS,
            allowed_post_durations: DEFAULT_POST_DURATIONS.to_vec(),
            viewer_policy: ViewerPolicy::AuthorOnly,
            reconcile_enabled: false,
            reconcile_interval_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: lookup("CONTENT_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or_default(&lookup, "CONTENT_SERVICE_PORT", 8081)?,
            },
            cors: {
                let allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
                    Some(value) => value,
                    None if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    None => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                backend: match lookup("STORAGE_BACKEND").as_deref() {
                    None | Some("postgres") => StorageBackend::Postgres,
                    Some("memory") if production => {
                        return Err("STORAGE_BACKEND=memory is not allowed in production".to_string())
                    }
                    Some("memory") => StorageBackend::Memory,
                    Some(other) => return Err(format!("Unknown STORAGE_BACKEND '{}'", other)),
                },
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "postgresql://localhost/ephora".to_string()),
                max_connections: parse_or_default(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            lifecycle: LifecycleConfig {
                story_lifetime_hours: {
                    let hours = parse_or_default(&lookup, "STORY_LIFETIME_HOURS", DEFAULT_STORY_HOURS)?;
                    if hours == 0 || hours > MAX_LIFETIME_HOURS {
                        return Err(format!(
                            "STORY_LIFETIME_HOURS must be between 1 and {}",
                            MAX_LIFETIME_HOURS
                        ));
                    }
                    hours
                },
                allowed_post_durations: match lookup("POST_ALLOWED_DURATIONS") {
                    Some(raw) => parse_durations(&raw)?,
                    None => DEFAULT_POST_DURATIONS.to_vec(),
                },
                viewer_policy: match lookup("VIEWER_VISIBILITY").as_deref() {
                    None | Some("author_only") => ViewerPolicy::AuthorOnly,
                    Some("any_reader") => ViewerPolicy::AnyReader,
                    Some(other) => return Err(format!("Unknown VIEWER_VISIBILITY '{}'", other)),
                },
                reconcile_enabled: parse_or_default(&lookup, "EXPIRY_RECONCILE_ENABLED", false)?,
                reconcile_interval_secs: {
                    let secs = parse_or_default(&lookup, "EXPIRY_RECONCILE_INTERVAL_SECS", 300)?;
                    if secs == 0 {
                        return Err("EXPIRY_RECONCILE_INTERVAL_SECS must be positive".to_string());
                    }
                    secs
                },
            },
        })
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        None => Ok(default),
    }
}

fn parse_durations(raw: &str) -> Result<Vec<u32>, String> {
    let mut hours = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|e| format!("Invalid POST_ALLOWED_DURATIONS entry '{}': {}", s, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if hours.is_empty() {
        return Err("POST_ALLOWED_DURATIONS must list at least one duration".to_string());
    }
    if hours.contains(&0) {
        return Err("POST_ALLOWED_DURATIONS entries must be positive".to_string());
    }
    if let Some(too_long) = hours.iter().find(|h| **h > MAX_LIFETIME_HOURS) {
        return Err(format!(
            "POST_ALLOWED_DURATIONS entry {} exceeds {} hours",
            too_long, MAX_LIFETIME_HOURS
        ));
    }

    hours.sort_unstable();
    hours.dedup();
    Ok(hours)
}
