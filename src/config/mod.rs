use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub repository: RepositoryConfig,
    pub shaper: ShaperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub enable_query_logging: bool,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaperConfig {
    pub default_page_size: i64,
    pub max_page_size: Option<i64>,
    pub debug_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment presets first, then specific env vars win
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs =
                v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging =
                v.parse().unwrap_or(self.database.enable_query_logging);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_SLOW_QUERY_WARNING") {
            self.database.enable_slow_query_warning =
                v.parse().unwrap_or(self.database.enable_slow_query_warning);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms =
                v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // Repository overrides
        if let Ok(v) = env::var("REPOSITORY_DEBUG_LOGGING") {
            self.repository.debug_logging = v.parse().unwrap_or(self.repository.debug_logging);
        }

        // Shaper overrides
        if let Ok(v) = env::var("SHAPER_DEFAULT_PAGE_SIZE") {
            self.shaper.default_page_size = v.parse().unwrap_or(self.shaper.default_page_size);
        }
        if let Ok(v) = env::var("SHAPER_MAX_PAGE_SIZE") {
            // An unparsable value keeps the preset cap in place
            self.shaper.max_page_size = v.parse().ok().or(self.shaper.max_page_size);
        }
        if let Ok(v) = env::var("SHAPER_DEBUG_LOGGING") {
            self.shaper.debug_logging = v.parse().unwrap_or(self.shaper.debug_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            repository: RepositoryConfig { debug_logging: true },
            shaper: ShaperConfig {
                default_page_size: 10,
                max_page_size: Some(1000),
                debug_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                acquire_timeout_secs: 10,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
            },
            repository: RepositoryConfig { debug_logging: false },
            shaper: ShaperConfig {
                default_page_size: 10,
                max_page_size: Some(500),
                debug_logging: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
                enable_query_logging: false,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 1000,
            },
            repository: RepositoryConfig { debug_logging: false },
            shaper: ShaperConfig {
                default_page_size: 10,
                max_page_size: Some(100),
                debug_logging: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test body: the env var is process-global and tests run in parallel
    #[test]
    fn max_page_size_override_parses_or_keeps_the_preset() {
        env::set_var("SHAPER_MAX_PAGE_SIZE", "lots");
        let cfg = AppConfig::development().with_env_overrides();
        assert_eq!(cfg.shaper.max_page_size, Some(1000));

        env::set_var("SHAPER_MAX_PAGE_SIZE", "250");
        let cfg = AppConfig::development().with_env_overrides();
        assert_eq!(cfg.shaper.max_page_size, Some(250));

        env::remove_var("SHAPER_MAX_PAGE_SIZE");
    }
}

// Global singleton config - initialized once on first access
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
