//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub attendance_storage_root: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    pub sweep_interval_seconds: u64,
    pub sweep_window_hours: i64,
    pub gmail_username: String,
    pub gmail_app_password: String,
    pub frontend_url: String,
    pub email_from_name: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Values that are safe to default (hosts, intervals, dev secrets) fall
    /// back so tests and local runs work without a populated environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "rollcall".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/rollcall.db".into()),
            attendance_storage_root: env::var("ATTENDANCE_STORAGE_ROOT")
                .unwrap_or_else(|_| "data/attendance_storage".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .unwrap_or(3000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev-jwt-secret".into()),
            jwt_duration_minutes: env::var("JWT_DURATION_MINUTES")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .unwrap_or(60),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .unwrap_or(900),
            sweep_window_hours: env::var("SWEEP_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),
            gmail_username: env::var("GMAIL_USERNAME").unwrap_or_default(),
            gmail_app_password: env::var("GMAIL_APP_PASSWORD").unwrap_or_default(),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_default(),
            email_from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Rollcall".into()),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap();
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_attendance_storage_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.attendance_storage_root = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_sweep_window_hours(value: i64) {
        AppConfig::set_field(|cfg| cfg.sweep_window_hours = value);
    }
}

// --- Module-level accessors, the form the rest of the workspace uses ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn attendance_storage_root() -> String {
    AppConfig::global().attendance_storage_root.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn jwt_duration_minutes() -> u64 {
    AppConfig::global().jwt_duration_minutes
}

pub fn sweep_interval_seconds() -> u64 {
    AppConfig::global().sweep_interval_seconds
}

pub fn sweep_window_hours() -> i64 {
    AppConfig::global().sweep_window_hours
}

pub fn gmail_username() -> String {
    AppConfig::global().gmail_username.clone()
}

pub fn gmail_app_password() -> String {
    AppConfig::global().gmail_app_password.clone()
}

pub fn frontend_url() -> String {
    AppConfig::global().frontend_url.clone()
}

pub fn email_from_name() -> String {
    AppConfig::global().email_from_name.clone()
}
