use dotenv;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{error, info, warn};

static CONFIG: OnceLock<HashMap<String, String>> = OnceLock::new();

/// Default configuration values
const DEFAULTS: &[(&str, &str)] = &[
    ("SERVER_ADDRESS", "127.0.0.1"),
    ("SERVER_PORT", "8081"),
    ("STORE_BACKEND", "postgres"),
    ("DB_MAX_CONNECTIONS", "20"),
    ("DB_MIN_CONNECTIONS", "5"),
    ("DB_ACQUIRE_TIMEOUT_SECONDS", "30"),
    ("JWT_ISSUER", "backoffice-auth"),
    ("JWT_AUDIENCE", "backoffice-admin"),
    ("JWT_LEEWAY_SECONDS", "30"),
    ("ACCESS_TOKEN_TTL_SECONDS", "7200"), // 2 hours
    ("REFRESH_TOKEN_TTL_SECONDS", "604800"), // 7 days
    ("TOKEN_CACHE_TTL_SECONDS", "300"),
    ("MENU_CACHE_TTL_SECONDS", "600"),
    ("SUPER_ADMIN_ROLE_ID", "1"),
    ("TOKEN_CLEANUP_INTERVAL_MINUTES", "60"),
    ("BCRYPT_COST", "12"),
    ("PASSWORD_VERIFY_MIN_MS", "100"),
    ("LOGIN_RATE_LIMIT_PER_MINUTE", "20"),
    ("TRUST_PROXY_HEADERS", "false"),
    ("LOG_LEVEL", "info"),
];

/// Keys read from the environment without a compiled-in default
const OPTIONAL_KEYS: &[&str] = &["DATABASE_URL", "JWT_SECRET", "CLEANUP_API_KEY", "ENV", "APP_NAME"];

pub fn init() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment file: {:?}", path),
        Err(_) => warn!("No .env file found, using system environment variables"),
    }

    let mut config = HashMap::new();

    // Load defaults first
    for (key, value) in DEFAULTS {
        config.insert(key.to_string(), value.to_string());
    }

    // Override with environment variables
    let keys = DEFAULTS.iter().map(|(key, _)| *key).chain(OPTIONAL_KEYS.iter().copied());
    for key in keys {
        if let Ok(value) = std::env::var(key) {
            config.insert(key.to_string(), value);
        }
    }

    if CONFIG.set(config).is_err() {
        error!("Configuration already initialized");
    } else {
        info!("Configuration initialized successfully");
    }
}

/// Required parameter; startup cannot continue without it.
pub fn get(parameter: &str) -> String {
    get_optional(parameter).unwrap_or_else(|| {
        error!("Configuration parameter '{}' not found", parameter);
        panic!("Required configuration parameter '{}' is missing", parameter);
    })
}

pub fn get_optional(parameter: &str) -> Option<String> {
    CONFIG
        .get()
        .and_then(|config| config.get(parameter))
        .filter(|value| !value.is_empty())
        .cloned()
}

pub fn get_i64(parameter: &str) -> i64 {
    let value = get(parameter);
    value.parse::<i64>().unwrap_or_else(|_| {
        error!("Configuration parameter '{}' is not a valid i64: {}", parameter, value);
        panic!("Configuration parameter '{}' is not a valid i64", parameter);
    })
}

pub fn get_u64(parameter: &str) -> u64 {
    let value = get(parameter);
    value.parse::<u64>().unwrap_or_else(|_| {
        error!("Configuration parameter '{}' is not a valid u64: {}", parameter, value);
        panic!("Configuration parameter '{}' is not a valid u64", parameter);
    })
}

pub fn get_bool(parameter: &str) -> bool {
    let value = get(parameter);
    parse_bool(&value).unwrap_or_else(|| {
        error!("Configuration parameter '{}' is not a valid bool: {}", parameter, value);
        panic!("Configuration parameter '{}' is not a valid bool", parameter);
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get all configuration parameters (for debugging)
pub fn get_all() -> HashMap<String, String> {
    CONFIG.get().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
