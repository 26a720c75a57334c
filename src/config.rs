use std::env;

use crate::auth::AuthMode;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub auth_mode: AuthMode,
    pub geocoding_api_key: String,
    pub civic_api_key: String,
    pub geocoding_base_url: String,
    pub civic_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            auth_mode: parse_or_default("AUTH_MODE", AuthMode::Session)?,
            geocoding_api_key: env::var("GEOCODING_API_KEY").unwrap_or_default(),
            civic_api_key: env::var("CIVIC_API_KEY").unwrap_or_default(),
            geocoding_base_url: env::var("GEOCODING_BASE_URL")
                .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api/geocode/json".to_string()),
            civic_base_url: env::var("CIVIC_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/civicinfo/v2/voterinfo".to_string()),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
