use std::{fmt::Display, str::FromStr};

use tracing::{info, warn};

const DEV_SECRET: &str = "vakeel-development-secret-change-me";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub bcrypt_cost: u32,
    pub model_path: String,
    pub advisor_seed: Option<u64>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "8080"),
            database_url: try_load("DATABASE_URL", "sqlite:vakeel.db"),
            secret_key: load_secret("SECRET_KEY"),
            access_token_expire_minutes: try_load("ACCESS_TOKEN_EXPIRE_MINUTES", "30"),
            bcrypt_cost: try_load("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string()),
            model_path: try_load("LLM_MODEL_PATH", "meta-llama/Llama-2-7b-chat-hf"),
            advisor_seed: var("ADVISOR_SEED").ok().map(|seed| {
                seed.parse()
                    .map_err(|e| warn!("Invalid ADVISOR_SEED value: {e}"))
                    .expect("Environment misconfigured!")
            }),
        }
    }
}

fn var(key: &str) -> Result<String, dotenv::Error> {
    dotenv::var(key)
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn load_secret(key: &str) -> String {
    match var(key) {
        Ok(secret) if !secret.trim().is_empty() => secret.trim().to_string(),
        _ => {
            warn!("{key} not set, falling back to the development secret");
            DEV_SECRET.to_string()
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            secret_key: "test-secret".to_string(),
            access_token_expire_minutes: 30,
            bcrypt_cost: 4,
            model_path: "mock".to_string(),
            advisor_seed: Some(7),
        }
    }
}
