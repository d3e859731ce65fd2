use std::env;

use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE: &str = "Equalize";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} is not valid unicode")]
    NotUnicode { name: &'static str },
    #[error("{name} must be true or false, got {value:?}")]
    NotABool { name: &'static str, value: String },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub session_secret: String,
    pub telegram_bot_token: Option<String>,
    pub assistant: AssistantConfig,
    pub cors_origin: Option<String>,
    pub seed_sample_data: bool,
}

impl Config {
    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, env::VarError>,
    {
        let optional = |name: &'static str| -> Result<Option<String>, ConfigError> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value.trim().to_string())),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { name }),
            }
        };

        let session_secret = match optional("SESSION_SECRET")? {
            Some(secret) => secret,
            None => {
                tracing::warn!("SESSION_SECRET is not set, sessions will not survive a restart");
                Uuid::new_v4().simple().to_string()
            }
        };
        let seed_sample_data = match optional("SEED_SAMPLE_DATA")? {
            None => false,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::NotABool {
                        name: "SEED_SAMPLE_DATA",
                        value,
                    })
                }
            },
        };

        Ok(Self {
            bind_address: optional("BIND_ADDRESS")?.unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            mongodb_uri: optional("MONGODB_URI")?,
            mongodb_database: optional("MONGODB_DATABASE")?.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            session_secret,
            telegram_bot_token: optional("TELEGRAM_BOT_TOKEN")?,
            assistant: AssistantConfig {
                url: optional("ASSISTANT_URL")?,
                api_key: optional("ASSISTANT_API_KEY")?,
            },
            cors_origin: optional("CORS_ORIGIN")?,
            seed_sample_data,
        })
    }
}
