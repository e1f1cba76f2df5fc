use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;

use crate::utils::error::ChatError;

/// Environment variable names understood for compatibility with existing
/// deployments, mapped onto their settings keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("POSTGRES_USER", "database.user"),
    ("POSTGRES_PASSWORD", "database.password"),
    ("POSTGRES_HOST", "database.host"),
    ("POSTGRES_PORT", "database.port"),
    ("POSTGRES_DB", "database.name"),
    ("OLLAMA_BASE_URL", "llm.base_url"),
    ("MODEL_NAME", "llm.model"),
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    /// Number of most recent turns rendered into the prompt context
    pub max_context_turns: usize,
    /// Session token used when a caller does not supply one
    pub default_session: String,
}

impl DatabaseConfig {
    /// Connection URL with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.name
        )
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }
}

impl Settings {
    pub fn load() -> Result<Self, ChatError> {
        dotenvy::dotenv().ok();

        let builder = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/settings").required(false))
            // Example: APP__DATABASE__HOST=db.internal
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let builder = Self::with_legacy_env(builder, |name| std::env::var(name).ok())?;

        Self::from_config(builder.build()?)
    }

    pub fn from_config(config: Config) -> Result<Self, ChatError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.user", "chatbot_user")?
            .set_default("database.password", "")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.name", "chatbot_db")?
            .set_default("database.pool_max_size", 10)?
            .set_default("database.pool_timeout_seconds", 5)?
            .set_default("llm.base_url", "http://localhost:11434")?
            .set_default("llm.model", "llama2:7b-chat")?
            .set_default("llm.timeout_seconds", 30)?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.max_tokens", 500)?
            .set_default("conversation.max_context_turns", 10)?
            .set_default("conversation.default_session", "default")
    }

    /// Applies `POSTGRES_*`, `OLLAMA_BASE_URL` and `MODEL_NAME` on top of
    /// every other source.
    pub fn with_legacy_env<F>(
        mut builder: ConfigBuilder<DefaultState>,
        lookup: F,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*key, lookup(var))?;
        }
        Ok(builder)
    }

    fn validate(&self) -> Result<(), ChatError> {
        let db = &self.database;
        for (field, value) in [
            ("database.user", &db.user),
            ("database.password", &db.password),
            ("database.host", &db.host),
            ("database.name", &db.name),
        ] {
            if value.trim().is_empty() {
                return Err(ChatError::Config(format!("{} must not be empty", field)));
            }
        }

        if db.port == 0 {
            return Err(ChatError::Config("database.port must not be 0".to_string()));
        }

        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://")) {
            return Err(ChatError::Config(format!(
                "llm.base_url must be an http(s) URL, got {:?}",
                self.llm.base_url
            )));
        }

        if self.llm.timeout_seconds == 0 {
            return Err(ChatError::Config(
                "llm.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.conversation.max_context_turns == 0 {
            return Err(ChatError::Config(
                "conversation.max_context_turns must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
