//! Settings resolution for the CLI.
//!
//! Precedence, lowest first: built-in defaults, the TOML file
//! (`~/.build-kg/config.toml` unless `--config` names another), environment
//! variables (including any loaded from `.env`), then command-line flags.

use crate::error::{CliError, Result};
use buildkg_batch::BatchConfig;
use buildkg_extractor::ExtractorConfig;
use buildkg_graph::GraphConfig;
use buildkg_llm::{anthropic, openai, Provider, ProviderKind};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Domain profile name or path
    pub domain: String,

    /// Directory holding `{name}.yaml` profiles
    pub domains_dir: PathBuf,

    /// LLM provider settings
    pub llm: LlmSettings,

    /// PostgreSQL connection settings
    pub database: DatabaseSettings,

    /// Graph loading
    pub graph: GraphConfig,

    /// Online extraction
    pub extractor: ExtractorConfig,

    /// Batch artifacts and polling
    pub batch: BatchConfig,

    /// Enable colored output
    pub color: bool,
}

/// LLM provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `anthropic` or `openai`
    pub provider: String,

    /// Anthropic API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model
    pub anthropic_model: String,

    /// OpenAI API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// OpenAI model
    pub openai_model: String,
}

/// PostgreSQL connection settings.
///
/// `url` wins over the individual fields when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full connection URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Host
    pub host: String,

    /// Port
    pub port: u16,

    /// Database name
    pub name: String,

    /// User
    pub user: String,

    /// Password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            domain: "default".to_string(),
            domains_dir: PathBuf::from("./domains"),
            llm: LlmSettings::default(),
            database: DatabaseSettings::default(),
            graph: GraphConfig::default(),
            extractor: ExtractorConfig::default(),
            batch: BatchConfig::default(),
            color: true,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Anthropic.as_str().to_string(),
            anthropic_api_key: None,
            anthropic_model: anthropic::DEFAULT_MODEL.to_string(),
            openai_api_key: None,
            openai_model: openai::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "buildkg".to_string(),
            user: "buildkg".to_string(),
            password: None,
        }
    }
}

impl DatabaseSettings {
    /// Connection options for sqlx.
    ///
    /// `url` wins when set. Otherwise each field is passed separately, so the
    /// password needs no escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url
                .parse()
                .map_err(|e| CliError::Config(format!("Invalid DATABASE_URL: {}", e)));
        }
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

impl Settings {
    /// Default settings file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".build-kg").join("config.toml"))
    }

    /// Load settings from the TOML file, then apply the process environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Read settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::Config(format!(
                "Settings file not found: {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Override fields from environment variables.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(domain) = var("DOMAIN") {
            self.domain = domain;
        }
        if let Some(dir) = var("DOMAINS_DIR") {
            self.domains_dir = PathBuf::from(dir);
        }
        if let Some(provider) = var("LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }
        if let Some(model) = var("ANTHROPIC_MODEL") {
            self.llm.anthropic_model = model;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.llm.openai_model = model;
        }

        if let Some(url) = var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = var("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = var("DB_PORT") {
            self.database.port = parse_var("DB_PORT", &port)?;
        }
        if let Some(name) = var("DB_NAME") {
            self.database.name = name;
        }
        if let Some(user) = var("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = var("DB_PASSWORD") {
            self.database.password = Some(password);
        }

        if let Some(graph) = var("AGE_GRAPH_NAME") {
            self.graph.graph_name = graph;
        }
        if let Some(dir) = var("BATCH_DIR") {
            self.batch.output_dir = PathBuf::from(dir);
        }
        if let Some(size) = var("BATCH_SIZE") {
            self.extractor.batch_size = parse_var("BATCH_SIZE", &size)?;
        }
        if let Some(delay) = var("RATE_LIMIT_DELAY") {
            let secs: f64 = parse_var("RATE_LIMIT_DELAY", &delay)?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(CliError::Config(format!(
                    "RATE_LIMIT_DELAY must be a non-negative number of seconds, got '{}'",
                    delay
                )));
            }
            self.extractor.rate_limit_delay_ms = (secs * 1000.0).round() as u64;
        }
        Ok(())
    }

    /// Check that every credential the pipeline needs is present.
    ///
    /// Reports all missing values at once.
    pub fn validate(&self) -> Result<()> {
        self.require(true, true)
    }

    /// Check the credentials for the parts of the pipeline a command uses.
    pub fn require(&self, llm: bool, database: bool) -> Result<()> {
        let mut errors = Vec::new();

        if database && self.database.url.is_none() && self.database.password.is_none() {
            errors.push("DB_PASSWORD is required".to_string());
        }
        if llm {
            match self.llm.provider.parse::<ProviderKind>() {
                Ok(ProviderKind::Anthropic) if self.llm.anthropic_api_key.is_none() => {
                    errors.push("ANTHROPIC_API_KEY is required (LLM_PROVIDER=anthropic)".into())
                }
                Ok(ProviderKind::OpenAi) if self.llm.openai_api_key.is_none() => {
                    errors.push("OPENAI_API_KEY is required (LLM_PROVIDER=openai)".into())
                }
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }
        for section in [
            self.graph.validate(),
            self.extractor.validate(),
            self.batch.validate(),
        ] {
            if let Err(e) = section {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CliError::Config(format!(
                "Configuration errors: {}",
                errors.join(", ")
            )))
        }
    }

    /// Build the configured provider.
    pub fn provider(&self) -> Result<Provider> {
        let kind: ProviderKind = self.llm.provider.parse().map_err(CliError::Config)?;
        let (key, model) = match kind {
            ProviderKind::Anthropic => (&self.llm.anthropic_api_key, &self.llm.anthropic_model),
            ProviderKind::OpenAi => (&self.llm.openai_api_key, &self.llm.openai_model),
        };
        let key = key.clone().ok_or_else(|| {
            CliError::Config(format!("No API key configured for provider '{}'", kind))
        })?;
        Ok(Provider::new(kind, key, model.clone()))
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid {} '{}': {}", key, value, e)))
}
