//! NEL Configuration Management
//!
//! Handles configuration from TOML files and environment variables with
//! defaults suitable for English POS-tagged input.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::primary_subtag;
use crate::text::LexicalCategory;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Linking algorithm settings
    pub linker: EntityLinkerConfig,

    /// Per-language span selection settings
    pub processing: ProcessingConfig,

    /// Search backend settings
    pub search: SearchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_parse::<usize>("NEL_MIN_FOUND_TOKENS")? {
            self.linker.min_found_tokens = value;
        }
        if let Some(value) = env_parse::<usize>("NEL_MAX_SUGGESTIONS")? {
            self.linker.max_suggestions = value;
        }
        if let Some(value) = env_parse::<RedirectProcessingMode>("NEL_REDIRECT_MODE")? {
            self.linker.redirect_mode = value;
        }
        if let Some(value) = env_parse::<bool>("NEL_CASE_SENSITIVE")? {
            self.linker.case_sensitive = value;
        }
        if let Ok(language) = std::env::var("NEL_DEFAULT_LANGUAGE") {
            self.linker.default_language = Some(language).filter(|l| !l.is_empty());
        }
        if let Some(value) = env_parse::<u64>("NEL_SEARCH_TIMEOUT_SECS")? {
            self.search.timeout_secs = value;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(value) = env_parse::<bool>("LOG_JSON")? {
            self.logging.json_format = value;
        }

        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.linker.validate()?;
        self.processing.default.validate()?;
        for (language, config) in &self.processing.languages {
            config.validate().map_err(|e| match e {
                ConfigError::InvalidValue { key, value } => ConfigError::InvalidValue {
                    key: format!("processing.languages.{language}.{key}"),
                    value,
                },
                other => other,
            })?;
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

// ============================================================================
// Linker
// ============================================================================

/// How redirect links on candidate entities are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectProcessingMode {
    /// Use candidates as found
    #[default]
    Ignore,
    /// Replace a candidate by its redirect target
    Follow,
    /// Emit both the candidate and its redirect target
    Add,
}

impl std::fmt::Display for RedirectProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Follow => write!(f, "follow"),
            Self::Add => write!(f, "add"),
        }
    }
}

impl std::str::FromStr for RedirectProcessingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "follow" => Ok(Self::Follow),
            "add" => Ok(Self::Add),
            _ => Err(ConfigError::InvalidValue {
                key: "redirect_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Immutable settings for one linking run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityLinkerConfig {
    /// Minimum number of query tokens a label must contain
    pub min_found_tokens: usize,

    /// Redirect handling
    pub redirect_mode: RedirectProcessingMode,

    /// Maximum suggestions per linked entity
    pub max_suggestions: usize,

    /// Compare tokens and labels case-sensitively
    pub case_sensitive: bool,

    /// Tokens shorter than this (in chars) are not used for matching
    pub min_search_token_length: usize,

    /// Number of candidates requested from the searcher
    pub max_search_results: Option<usize>,

    /// Label language used when an entity has no label in the text language
    pub default_language: Option<String>,

    /// Entity type -> output type; "*" passes unmapped types through
    pub type_mappings: BTreeMap<String, String>,
}

impl Default for EntityLinkerConfig {
    fn default() -> Self {
        Self {
            min_found_tokens: 2,
            redirect_mode: RedirectProcessingMode::Ignore,
            max_suggestions: 3,
            case_sensitive: false,
            min_search_token_length: 3,
            max_search_results: None,
            default_language: None,
            type_mappings: BTreeMap::new(),
        }
    }
}

impl EntityLinkerConfig {
    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_found_tokens < 1 {
            return Err(ConfigError::InvalidValue {
                key: "linker.min_found_tokens".to_string(),
                value: self.min_found_tokens.to_string(),
            });
        }
        if self.max_suggestions < 1 {
            return Err(ConfigError::InvalidValue {
                key: "linker.max_suggestions".to_string(),
                value: self.max_suggestions.to_string(),
            });
        }
        if self.max_search_results == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "linker.max_search_results".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Number of candidates to request from the searcher
    pub fn search_limit(&self) -> usize {
        self.max_search_results
            .unwrap_or_else(|| self.max_suggestions.saturating_mul(3).max(10))
    }

    /// Normalize text for comparison: collapse whitespace and fold case
    /// unless matching is case-sensitive
    pub fn normalize(&self, text: &str) -> String {
        if self.case_sensitive {
            collapse_whitespace(text)
        } else {
            Self::result_key(text)
        }
    }

    /// Key of a selected text in a linking result: whitespace collapsed
    /// and case folded regardless of `case_sensitive`
    pub fn result_key(text: &str) -> String {
        collapse_whitespace(text).to_lowercase()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Language Processing
// ============================================================================

fn default_linked_categories() -> BTreeSet<LexicalCategory> {
    BTreeSet::from([LexicalCategory::Noun])
}

/// Span selection settings for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageProcessingConfig {
    /// POS tags that make a token linkable
    pub linked_pos: BTreeSet<String>,

    /// Lexical categories that make a token linkable
    pub linked_lexical_categories: BTreeSet<LexicalCategory>,

    /// Group tokens by eligibility alone, ignoring chunk boundaries
    pub ignore_chunks: bool,

    /// POS annotations below this probability are not used
    pub min_pos_probability: f32,

    /// Treat capitalized tokens without usable POS annotation as linkable
    pub link_upper_case_tokens: bool,
}

impl Default for LanguageProcessingConfig {
    fn default() -> Self {
        Self {
            linked_pos: BTreeSet::new(),
            linked_lexical_categories: default_linked_categories(),
            ignore_chunks: false,
            min_pos_probability: 0.75,
            link_upper_case_tokens: false,
        }
    }
}

impl LanguageProcessingConfig {
    /// Whether any token-level eligibility rule is configured
    pub fn has_token_rules(&self) -> bool {
        !self.linked_pos.is_empty()
            || !self.linked_lexical_categories.is_empty()
            || self.link_upper_case_tokens
    }

    /// Validate that span selection is not vacuous
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_pos_probability) {
            return Err(ConfigError::InvalidValue {
                key: "min_pos_probability".to_string(),
                value: self.min_pos_probability.to_string(),
            });
        }
        if self.ignore_chunks && !self.has_token_rules() {
            return Err(ConfigError::MissingRequired(
                "linked_pos or linked_lexical_categories when chunks are ignored".to_string(),
            ));
        }
        Ok(())
    }
}

/// Span selection settings for all languages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Used for languages without their own entry
    pub default: LanguageProcessingConfig,

    /// Language tag -> settings
    pub languages: HashMap<String, LanguageProcessingConfig>,
}

impl ProcessingConfig {
    /// Settings for a language: exact tag, then primary subtag, then default
    pub fn for_language(&self, language: &str) -> &LanguageProcessingConfig {
        self.languages
            .get(language)
            .or_else(|| self.languages.get(primary_subtag(language)))
            .unwrap_or(&self.default)
    }
}

// ============================================================================
// Search
// ============================================================================

/// Search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Timeout for a single searcher call in seconds
    pub timeout_secs: u64,

    /// Maximum number of cached searcher responses
    pub cache_capacity: u64,

    /// Time-to-live of cached responses in seconds
    pub cache_ttl_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            cache_capacity: 1_000,
            cache_ttl_secs: 300,
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
