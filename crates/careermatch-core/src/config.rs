//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`). Every section has defaults, so an empty
//! directory still yields a usable `Settings`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(dir, &env_name)
    }

    pub fn load_for_env(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self::from_figment(figment, dir, env_name);
        config.validate_for_env()?;
        Ok(config)
    }

    /// Wrap an already assembled figment. Relative paths resolve against `base_dir`.
    pub fn from_figment(figment: Figment, base_dir: &Path, env_name: &str) -> Self {
        Self { figment, base_dir: base_dir.to_path_buf(), env_name: env_name.to_string() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// All typed sections, with defaults for anything not configured.
    pub fn settings(&self) -> Result<Settings> {
        self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn resolve_path<S: AsRef<str>>(&self, p: S) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }

    fn validate_for_env(&self) -> Result<()> {
        let settings = self.settings()?;
        settings.validate()?;
        settings.validate_for_env(&self.env_name, use_fake_embeddings())
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1` (or `true`) forces the hashing embedder
/// regardless of configuration. Production configs refuse it.
pub fn use_fake_embeddings() -> bool {
    env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub matcher: MatchSettings,
    pub narrative: NarrativeSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.index.build_concurrency == 0 {
            return Err(Error::InvalidConfig("index.build_concurrency must be at least 1".into()));
        }
        if self.narrative.concurrency == 0 {
            return Err(Error::InvalidConfig("narrative.concurrency must be at least 1".into()));
        }
        if self.matcher.max_k == 0 || self.matcher.default_k > self.matcher.max_k {
            return Err(Error::InvalidConfig(format!(
                "matcher.default_k ({}) must be within 1..=matcher.max_k ({})",
                self.matcher.default_k, self.matcher.max_k
            )));
        }
        if self.embedding.provider == EmbeddingBackend::Hash && self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        Ok(())
    }

    /// Environment-specific rules. `fake_embeddings` is the
    /// `APP_USE_FAKE_EMBEDDINGS` override, which selects the hashing
    /// embedder just like `embedding.provider = "hash"`.
    pub fn validate_for_env(&self, env_name: &str, fake_embeddings: bool) -> Result<()> {
        match env_name {
            "prod" | "production" => {
                if fake_embeddings {
                    return Err(Error::InvalidConfig(
                        "APP_USE_FAKE_EMBEDDINGS is set; the hashing embedder cannot serve production".into(),
                    ));
                }
                if self.embedding.provider == EmbeddingBackend::Hash {
                    return Err(Error::InvalidConfig(
                        "the hashing embedder is a test double and cannot serve production".into(),
                    ));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// JSON file or directory of JSON files.
    pub path: Option<String>,
    /// Use the built-in sample jobs when `path` does not exist.
    pub fallback_to_samples: bool,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self { path: Some("data/sample_jobs.json".to_string()), fallback_to_samples: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hash,
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub model: String,
    /// Only used by the hashing embedder; remote models report their own.
    pub dimension: usize,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::OpenAi,
            model: "text-embedding-ada-002".to_string(),
            dimension: 1024,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// What a rebuild does with vectors computed by earlier builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildPolicy {
    /// Call the provider for every document on every build.
    #[default]
    AlwaysReembed,
    /// Reuse in-process vectors keyed by provider id and content hash.
    ReuseCached,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub build_concurrency: usize,
    pub rebuild_policy: RebuildPolicy,
    pub show_progress: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { build_concurrency: 4, rebuild_policy: RebuildPolicy::default(), show_progress: false }
    }
}

/// How cosine scores are reported. Ranking always uses the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    #[default]
    Raw,
    ClampNonNegative,
}

impl ScorePolicy {
    pub fn apply(self, score: f32) -> f32 {
        match self {
            Self::Raw => score,
            Self::ClampNonNegative => score.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub default_k: usize,
    pub max_k: usize,
    pub score_policy: ScorePolicy,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self { default_k: 5, max_k: 50, score_policy: ScorePolicy::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeBackend {
    OpenAi,
    /// Deterministic sentence built from the score, no external call.
    Template,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrativeSettings {
    pub enabled: bool,
    pub provider: NarrativeBackend,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub query_excerpt_chars: usize,
}

impl NarrativeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: NarrativeBackend::OpenAi,
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            concurrency: 4,
            timeout_ms: 20_000,
            max_tokens: 200,
            temperature: 0.3,
            query_excerpt_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), ansi: true }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
