//! Runtime settings, read from the environment at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clinisim_llm::budget::TokenEstimator;
use clinisim_llm::synth::SynthesisSettings;
use clinisim_sessions::relay::RelaySettings;
use eyre::{WrapErr, bail, eyre};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    S3,
    Memory,
}

impl FromStr for StoreKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(StoreKind::S3),
            "memory" => Ok(StoreKind::Memory),
            other => Err(eyre!("CLINISIM_STORE must be s3 or memory, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub store: StoreKind,
    pub bucket: String,
    pub cases_dir: Option<PathBuf>,
    pub intent_ordering: bool,

    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_context_len: u32,
    pub min_reply_tokens: u32,
    pub history_turns: usize,
    pub tokenizer_path: Option<PathBuf>,

    pub case_gen_max_tokens: u32,
    pub case_gen_temperature: f32,
    pub case_gen_retries: u32,
}

impl Settings {
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable source. Unset and blank variables
    /// take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or_default = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let settings = Settings {
            bind: or_default("CLINISIM_BIND", "0.0.0.0:8080"),
            store: or_default("CLINISIM_STORE", "s3").parse()?,
            bucket: or_default("CLINISIM_BUCKET", "clinisim"),
            cases_dir: var("CLINISIM_CASES_DIR").map(PathBuf::from),
            intent_ordering: parse_var(&var, "CLINISIM_INTENT_ORDERING", true)?,

            llm_base_url: var("LLM_BASE_URL").ok_or_else(|| eyre!("LLM_BASE_URL is required"))?,
            llm_model: var("LLM_MODEL").ok_or_else(|| eyre!("LLM_MODEL is required"))?,
            llm_api_key: var("LLM_API_KEY"),
            llm_timeout: Duration::from_secs(parse_var(&var, "LLM_TIMEOUT_SECS", 60)?),
            max_tokens: parse_var(&var, "LLM_MAX_TOKENS", 500)?,
            temperature: parse_var(&var, "LLM_TEMPERATURE", 0.7)?,
            max_context_len: parse_var(&var, "LLM_MAX_CONTEXT_LEN", 1024)?,
            min_reply_tokens: parse_var(&var, "LLM_MIN_REPLY_TOKENS", 16)?,
            history_turns: parse_var(&var, "LLM_HISTORY_TURNS", 20)?,
            tokenizer_path: var("LLM_TOKENIZER_PATH").map(PathBuf::from),

            case_gen_max_tokens: parse_var(&var, "LLM_CASE_GEN_MAX_TOKENS", 1200)?,
            case_gen_temperature: parse_var(&var, "LLM_CASE_GEN_TEMPERATURE", 0.8)?,
            case_gen_retries: parse_var(&var, "LLM_CASE_GEN_RETRIES", 2)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> eyre::Result<()> {
        for (name, t) in [
            ("LLM_TEMPERATURE", self.temperature),
            ("LLM_CASE_GEN_TEMPERATURE", self.case_gen_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                bail!("{name} must be between 0 and 2, got {t}");
            }
        }
        if self.max_context_len <= self.min_reply_tokens {
            bail!(
                "LLM_MAX_CONTEXT_LEN ({}) must exceed LLM_MIN_REPLY_TOKENS ({})",
                self.max_context_len,
                self.min_reply_tokens
            );
        }
        if self.max_tokens == 0 || self.case_gen_max_tokens == 0 {
            bail!("token limits must be positive");
        }
        if self.store == StoreKind::S3 && self.bucket.trim().is_empty() {
            bail!("CLINISIM_BUCKET is required for the s3 store");
        }
        Ok(())
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            window: self.max_context_len,
            max_reply_tokens: self.max_tokens,
            min_reply_tokens: self.min_reply_tokens,
            temperature: self.temperature,
            history_turns: self.history_turns,
        }
    }

    pub fn synthesis_settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            temperature: self.case_gen_temperature,
            max_tokens: self.case_gen_max_tokens,
            retries: self.case_gen_retries,
        }
    }

    /// The model's tokenizer when one is configured, otherwise the
    /// character heuristic.
    pub fn estimator(&self) -> eyre::Result<TokenEstimator> {
        match &self.tokenizer_path {
            Some(path) => TokenEstimator::from_file(path)
                .wrap_err_with(|| format!("loading tokenizer from {}", path.display())),
            None => Ok(TokenEstimator::Heuristic),
        }
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> eyre::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("{name} has invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}
