//! LLM configuration parsed from environment variables.

use super::types::LlmError;
use crate::config::env_parse;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_LLM_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub openai_base_url: String,
    /// Upper bound on reply length. `None` leaves it to the provider.
    pub max_output_tokens: Option<u32>,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Read provider settings from the environment.
    ///
    /// The key itself is looked up indirectly: `LLM_API_KEY_ENV` names the
    /// variable that holds it (default `OPENAI_API_KEY`). `LLM_MODEL`,
    /// `LLM_OPENAI_BASE_URL`, `LLM_MAX_OUTPUT_TOKENS` and the two
    /// `LLM_*_TIMEOUT_SECS` values are optional.
    ///
    /// # Errors
    ///
    /// [`LlmError::MissingApiKey`] when the key is unset or blank;
    /// [`LlmError::ConfigParse`] when `LLM_MAX_OUTPUT_TOKENS` is not a number.
    pub fn from_env() -> Result<Self, LlmError> {
        let key_var = var_or("LLM_API_KEY_ENV", DEFAULT_LLM_API_KEY_ENV);
        let Some(api_key) = std::env::var(&key_var).ok().filter(|k| !k.trim().is_empty()) else {
            return Err(LlmError::MissingApiKey { var: key_var });
        };

        Ok(Self {
            api_key,
            model: var_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            openai_base_url: var_or("LLM_OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
            max_output_tokens: parse_max_output_tokens(std::env::var("LLM_MAX_OUTPUT_TOKENS").ok().as_deref())?,
            timeouts: LlmTimeouts {
                request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_max_output_tokens(raw: Option<&str>) -> Result<Option<u32>, LlmError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| LlmError::ConfigParse(format!("invalid LLM_MAX_OUTPUT_TOKENS: {value}")))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
