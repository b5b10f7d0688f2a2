#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_openai::types::chat::ReasoningEffort;
use postgrest::Postgrest;
use reqwest::Client;

use crate::{
    llm::OpenAiBackend,
    prompts::Prompts,
    store::PostgrestStore,
};

/// Supabase credentials loaded from the environment, if available.
#[derive(Clone)]
pub struct SupabaseEnv {
    /// Fully qualified PostgREST endpoint.
    rest_endpoint: String,
    /// API key used for PostgREST requests.
    api_key:       String,
}

impl SupabaseEnv {
    /// Builds a Supabase credential bundle from environment-provided values.
    pub fn new(url: String, key: String) -> Self {
        let rest_endpoint = format!("{}/rest/v1", url.trim_end_matches('/'));
        Self {
            rest_endpoint,
            api_key: key,
        }
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`; `None` unless both are
    /// set and non-empty.
    fn from_env() -> Option<Self> {
        match (std::env::var("SUPABASE_URL").ok(), std::env::var("SUPABASE_ANON_KEY").ok()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some(Self::new(url.trim().to_owned(), key.trim().to_owned()))
            }
            _ => None,
        }
    }

    /// Returns the PostgREST endpoint.
    pub fn rest_endpoint(&self) -> &str {
        &self.rest_endpoint
    }

    /// Builds a PostgREST client authenticated with the anon key.
    pub fn client(&self) -> Postgrest {
        Postgrest::new(self.rest_endpoint.clone()).insert_header("apiKey", self.api_key.clone())
    }
}

/// Parses the optional reasoning-effort environment value into the OpenAI enum,
/// defaulting to `ReasoningEffort::Medium` when unset or unrecognised.
fn parse_reasoning_effort(val: Option<String>) -> ReasoningEffort {
    match val
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
        .unwrap_or("medium")
    {
        "low" => ReasoningEffort::Low,
        "high" => ReasoningEffort::High,
        _ => ReasoningEffort::Medium,
    }
}

/// OpenAI credentials and optional tuning parameters sourced from the
/// environment.
#[derive(Clone)]
pub struct OpenAiEnv {
    /// Base URL for the OpenAI-compatible API endpoint.
    api_base:         String,
    /// API key used to authenticate OpenAI requests.
    api_key:          String,
    /// Default model identifier for chat completions.
    model:            String,
    /// Optional temperature override, if provided.
    temperature:      Option<f32>,
    /// Optional top-p override, if provided.
    top_p:            Option<f32>,
    /// Reasoning effort hint to send with requests.
    reasoning_effort: ReasoningEffort,
}

impl OpenAiEnv {
    /// Creates a configuration with default sampling settings.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base:         api_base.into(),
            api_key:          api_key.into(),
            model:            model.into(),
            temperature:      None,
            top_p:            None,
            reasoning_effort: ReasoningEffort::Medium,
        }
    }

    /// Construct an `OpenAiEnv` from environment variables; returns `None` if
    /// any required field is missing.
    pub fn from_env() -> Option<Self> {
        let api_base = std::env::var("OPENAI_ENDPOINT").ok()?.trim().to_owned();
        let api_key = std::env::var("OPENAI_API_KEY").ok()?.trim().to_owned();
        let model = std::env::var("OPENAI_MODEL").ok()?.trim().to_owned();

        if api_base.is_empty() || api_key.is_empty() || model.is_empty() {
            return None;
        }

        let temperature = std::env::var("OPENAI_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse::<f32>().ok());
        let top_p = std::env::var("OPENAI_TOP_P")
            .ok()
            .and_then(|s| s.parse::<f32>().ok());
        let reasoning_effort =
            parse_reasoning_effort(std::env::var("OPENAI_REASONING_EFFORT").ok());

        Some(Self {
            api_base,
            api_key,
            model,
            temperature,
            top_p,
            reasoning_effort,
        })
    }

    /// Returns the API base URL used for OpenAI requests.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the API key used for OpenAI requests.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the default model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the configured temperature, if any.
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Returns the configured top_p, if any.
    pub fn top_p(&self) -> Option<f32> {
        self.top_p
    }

    /// Returns the reasoning effort level (defaults to Medium when
    /// unspecified).
    pub fn reasoning_effort(&self) -> ReasoningEffort {
        self.reasoning_effort.clone()
    }
}

/// Runtime configuration, built once by the binary and handed to whatever
/// needs it.
#[derive(Clone)]
pub struct Config {
    /// Supabase credentials, if configured.
    supabase:    Option<SupabaseEnv>,
    /// Cached OpenAI configuration, if available.
    openai:      Option<OpenAiEnv>,
    /// Optional model override for tutor chat.
    chat_model:  Option<String>,
    /// Shared reqwest HTTP client reused across network helpers.
    http_client: Client,
    /// Embedded prompt templates.
    prompts:     Arc<Prompts>,
}

impl Config {
    /// Reads the environment (call `dotenvy::dotenv()` first to pick up a
    /// `.env` file).
    pub fn from_env() -> Result<Self> {
        let http_client = Client::builder()
            // Avoid macOS dynamic store lookups that fail in sandboxed environments.
            .no_proxy()
            .build()
            .context("Failed to construct shared HTTP client")?;

        let chat_model = std::env::var("THINKINK_CHAT_MODEL")
            .ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        Ok(Self {
            supabase: SupabaseEnv::from_env(),
            openai: OpenAiEnv::from_env(),
            chat_model,
            http_client,
            prompts: Arc::new(Prompts::load()),
        })
    }

    /// Returns the Supabase credentials, if configured.
    pub fn supabase(&self) -> Option<&SupabaseEnv> {
        self.supabase.as_ref()
    }

    /// Returns the OpenAI configuration, if all required environment variables
    /// are present.
    pub fn openai(&self) -> Option<&OpenAiEnv> {
        self.openai.as_ref()
    }

    /// Returns a clone of the shared reqwest HTTP client.
    pub fn http_client(&self) -> Client {
        self.http_client.clone()
    }

    /// Returns the prompt templates.
    pub fn prompts(&self) -> Arc<Prompts> {
        Arc::clone(&self.prompts)
    }

    /// Builds the OpenAI backend, or explains which variables are missing.
    pub fn openai_backend(&self) -> Result<OpenAiBackend> {
        let env = self.openai.clone().ok_or_else(|| {
            anyhow!("OPENAI_ENDPOINT, OPENAI_API_KEY and OPENAI_MODEL must be set to call the LLM.")
        })?;
        Ok(OpenAiBackend::new(env, self.http_client()).with_chat_model(self.chat_model.clone()))
    }

    /// Builds the Supabase-backed assignment store, or explains which variables
    /// are missing.
    pub fn postgrest_store(&self) -> Result<PostgrestStore> {
        let supabase = self.supabase.as_ref().ok_or_else(|| {
            anyhow!("SUPABASE_URL and SUPABASE_ANON_KEY must be set to read assignments from Supabase.")
        })?;
        Ok(PostgrestStore::new(supabase.client()))
    }
}
