#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The single seam between the pipeline and a hosted model.
//!
//! Every generator shapes a [`StructuredRequest`] (system prompt, user prompt
//! and a JSON schema derived from the Rust type it expects back), hands it to
//! an [`LlmBackend`], and runs the answer through [`decode`]. The backend is
//! trusted to either honour the schema or fail; anything that still does not
//! decode is reported as an upstream failure, never patched up.

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use schemars::{JsonSchema, r#gen::SchemaSettings};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    config::OpenAiEnv,
    error::{GradingError, LlmError, Stage},
};

/// One structured-output request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// System prompt.
    pub system:      String,
    /// User prompt.
    pub prompt:      String,
    /// Name reported to the backend for the output schema.
    pub schema_name: &'static str,
    /// JSON schema the answer must conform to.
    pub schema:      Value,
}

impl StructuredRequest {
    /// Builds a request whose output schema is derived from `T`.
    pub fn for_type<T: JsonSchema>(
        schema_name: &'static str,
        system: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            schema_name,
            schema: schema_for::<T>(),
        }
    }
}

/// Derives a self-contained JSON schema for `T` (subschemas inlined, no
/// `$ref`s), suitable for a structured-output request.
pub fn schema_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The student.
    User,
    /// The tutor.
    Assistant,
}

/// One turn of a tutoring conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it.
    pub role:    ChatRole,
    /// What was said.
    pub content: String,
}

impl ChatMessage {
    /// A student turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role:    ChatRole::User,
            content: content.into(),
        }
    }

    /// A tutor turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role:    ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A hosted model able to answer structured-output and chat requests.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Answers `request` with a value conforming to `request.schema`, or
    /// fails.
    async fn generate_structured(&self, request: StructuredRequest) -> Result<Value, LlmError>;

    /// Continues a free-text conversation.
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let _ = (system, messages);
        Err(LlmError::Api("this backend does not support chat completion".into()))
    }
}

/// Decodes a structured answer into `T`; a mismatch is reported against
/// `stage`.
pub fn decode<T: DeserializeOwned>(stage: Stage, value: Value) -> Result<T, GradingError> {
    serde_json::from_value(value).map_err(|source| GradingError::Decode { stage, source })
}

/// Sends `request` and decodes the answer into `T`.
pub(crate) async fn generate<T: DeserializeOwned>(
    llm: &dyn LlmBackend,
    stage: Stage,
    request: StructuredRequest,
) -> Result<T, GradingError> {
    tracing::debug!("Requesting {stage} ({})", request.schema_name);
    let value = match llm.generate_structured(request).await {
        Ok(value) => value,
        Err(source) => {
            tracing::warn!("Generating {stage} failed: {source}");
            return Err(GradingError::Generation { stage, source });
        }
    };
    decode(stage, value)
}

/// [`LlmBackend`] talking to an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Configured async-openai client.
    client:     OpenAIClient<OpenAIConfig>,
    /// Endpoint, model and sampling settings.
    env:        OpenAiEnv,
    /// Model used for tutor chat, when it differs from the grading model.
    chat_model: Option<String>,
}

impl OpenAiBackend {
    /// Creates a backend reusing the shared HTTP client.
    pub fn new(env: OpenAiEnv, http_client: reqwest::Client) -> Self {
        let client = OpenAIClient::with_config(
            OpenAIConfig::new()
                .with_api_base(env.api_base().to_owned())
                .with_api_key(env.api_key().to_owned()),
        )
        .with_http_client(http_client);

        Self {
            client,
            env,
            chat_model: None,
        }
    }

    /// Uses `model` instead of the grading model for tutor chat.
    pub fn with_chat_model(mut self, model: Option<String>) -> Self {
        self.chat_model = model;
        self
    }

    /// Sends a chat completion request and returns the first choice's content.
    async fn send(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .chat()
            .create(CreateChatCompletionRequest {
                model: model.to_owned(),
                messages,
                temperature: self.env.temperature(),
                top_p: self.env.top_p(),
                n: Some(1),
                reasoning_effort: Some(self.env.reasoning_effort()),
                response_format,
                ..Default::default()
            })
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn generate_structured(&self, request: StructuredRequest) -> Result<Value, LlmError> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt)
                .build()?
                .into(),
        ];

        let format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name:        request.schema_name.to_owned(),
                schema:      Some(request.schema),
                strict:      Some(false),
            },
        };

        let content = self.send(self.env.model(), messages, Some(format)).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let mut request: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_owned())
                .build()?
                .into()];

        for message in messages {
            request.push(match message.role {
                ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()?
                    .into(),
                ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()?
                    .into(),
            });
        }

        let model = self.chat_model.as_deref().unwrap_or(self.env.model());
        self.send(model, request, None).await
    }
}
