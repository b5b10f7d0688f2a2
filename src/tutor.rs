#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use crate::{
    error::{GradingError, Stage},
    llm::{ChatMessage, LlmBackend},
    prompts::Prompts,
};

/// Student-facing chat tutor.
#[derive(Clone)]
pub struct Tutor {
    /// Model answering the student.
    llm:    Arc<dyn LlmBackend>,
    /// Persona sent as the system message.
    system: String,
}

impl Tutor {
    /// A tutor with the default encouraging persona.
    pub fn new(llm: Arc<dyn LlmBackend>, prompts: &Prompts) -> Self {
        Self {
            llm,
            system: prompts.tutor_system().to_owned(),
        }
    }

    /// A tutor using an assignment-specific persona, such as one produced by
    /// [`crate::authoring::generate_system_prompt`].
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Returns the persona sent as the system message.
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// Answers the last student turn of `history`.
    pub async fn reply(&self, history: &[ChatMessage]) -> Result<String, GradingError> {
        tracing::debug!("Tutor replying to a {}-turn conversation", history.len());
        self.llm
            .complete(&self.system, history)
            .await
            .map_err(|source| GradingError::Generation {
                stage: Stage::Tutor,
                source,
            })
    }
}
