use std::sync::Arc;

use serde::Serialize;

use super::GenerationError;
use crate::models::StageName;

/// Sampling temperature used for every stage.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Per-call generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationOptions {
    /// Token budget sized to what each stage typically emits.
    pub fn for_stage(stage: StageName) -> Self {
        let max_tokens = match stage {
            StageName::Analysis => 4_000,
            StageName::UserStories => 8_000,
            StageName::TestCases => 16_000,
            StageName::TestData => 12_000,
        };
        Self {
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Generative backend abstraction (allows mocking)
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;

    /// Confirm `model` can be served. Backends without a model listing accept anything.
    fn check_model(&self, _model: &str) -> Result<(), GenerationError> {
        Ok(())
    }
}

/// Allow a shared client to be handed to the orchestrator while the caller
/// keeps a handle.
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        (**self).generate(model, prompt, system, options)
    }

    fn check_model(&self, model: &str) -> Result<(), GenerationError> {
        (**self).check_model(model)
    }
}
