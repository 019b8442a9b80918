use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::prompt::stage_for_system_prompt;
use super::types::{GenerationOptions, LlmClient};
use super::GenerationError;
use crate::models::StageName;

/// Mock LLM client for testing: returns a configurable response.
pub struct MockLlmClient {
    response: String,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        Ok(self.response.clone())
    }
}

/// A call seen by [`ScriptedLlmClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub stage: Option<StageName>,
    pub prompt: String,
    pub options: GenerationOptions,
}

/// Test client with per-stage scripted replies.
///
/// Each stage has a queue; the last entry repeats once the queue drains.
/// Stages without a script get an empty JSON object.
#[derive(Default)]
pub struct ScriptedLlmClient {
    scripts: Mutex<HashMap<StageName, VecDeque<Result<String, GenerationError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, stage: StageName, response: &str) -> Self {
        self.push(stage, Ok(response.to_string()))
    }

    pub fn fail(self, stage: StageName, error: GenerationError) -> Self {
        self.push(stage, Err(error))
    }

    fn push(self, stage: StageName, entry: Result<String, GenerationError>) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(stage).or_default().push_back(entry);
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, stage: StageName) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.stage == Some(stage))
            .collect()
    }
}

impl LlmClient for ScriptedLlmClient {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let stage = stage_for_system_prompt(system);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                stage,
                prompt: prompt.to_string(),
                options: *options,
            });
        }

        let mut scripts = self
            .scripts
            .lock()
            .map_err(|_| GenerationError::HttpClient("script lock poisoned".into()))?;
        let queue = match stage {
            Some(s) => scripts.get_mut(&s),
            None => None,
        };
        match queue {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok("{}".to_string())),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok("{}".to_string())),
            None => Ok("{}".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::generation::prompt::system_prompt;

    fn opts() -> GenerationOptions {
        GenerationOptions::for_stage(StageName::Analysis)
    }

    #[test]
    fn scripted_queue_repeats_last_entry() {
        let client = ScriptedLlmClient::new()
            .fail(StageName::Analysis, GenerationError::Timeout(1))
            .reply(StageName::Analysis, "{\"summary\":\"ok\"}");
        let system = system_prompt(StageName::Analysis);

        assert!(client.generate("m", "p", &system, &opts()).is_err());
        assert_eq!(client.generate("m", "p", &system, &opts()).unwrap(), "{\"summary\":\"ok\"}");
        assert_eq!(client.generate("m", "p", &system, &opts()).unwrap(), "{\"summary\":\"ok\"}");
        assert_eq!(client.calls_for(StageName::Analysis).len(), 3);
    }

    #[test]
    fn unscripted_stage_gets_empty_object() {
        let client = ScriptedLlmClient::new();
        let system = system_prompt(StageName::TestData);
        assert_eq!(client.generate("m", "p", &system, &opts()).unwrap(), "{}");
        assert_eq!(client.calls()[0].stage, Some(StageName::TestData));
    }

    #[test]
    fn mock_returns_fixed_response() {
        let client = MockLlmClient::new("hello");
        assert_eq!(client.generate("m", "p", "s", &opts()).unwrap(), "hello");
    }
}
