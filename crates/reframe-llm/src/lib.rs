//! Reframe LLM Provider Layer
//!
//! Pluggable generator implementations behind the `GenerationPort` trait.
//!
//! # Architecture
//!
//! This crate provides implementations of the `GenerationPort` trait from
//! `reframe-domain`. Every provider receives the full conversation history
//! and returns a single completion.
//!
//! # Providers
//!
//! - `MockProvider`: Scripted, deterministic mock for testing
//! - `OllamaProvider`: Local Ollama chat API integration
//!
//! # Examples
//!
//! ```
//! use reframe_llm::MockProvider;
//! use reframe_domain::ChatMessage;
//! use reframe_domain::traits::GenerationPort;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate(&[ChatMessage::user("test prompt")]).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod ollama;

use reframe_domain::traits::GenerationPort;
use reframe_domain::ChatMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use ollama::{OllamaProvider, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// One scripted reply of a [`MockProvider`]
#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Scripted>,
    calls: Vec<Vec<ChatMessage>>,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are served from a FIFO script; once the script is exhausted the
/// default response is returned for every further call. Every history the
/// provider receives is recorded so tests can inspect what was sent.
///
/// # Examples
///
/// ```
/// use reframe_llm::MockProvider;
/// use reframe_domain::ChatMessage;
/// use reframe_domain::traits::GenerationPort;
///
/// let provider = MockProvider::default()
///     .with_response("first")
///     .with_response("second");
/// let history = [ChatMessage::user("prompt")];
///
/// assert_eq!(provider.generate(&history).unwrap(), "first");
/// assert_eq!(provider.generate(&history).unwrap(), "second");
/// assert_eq!(provider.generate(&history).unwrap(), "Default mock response");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all calls
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Queue a reply to be returned by the next unscripted call
    pub fn push_response(&self, response: impl Into<String>) {
        self.lock().script.push_back(Scripted::Reply(response.into()));
    }

    /// Queue a provider failure
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock().script.push_back(Scripted::Fail(message.into()));
    }

    /// Builder-style variant of [`push_response`](Self::push_response)
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.push_response(response);
        self
    }

    /// Builder-style variant of [`push_error`](Self::push_error)
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push_error(message);
        self
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Every history passed to generate, oldest call first
    pub fn received_histories(&self) -> Vec<Vec<ChatMessage>> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn reset_call_count(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded calls
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl GenerationPort for MockProvider {
    type Error = LlmError;

    fn generate(&self, history: &[ChatMessage]) -> Result<String, Self::Error> {
        let mut state = self.lock();
        state.calls.push(history.to_vec());

        match state.script.pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(LlmError::Other(message)),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Vec<ChatMessage> {
        vec![ChatMessage::user("any prompt")]
    }

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate(&prompt());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Test response");
    }

    #[test]
    fn test_mock_provider_script_order() {
        let provider = MockProvider::default();
        provider.push_response("one");
        provider.push_response("two");

        assert_eq!(provider.generate(&prompt()).unwrap(), "one");
        assert_eq!(provider.generate(&prompt()).unwrap(), "two");
        assert_eq!(provider.generate(&prompt()).unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate(&prompt()).unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate(&prompt()).unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let provider = MockProvider::default().with_error("connection reset");

        let result = provider.generate(&prompt());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));
    }

    #[test]
    fn test_mock_provider_records_histories() {
        let provider = MockProvider::new("ok");
        provider.generate(&prompt()).unwrap();

        let longer = vec![
            ChatMessage::user("p"),
            ChatMessage::assistant("r"),
            ChatMessage::user("fix it"),
        ];
        provider.generate(&longer).unwrap();

        let seen = provider.received_histories();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], longer);
    }

    #[test]
    fn test_mock_provider_clone() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate(&prompt()).unwrap();

        // Both should share the same call log due to Arc
        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}
