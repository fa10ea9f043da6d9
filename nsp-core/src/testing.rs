//! Testing utilities.
//!
//! `MockModel` is an [`AnswerModel`] that returns scripted replies, for
//! deterministic evaluation tests without API calls.

use crate::query::{AnswerModel, QueryError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A scripted reply from the mock model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Text(String),
    Transient(String),
    Terminal(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        MockReply::Transient(message.into())
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        MockReply::Terminal(message.into())
    }

    fn into_result(self) -> Result<String, QueryError> {
        match self {
            MockReply::Text(text) => Ok(text),
            MockReply::Transient(message) => Err(QueryError::Transient(message)),
            MockReply::Terminal(message) => Err(QueryError::Terminal(message)),
        }
    }
}

/// A model that replays scripted replies in order.
///
/// Once the script runs out it returns the fallback reply, or a terminal error
/// if none was set.
pub struct MockModel {
    name: String,
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockModel {
    /// Create a mock with scripted replies.
    pub fn new(name: impl Into<String>, replies: Vec<MockReply>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(replies.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock that always answers with `text`.
    pub fn constant(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Vec::new()).with_fallback(MockReply::text(text))
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Number of queries received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnswerModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, prompt: &str) -> Result<String, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());

        match next.or_else(|| self.fallback.clone()) {
            Some(reply) => reply.into_result(),
            None => Err(QueryError::Terminal(format!(
                "{} has no more scripted replies",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let model = MockModel::new("gpt", vec![MockReply::text("A"), MockReply::transient("503")]);
        assert_eq!(model.query("one").await, Ok("A".to_string()));
        assert_eq!(model.query("two").await, Err(QueryError::Transient("503".to_string())));
        assert!(matches!(model.query("three").await, Err(QueryError::Terminal(_))));
        assert_eq!(model.calls(), 3);
        assert_eq!(model.prompts(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_constant_model() {
        let model = MockModel::constant("llama", "B");
        for _ in 0..3 {
            assert_eq!(model.query("p").await, Ok("B".to_string()));
        }
    }
}
