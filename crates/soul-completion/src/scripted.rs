//! Deterministic in-process completion double.
//!
//! Used by tests and offline runs. Replies are chosen by the first rule whose
//! marker appears in the request's system prompt.

use async_trait::async_trait;
use soul_monitor::UsageCounters;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::trace;

use crate::error::CompletionError;
use crate::service::{Completion, CompletionRequest, CompletionService};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fault(String),
}

#[derive(Debug, Clone)]
struct Rule {
    marker: String,
    reply: Reply,
    delay: Duration,
}

/// Scripted [`CompletionService`].
///
/// ```rust
/// use soul_completion::ScriptedCompletion;
///
/// let svc = ScriptedCompletion::new()
///     .on("You are Manas", r#"{"response": "steady", "confidence": 0.8}"#)
///     .fail_on("You are Buddhi", "connection reset");
/// assert_eq!(svc.calls(), 0);
/// ```
#[derive(Debug)]
pub struct ScriptedCompletion {
    rules: Vec<Rule>,
    fallback: Reply,
    usage: UsageCounters,
    requests: Mutex<Vec<CompletionRequest>>,
    completed: AtomicUsize,
}

impl Default for ScriptedCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCompletion {
    /// Creates a double that answers `{}` to every prompt.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::Text("{}".to_string()),
            usage: UsageCounters::new(10, 5, 0, 0),
            requests: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    /// Replies with `text` when the system prompt contains `marker`.
    pub fn on(self, marker: impl Into<String>, text: impl Into<String>) -> Self {
        self.on_delayed(marker, text, Duration::ZERO)
    }

    /// Like [`on`](Self::on), answering only after `delay`.
    pub fn on_delayed(
        mut self,
        marker: impl Into<String>,
        text: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.rules.push(Rule {
            marker: marker.into(),
            reply: Reply::Text(text.into()),
            delay,
        });
        self
    }

    /// Fails with a request fault when the system prompt contains `marker`.
    pub fn fail_on(self, marker: impl Into<String>, message: impl Into<String>) -> Self {
        self.fail_on_delayed(marker, message, Duration::ZERO)
    }

    /// Like [`fail_on`](Self::fail_on), failing only after `delay`.
    pub fn fail_on_delayed(
        mut self,
        marker: impl Into<String>,
        message: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.rules.push(Rule {
            marker: marker.into(),
            reply: Reply::Fault(message.into()),
            delay,
        });
        self
    }

    /// Text returned when no rule matches.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Reply::Text(text.into());
        self
    }

    /// Usage reported by every call.
    pub fn with_usage(mut self, usage: UsageCounters) -> Self {
        self.usage = usage;
        self
    }

    /// Number of calls that ran to completion (success or scripted fault).
    ///
    /// Calls cancelled while waiting on their delay are not counted.
    pub fn calls(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Number of calls started, including cancelled ones.
    pub fn started(&self) -> usize {
        self.lock_requests().len()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock_requests().clone()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn select(&self, system_prompt: &str) -> (Reply, Duration) {
        self.rules
            .iter()
            .find(|rule| system_prompt.contains(&rule.marker))
            .map(|rule| (rule.reply.clone(), rule.delay))
            .unwrap_or_else(|| (self.fallback.clone(), Duration::ZERO))
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let (reply, delay) = self.select(&request.system_prompt);
        self.lock_requests().push(request);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        trace!(calls = self.calls(), "scripted completion answered");

        match reply {
            Reply::Text(text) => Ok(Completion {
                text,
                usage: self.usage,
            }),
            Reply::Fault(message) => Err(CompletionError::Request(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let svc = ScriptedCompletion::new()
            .on("alpha", "first")
            .on("alpha beta", "second");
        let out = svc
            .complete(CompletionRequest::new("alpha beta gamma", "hi"))
            .await
            .unwrap();
        assert_eq!(out.text, "first");
    }

    #[tokio::test]
    async fn test_fallback_and_usage() {
        let svc = ScriptedCompletion::new()
            .with_fallback("plain")
            .with_usage(UsageCounters::new(1, 2, 3, 4));
        let out = svc
            .complete(CompletionRequest::new("anything", "hi"))
            .await
            .unwrap();
        assert_eq!(out.text, "plain");
        assert_eq!(out.usage, UsageCounters::new(1, 2, 3, 4));
        assert_eq!(svc.calls(), 1);
        assert_eq!(svc.requests()[0].user_message, "hi");
    }

    #[tokio::test]
    async fn test_fault_is_request_error() {
        let svc = ScriptedCompletion::new().fail_on("doomed", "boom");
        let err = svc
            .complete(CompletionRequest::new("doomed prompt", "hi"))
            .await
            .unwrap_err();
        assert!(err.is_completion_fault());
        assert!(err.to_string().contains("boom"));
        assert_eq!(svc.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_not_counted() {
        let svc = std::sync::Arc::new(
            ScriptedCompletion::new().on_delayed("slow", "{}", Duration::from_secs(5)),
        );
        let task = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.complete(CompletionRequest::new("slow", "hi")).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(svc.started(), 1);
        assert_eq!(svc.calls(), 0);
    }
}
