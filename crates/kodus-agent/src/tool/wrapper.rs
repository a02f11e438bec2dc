//! Composable tool wrappers (spec SPEC_FULL §F.3), grounded in
//! `restflow-ai/src/tools/wrapper.rs`'s `ToolWrapper`/`LoggingWrapper` decorators.

use crate::scratchpad::Scratchpad;
use async_trait::async_trait;
use kodus_traits::tool::ToolExecutor;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[async_trait]
pub trait ToolWrapper: Send + Sync {
    fn wrapper_name(&self) -> &str;
    async fn wrap_execute(&self, tool_name: &str, input: Value, next: &dyn ToolExecutor) -> anyhow::Result<Value>;
}

pub struct TimeoutWrapper {
    timeout: Duration,
}

impl TimeoutWrapper {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolWrapper for TimeoutWrapper {
    fn wrapper_name(&self) -> &str {
        "timeout"
    }

    async fn wrap_execute(&self, tool_name: &str, input: Value, next: &dyn ToolExecutor) -> anyhow::Result<Value> {
        tokio::time::timeout(self.timeout, next.execute(input))
            .await
            .map_err(|_| anyhow::anyhow!("tool `{tool_name}` timed out"))?
    }
}

pub struct RateLimitWrapper {
    min_interval: Duration,
    last_call: parking_lot::Mutex<Option<Instant>>,
}

impl RateLimitWrapper {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: parking_lot::Mutex::new(None),
        }
    }
}

#[async_trait]
impl ToolWrapper for RateLimitWrapper {
    fn wrapper_name(&self) -> &str {
        "rate_limit"
    }

    async fn wrap_execute(&self, _tool_name: &str, input: Value, next: &dyn ToolExecutor) -> anyhow::Result<Value> {
        let wait = {
            let mut last_call = self.last_call.lock();
            let wait = last_call
                .map(|t| self.min_interval.saturating_sub(t.elapsed()))
                .unwrap_or_default();
            *last_call = Some(Instant::now());
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        next.execute(input).await
    }
}

/// Logs tool start/finish into the shared scratchpad (spec SPEC_FULL §F.2
/// names the scratchpad; this wrapper is its only writer on the tool path).
pub struct LoggingWrapper {
    scratchpad: Arc<Scratchpad>,
    iteration: usize,
}

impl LoggingWrapper {
    pub fn new(scratchpad: Arc<Scratchpad>, iteration: usize) -> Self {
        Self { scratchpad, iteration }
    }
}

#[async_trait]
impl ToolWrapper for LoggingWrapper {
    fn wrapper_name(&self) -> &str {
        "logging"
    }

    async fn wrap_execute(&self, tool_name: &str, input: Value, next: &dyn ToolExecutor) -> anyhow::Result<Value> {
        self.scratchpad
            .append(self.iteration, "tool_start", json!({"tool": tool_name, "input": input}));
        let start = Instant::now();
        let result = next.execute(input).await;
        match &result {
            Ok(output) => self.scratchpad.append(
                self.iteration,
                "tool_end",
                json!({"tool": tool_name, "elapsed_ms": start.elapsed().as_millis(), "output": output}),
            ),
            Err(err) => self.scratchpad.append(
                self.iteration,
                "tool_error",
                json!({"tool": tool_name, "elapsed_ms": start.elapsed().as_millis(), "error": err.to_string()}),
            ),
        }
        result
    }
}

/// Wraps `inner` with a chain of wrappers, outermost first.
pub struct WrappedTool {
    inner: Arc<dyn ToolExecutor>,
    chain: Vec<Arc<dyn ToolWrapper>>,
}

impl WrappedTool {
    pub fn new(inner: Arc<dyn ToolExecutor>, chain: Vec<Arc<dyn ToolWrapper>>) -> Self {
        Self { inner, chain }
    }

    pub async fn execute(&self, tool_name: &str, input: Value) -> anyhow::Result<Value> {
        self.run(tool_name, input, 0).await
    }

    fn run<'a>(
        &'a self,
        tool_name: &'a str,
        input: Value,
        index: usize,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<Value>> + Send + 'a>> {
        Box::pin(async move {
            match self.chain.get(index) {
                Some(wrapper) => {
                    let next = RemainingChain {
                        tool: self,
                        tool_name,
                        index: index + 1,
                    };
                    wrapper.wrap_execute(tool_name, input, &next).await
                }
                None => self.inner.execute(input).await,
            }
        })
    }
}

struct RemainingChain<'a> {
    tool: &'a WrappedTool,
    tool_name: &'a str,
    index: usize,
}

#[async_trait]
impl<'a> ToolExecutor for RemainingChain<'a> {
    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        self.tool.run(self.tool_name, input, self.index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodus_traits::tool::ToolExecutor;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        async fn execute(&self, input: Value) -> anyhow::Result<Value> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn timeout_wrapper_passes_through_fast_calls() {
        let tool = WrappedTool::new(Arc::new(Echo), vec![Arc::new(TimeoutWrapper::new(Duration::from_secs(1)))]);
        let result = tool.execute("echo", json!({"a": 1})).await.unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    struct Slow;

    #[async_trait]
    impl ToolExecutor for Slow {
        async fn execute(&self, _input: Value) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn timeout_wrapper_aborts_slow_calls() {
        let tool = WrappedTool::new(Arc::new(Slow), vec![Arc::new(TimeoutWrapper::new(Duration::from_millis(10)))]);
        let result = tool.execute("slow", Value::Null).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn logging_wrapper_records_start_and_end() {
        let scratchpad = Arc::new(Scratchpad::new(16));
        let tool = WrappedTool::new(Arc::new(Echo), vec![Arc::new(LoggingWrapper::new(scratchpad.clone(), 0))]);
        tool.execute("echo", json!({})).await.unwrap();
        let entries = scratchpad.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, "tool_start");
        assert_eq!(entries[1].event_type, "tool_end");
    }
}
