//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient::complete；
//! RetryingLlmClient 在任意后端外层加上请求超时与指数退避重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmSection;
use crate::llm::Message;

/// 模型调用失败的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("model unreachable: {0}")]
    Unreachable(String),

    #[error("model request timed out after {0}s")]
    Timeout(u64),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// 网络类错误值得重试；输出格式错误重试也无济于事
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Unreachable(_) | LlmError::Timeout(_) | LlmError::RateLimited { .. }
        )
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn from_section(section: &LlmSection) -> Self {
        Self {
            max_retries: section.retry.max_retries,
            initial_backoff: Duration::from_millis(section.retry.initial_backoff_ms),
            request_timeout: Duration::from_secs(section.timeouts.request),
        }
    }
}

/// 带超时与重试的客户端包装
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn attempt(&self, messages: &[Message]) -> Result<String, LlmError> {
        match tokio::time::timeout(self.config.request_timeout, self.inner.complete(messages)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.config.request_timeout.as_secs())),
        }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;
        loop {
            match self.attempt(messages).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let wait = match &e {
                        LlmError::RateLimited { retry_after_ms } => {
                            Duration::from_millis(*retry_after_ms).max(backoff)
                        }
                        _ => backoff,
                    };
                    tracing::warn!(attempt, error = %e, wait_ms = wait.as_millis() as u64, "LLM call failed, retrying");
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}
