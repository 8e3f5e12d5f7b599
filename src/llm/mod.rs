//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、提示词模板与模型网关

pub mod deepseek;
pub mod gateway;
pub mod message;
pub mod mock;
pub mod openai;
pub mod prompts;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use gateway::ModelGateway;
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use prompts::{prompt_vars, PromptKind, PromptVars};
pub use traits::{LlmClient, LlmError, RetryConfig, RetryingLlmClient};

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock），并包上超时与重试
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();

    let backend: Arc<dyn LlmClient> = if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient);
    } else if provider == "deepseek" && (has_deepseek_key || has_openai_key) {
        Arc::new(create_deepseek_client(&cfg.llm))
    } else if has_openai_key {
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        return Arc::new(MockLlmClient);
    };

    Arc::new(RetryingLlmClient::new(
        backend,
        RetryConfig::from_section(&cfg.llm),
    ))
}
