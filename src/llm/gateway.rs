//! 模型网关：按模板名渲染提示词并调用 LLM
//!
//! 研究阶段只通过 `invoke(PromptKind, vars)` 访问模型，不直接接触 LlmClient。

use std::sync::Arc;

use crate::llm::{LlmClient, LlmError, Message, PromptKind, PromptVars};

#[derive(Clone)]
pub struct ModelGateway {
    llm: Arc<dyn LlmClient>,
}

impl ModelGateway {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 渲染模板并完成一次调用；空输出视为 EmptyResponse
    pub async fn invoke(&self, kind: PromptKind, vars: &PromptVars) -> Result<String, LlmError> {
        let prompt = kind.render(vars);
        tracing::debug!(template = kind.name(), prompt_chars = prompt.len(), "invoking model");

        let output = self.llm.complete(&[Message::user(prompt)]).await?;
        let output = output.trim();
        if output.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(output.to_string())
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }
}
