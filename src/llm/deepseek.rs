//! DeepSeek 后端：OpenAI 兼容端点，默认模型 deepseek-chat

use crate::config::LlmSection;
use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 配置里的模型名不是 DeepSeek 模型时（如默认的 gpt-4o-mini）改用 deepseek-chat；
/// 模型也可由 `DEEPSEEK_MODEL` 覆盖
fn deepseek_model(section: &LlmSection) -> String {
    std::env::var("DEEPSEEK_MODEL").ok().unwrap_or_else(|| {
        if section.model.starts_with("deepseek") {
            section.model.clone()
        } else {
            DEEPSEEK_CHAT.to_string()
        }
    })
}

/// Key 取 `DEEPSEEK_API_KEY`，没有时退回 `OPENAI_API_KEY`；base_url 可由配置覆盖
pub fn create_deepseek_client(section: &LlmSection) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let base_url = section.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
    let model = deepseek_model(section);
    tracing::info!(model = %model, base_url, "Using DeepSeek LLM");
    OpenAiClient::new(Some(base_url), &model, api_key.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_model_name_is_replaced() {
        if std::env::var("DEEPSEEK_MODEL").is_ok() {
            return;
        }
        let section = LlmSection::default();
        assert_eq!(deepseek_model(&section), DEEPSEEK_CHAT);

        let section = LlmSection {
            model: "deepseek-reasoner".into(),
            ..LlmSection::default()
        };
        assert_eq!(deepseek_model(&section), "deepseek-reasoner");
    }
}
