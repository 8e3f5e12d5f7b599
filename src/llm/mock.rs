//! Mock LLM 客户端（用于离线运行与测试，无需 API）
//!
//! 根据提示词开场白识别模板类型，返回结构正确的确定性文本：编号问题列表、摘要段落、多段报告。

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, PromptKind, Role};

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient;

/// 取提示词中以 `label` 开头的行的剩余部分
fn field<'a>(prompt: &'a str, label: &str) -> &'a str {
    prompt
        .lines()
        .find_map(|l| l.trim().strip_prefix(label))
        .map(str::trim)
        .unwrap_or("")
}

const ASPECTS: [&str; 8] = [
    "What is the definition and scope of",
    "What are the key concepts behind",
    "What is the history and evolution of",
    "What are the latest developments in",
    "What are the main challenges facing",
    "What are the practical applications of",
    "What are the economic and social impacts of",
    "What does the future outlook look like for",
];

impl MockLlmClient {
    fn respond(kind: PromptKind, prompt: &str) -> String {
        match kind {
            PromptKind::Clarification => {
                let q = field(prompt, "Research query:");
                format!(
                    "1. Which aspects of {q} matter most to you?\n\
                     2. Are you interested in recent developments or the historical background of {q}?\n\
                     3. Who is the intended audience for research on {q}?"
                )
            }
            PromptKind::Refinement => {
                let q = field(prompt, "Original query:");
                format!(
                    "A comprehensive investigation of {q}, covering its definition, key concepts, \
                     recent developments, open challenges and practical applications."
                )
            }
            PromptKind::Decomposition => {
                let q = field(prompt, "Research query:");
                let n: usize = field(prompt, "Number of sub-questions:").parse().unwrap_or(3);
                (0..n)
                    .map(|i| format!("{}. {} {}?", i + 1, ASPECTS[i % ASPECTS.len()], q.trim_end_matches('?')))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            PromptKind::Summarization => {
                let q = field(prompt, "Question:");
                format!(
                    "The retrieved sources address the question \"{q}\" from several angles. \
                     They agree on the core facts and describe the topic with concrete examples.\n\n\
                     Where the sources differ, the differences concern emphasis rather than substance, \
                     and the available evidence is sufficient for an overview."
                )
            }
            PromptKind::FactCheck => {
                "VERIFIED: The summary is consistent with the search results.".to_string()
            }
            PromptKind::FullReport | PromptKind::ExecutiveSummary | PromptKind::BulletList => {
                let q = field(prompt, "Research query:");
                let paragraph = format!(
                    "This section examines {q} using the findings gathered for each sub-question. \
                     The sources describe the subject consistently, and the evidence supports a \
                     coherent picture of its concepts, its development over time and its present use."
                );
                let mut report = format!("# Research Report: {q}\n\n");
                for heading in ["Executive Summary", "Findings", "Analysis", "Conclusion"] {
                    report.push_str(&format!("## {heading}\n\n"));
                    for _ in 0..2 {
                        report.push_str(&paragraph);
                        report.push_str("\n\n");
                    }
                }
                report
            }
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        match PromptKind::detect(last_user) {
            Some(kind) => Ok(Self::respond(kind, last_user)),
            None => Ok(format!("Echo from Mock: {}", last_user)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt_vars;

    #[tokio::test]
    async fn test_decomposition_honours_requested_count() {
        let prompt = PromptKind::Decomposition.render(&prompt_vars([
            ("query", "quantum computing".into()),
            ("num_questions", "6".into()),
        ]));
        let out = MockLlmClient.complete(&[Message::user(prompt)]).await.unwrap();
        assert_eq!(out.lines().count(), 6);
        assert!(out.lines().all(|l| l.contains("quantum computing")));
    }

    #[tokio::test]
    async fn test_report_is_long_prose() {
        let prompt = PromptKind::FullReport.render(&prompt_vars([("query", "What is AI?".into())]));
        let out = MockLlmClient.complete(&[Message::user(prompt)]).await.unwrap();
        assert!(out.len() > 1500);
    }
}
