//! 摘要与事实核查

use crate::core::{ResearchState, ResearchStatus, Speed, Stage, StageIssue, StageResult};
use crate::llm::{prompt_vars, PromptKind};
use crate::research::Stages;
use crate::search::SearchHit;

/// 检索结果拼接为摘要提示词的输入
pub fn render_results(hits: &[SearchHit]) -> String {
    hits.iter().map(SearchHit::render).collect::<Vec<_>>().join("\n\n")
}

impl Stages {
    pub async fn summarize_and_fact_check(&self, state: &mut ResearchState) -> StageResult {
        let pending = state.unsummarized_questions();
        let length = state.config.summary_length();
        let check = state.config.speed != Speed::Fast;
        state.log(format!(
            "Summarization agent: Summarizing {} sub-questions ({})",
            pending.len(),
            length
        ));

        for question in &pending {
            let results = state
                .search_results
                .get(question)
                .map(|hits| render_results(hits))
                .unwrap_or_default();

            let summary = match self
                .model
                .invoke(
                    PromptKind::Summarization,
                    &prompt_vars([
                        ("question", question.clone()),
                        ("results", results.clone()),
                        ("length", length.to_string()),
                    ]),
                )
                .await
            {
                Ok(s) if s.chars().count() > self.policy.min_summary_chars => s,
                Ok(s) => {
                    state.record_error(format!(
                        "Summary for '{}' too short ({} chars), skipped",
                        question,
                        s.chars().count()
                    ));
                    continue;
                }
                Err(e) => {
                    tracing::warn!(session_id = %state.session_id, question = %question, error = %e, "summarization failed");
                    state.record_error(format!("Summarization failed for '{question}': {e}"));
                    continue;
                }
            };

            let verified = if check {
                self.fact_check(state, question, &results, &summary).await
            } else {
                false
            };

            state.summaries.insert(question.clone(), summary);
            state.fact_checked.insert(question.clone(), verified);
        }

        if state.summaries.is_empty() {
            return Err(StageIssue::fatal(
                Stage::Summarization,
                "No valid summaries could be produced",
            ));
        }

        state.log(format!(
            "Summarization agent: {} summaries ready",
            state.summaries.len()
        ));
        state.transition(ResearchStatus::SummariesCompleted);
        Ok(())
    }

    /// 核查失败按未通过处理
    async fn fact_check(
        &self,
        state: &mut ResearchState,
        question: &str,
        results: &str,
        summary: &str,
    ) -> bool {
        let vars = prompt_vars([
            ("question", question.to_string()),
            ("results", results.to_string()),
            ("summary", summary.to_string()),
        ]);
        match self.model.invoke(PromptKind::FactCheck, &vars).await {
            Ok(verdict) => verdict.trim_start().to_uppercase().starts_with("VERIFIED"),
            Err(e) => {
                state.record_error(format!("Fact check failed for '{question}': {e}"));
                false
            }
        }
    }
}
