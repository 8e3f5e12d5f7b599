//! 澄清问题生成

use crate::core::{ResearchState, ResearchStatus, Stage, StageIssue, StageResult};
use crate::llm::{prompt_vars, PromptKind};
use crate::research::templates::fallback_clarification_questions;
use crate::research::{parse_list_items, Stages};

/// 少于该数量时改用模板问题
const MIN_QUESTIONS: usize = 3;
const MAX_QUESTIONS: usize = 5;
/// 去掉标记后短于该长度的行不算问题
const MIN_QUESTION_CHARS: usize = 5;

impl Stages {
    /// 生成澄清问题；已有问题时直接透传
    pub async fn generate_clarification_questions(&self, state: &mut ResearchState) -> StageResult {
        if !state.clarification_questions.is_empty() {
            state.log(format!(
                "Clarification agent: Using existing {} questions",
                state.clarification_questions.len()
            ));
            if state.status() == ResearchStatus::Initialized {
                state.transition(ResearchStatus::ClarificationNeeded);
            }
            return Ok(());
        }

        state.log(format!(
            "Clarification agent: Starting to analyze query '{}'",
            state.original_query
        ));
        tracing::info!(session_id = %state.session_id, "generating clarification questions");

        let output = self
            .model
            .invoke(
                PromptKind::Clarification,
                &prompt_vars([("query", state.original_query.clone())]),
            )
            .await
            .map_err(|e| StageIssue::recoverable(Stage::Clarification, e.to_string()))?;

        let mut questions: Vec<String> = parse_list_items(&output)
            .into_iter()
            .filter(|q| q.chars().count() > MIN_QUESTION_CHARS)
            .take(MAX_QUESTIONS)
            .collect();

        if questions.len() < MIN_QUESTIONS {
            tracing::warn!(
                session_id = %state.session_id,
                parsed = questions.len(),
                "not enough clarification questions parsed, using templates"
            );
            state.log(format!(
                "Clarification agent: Parsed only {} questions, using default questions",
                questions.len()
            ));
            questions = fallback_clarification_questions(&state.original_query);
        }

        state.log(format!(
            "Clarification agent: Generated {} questions for user",
            questions.len()
        ));
        state.clarification_questions = questions;
        state.transition(ResearchStatus::ClarificationNeeded);
        Ok(())
    }
}
