//! 根据澄清问答生成细化查询

use crate::core::{ResearchState, ResearchStatus, Stage, StageIssue, StageResult};
use crate::llm::{prompt_vars, PromptKind};
use crate::research::Stages;

const NO_ANSWER: &str = "No answer provided";

/// 问答文本：每个问题后跟答案或占位
pub fn clarification_transcript(state: &ResearchState) -> String {
    state
        .clarification_questions
        .iter()
        .map(|q| {
            let answer = state
                .clarification_answers
                .get(q)
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .unwrap_or(NO_ANSWER);
            format!("Q: {q}\nA: {answer}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Stages {
    pub async fn process_clarifications(&self, state: &mut ResearchState) -> StageResult {
        state.log(format!(
            "Refinement agent: Processing {} clarification answers",
            state.clarification_answers.len()
        ));
        tracing::info!(session_id = %state.session_id, "refining research query");

        let vars = prompt_vars([
            ("original_query", state.original_query.clone()),
            ("clarification_qa", clarification_transcript(state)),
            ("output_format", state.config.output_format.as_str().to_string()),
            ("research_speed", state.config.speed.as_str().to_string()),
            ("depth_breadth", state.config.depth_and_breadth.to_string()),
        ]);

        let refined = self
            .model
            .invoke(PromptKind::Refinement, &vars)
            .await
            .map_err(|e| StageIssue::fatal(Stage::Refinement, e.to_string()))?;

        state.clarified_query = refined;
        state.log("Refinement agent: Created refined query");
        state.transition(ResearchStatus::QueryRefined);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResearchConfig;

    #[test]
    fn test_transcript_marks_missing_answers() {
        let mut state = ResearchState::new("s", "q", ResearchConfig::default());
        state.clarification_questions = vec!["A?".into(), "B?".into()];
        state.clarification_answers.insert("A?".into(), "yes".into());
        state.clarification_answers.insert("B?".into(), "  ".into());
        assert_eq!(
            clarification_transcript(&state),
            "Q: A?\nA: yes\nQ: B?\nA: No answer provided"
        );
    }
}
