//! 查询分解：子问题数量由配置决定，模型给得不够时补齐

use crate::core::{ResearchState, ResearchStatus, Stage, StageIssue, StageResult};
use crate::llm::{prompt_vars, PromptKind};
use crate::research::templates::filler_sub_question;
use crate::research::{parse_list_items, Stages};

/// 去重、截断到 target，并用通用问题补齐
pub fn normalize_sub_questions(parsed: Vec<String>, target: usize, query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(target);
    for q in parsed {
        if out.len() == target {
            break;
        }
        if !out.contains(&q) {
            out.push(q);
        }
    }
    let mut n = 1;
    while out.len() < target {
        let filler = filler_sub_question(query, n);
        if !out.contains(&filler) {
            out.push(filler);
        }
        n += 1;
    }
    out
}

impl Stages {
    /// 分解查询；已有子问题时透传（支持续跑）
    pub async fn decompose_query(&self, state: &mut ResearchState) -> StageResult {
        state.decomposition_attempts += 1;

        if !state.sub_questions.is_empty() {
            state.log(format!(
                "Decomposition agent: Using existing {} sub-questions",
                state.sub_questions.len()
            ));
            state.transition(ResearchStatus::QueryDecomposed);
            return Ok(());
        }

        let query = state.effective_query().to_string();
        let target = state.config.target_sub_questions();
        state.log(format!(
            "Decomposition agent: Breaking query into {} sub-questions",
            target
        ));
        tracing::info!(session_id = %state.session_id, target, "decomposing query");

        let output = self
            .model
            .invoke(
                PromptKind::Decomposition,
                &prompt_vars([
                    ("query", query.clone()),
                    ("num_questions", target.to_string()),
                ]),
            )
            .await
            .map_err(|e| StageIssue::recoverable(Stage::Decomposition, e.to_string()))?;

        let parsed = parse_list_items(&output);
        if parsed.len() < target {
            tracing::warn!(
                session_id = %state.session_id,
                parsed = parsed.len(),
                target,
                "decomposition underflow, padding with generic sub-questions"
            );
        }

        state.sub_questions = normalize_sub_questions(parsed, target, &query);
        state.log(format!(
            "Decomposition agent: Created {} sub-questions",
            state.sub_questions.len()
        ));
        state.transition(ResearchStatus::QueryDecomposed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_and_dedups() {
        let parsed = vec!["A?".to_string(), "A?".to_string()];
        let out = normalize_sub_questions(parsed, 4, "X");
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], "A?");
        assert_eq!(out[1], "What are additional important aspects of X?");
        assert_eq!(out[2], "What are additional important aspects of X? (part 2)");
    }

    #[test]
    fn test_normalize_truncates() {
        let parsed = (1..=9).map(|i| format!("Q{i}?")).collect();
        assert_eq!(normalize_sub_questions(parsed, 5, "X").len(), 5);
    }
}
