//! 阶段问题的恢复引擎
//!
//! handle 把 StageIssue 映射为 RecoveryAction，apply 把动作落到 ResearchState 上。
//! 单步模式下致命问题直接进入 error；完整运行模式会尽量用合成内容顶上，让报告仍有机会生成。

use crate::core::{ResearchState, ResearchStatus, Stage, StageIssue};
use crate::research::templates::{
    fallback_clarification_questions, placeholder_summary, templated_sub_questions,
};
use crate::research::summarize::render_results;

/// 编排器的驱动方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// start_research / continue_research：每次调用推进一步
    Step,
    /// run_full_research：一次跑到终态
    FullRun,
}

/// 恢复引擎给出的动作
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// 安装 3 条模板澄清问题
    InstallFallbackQuestions,
    /// 安装 3 条模板子问题
    InstallTemplatedSubQuestions,
    /// 以原始查询作为细化查询
    UseOriginalQuery,
    /// 用原始检索文本拼出占位摘要
    PlaceholderSummaries,
    /// 进入 error
    MarkError(String),
    /// 只记录，不改变状态
    Continue,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, issue: &StageIssue, mode: RunMode, state: &ResearchState) -> RecoveryAction {
        match (issue.stage(), mode) {
            (Stage::Clarification, _) => RecoveryAction::InstallFallbackQuestions,
            (Stage::Decomposition, _) => RecoveryAction::InstallTemplatedSubQuestions,
            (Stage::Refinement, RunMode::FullRun) => RecoveryAction::UseOriginalQuery,
            (Stage::Summarization, RunMode::FullRun)
                if state.search_results.values().any(|hits| !hits.is_empty()) =>
            {
                RecoveryAction::PlaceholderSummaries
            }
            _ if issue.is_fatal() => RecoveryAction::MarkError(issue.to_string()),
            _ => RecoveryAction::Continue,
        }
    }

    /// 执行动作；除 MarkError 外都会把问题追加到 errors
    pub fn apply(&self, issue: &StageIssue, action: &RecoveryAction, state: &mut ResearchState) {
        tracing::warn!(
            session_id = %state.session_id,
            stage = %issue.stage(),
            action = ?action,
            "recovering from stage issue"
        );
        if let RecoveryAction::MarkError(msg) = action {
            state.fail(msg.clone());
            return;
        }
        state.record_error(issue.to_string());
        self.install(action, state);
    }

    /// 不经过阶段调用直接安装兜底内容（如尝试次数达到上限）
    pub fn install(&self, action: &RecoveryAction, state: &mut ResearchState) {
        match action {
            RecoveryAction::InstallFallbackQuestions => {
                state.clarification_questions = fallback_clarification_questions(&state.original_query);
                state.log("Recovery: Installed default clarification questions");
                state.advance_to(ResearchStatus::ClarificationNeeded);
            }
            RecoveryAction::InstallTemplatedSubQuestions => {
                let query = state.effective_query().to_string();
                state.sub_questions = templated_sub_questions(&query);
                state.log("Recovery: Installed templated sub-questions");
                state.advance_to(ResearchStatus::QueryDecomposed);
            }
            RecoveryAction::UseOriginalQuery => {
                state.clarified_query = state.original_query.clone();
                state.log("Recovery: Using original query as refined query");
                state.advance_to(ResearchStatus::QueryRefined);
            }
            RecoveryAction::PlaceholderSummaries => {
                let pending: Vec<(String, String)> = state
                    .sub_questions
                    .iter()
                    .filter(|q| !state.summaries.contains_key(*q))
                    .filter_map(|q| {
                        state
                            .search_results
                            .get(q)
                            .filter(|hits| !hits.is_empty())
                            .map(|hits| (q.clone(), render_results(hits)))
                    })
                    .collect();
                for (q, raw) in pending {
                    let summary = placeholder_summary(&q, &raw);
                    state.summaries.insert(q.clone(), summary);
                    state.fact_checked.insert(q, false);
                }
                state.log(format!(
                    "Recovery: Built {} placeholder summaries from raw search results",
                    state.summaries.len()
                ));
                state.advance_to(ResearchStatus::SummariesCompleted);
            }
            RecoveryAction::MarkError(msg) => state.fail(msg.clone()),
            RecoveryAction::Continue => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResearchConfig;
    use crate::search::SearchHit;

    fn state() -> ResearchState {
        ResearchState::new("s1", "quantum computing", ResearchConfig::default())
    }

    #[test]
    fn test_clarification_failure_installs_fallback_questions() {
        let engine = RecoveryEngine::new();
        let mut st = state();
        let issue = StageIssue::recoverable(Stage::Clarification, "model down");
        let action = engine.handle(&issue, RunMode::Step, &st);
        assert_eq!(action, RecoveryAction::InstallFallbackQuestions);

        engine.apply(&issue, &action, &mut st);
        assert_eq!(st.clarification_questions.len(), 3);
        assert_eq!(st.status(), ResearchStatus::ClarificationNeeded);
        assert_eq!(st.errors.len(), 1);
    }

    #[test]
    fn test_refinement_failure_depends_on_mode() {
        let engine = RecoveryEngine::new();
        let issue = StageIssue::fatal(Stage::Refinement, "model down");

        let mut st = state();
        let action = engine.handle(&issue, RunMode::Step, &st);
        assert!(matches!(action, RecoveryAction::MarkError(_)));
        engine.apply(&issue, &action, &mut st);
        assert_eq!(st.status(), ResearchStatus::Error);

        let mut st = state();
        let action = engine.handle(&issue, RunMode::FullRun, &st);
        assert_eq!(action, RecoveryAction::UseOriginalQuery);
        engine.apply(&issue, &action, &mut st);
        assert_eq!(st.status(), ResearchStatus::QueryRefined);
        assert_eq!(st.clarified_query, "quantum computing");
    }

    #[test]
    fn test_decomposition_failure_installs_templates() {
        let engine = RecoveryEngine::new();
        let mut st = state();
        st.advance_to(ResearchStatus::QueryRefined);
        let issue = StageIssue::recoverable(Stage::Decomposition, "timeout");
        let action = engine.handle(&issue, RunMode::Step, &st);
        engine.apply(&issue, &action, &mut st);

        assert_eq!(st.sub_questions[0], "What is quantum computing?");
        assert_eq!(st.status(), ResearchStatus::QueryDecomposed);
        assert!((st.progress() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_placeholder_summaries_need_search_results() {
        let engine = RecoveryEngine::new();
        let issue = StageIssue::fatal(Stage::Summarization, "no summaries");

        let st = state();
        assert!(matches!(
            engine.handle(&issue, RunMode::FullRun, &st),
            RecoveryAction::MarkError(_)
        ));

        let mut st = state();
        st.sub_questions = vec!["What is it?".into()];
        st.search_results.insert(
            "What is it?".into(),
            vec![SearchHit::new("T", "https://example.org", "raw text")],
        );
        st.advance_to(ResearchStatus::SearchCompleted);
        let action = engine.handle(&issue, RunMode::FullRun, &st);
        assert_eq!(action, RecoveryAction::PlaceholderSummaries);
        engine.apply(&issue, &action, &mut st);
        assert!(st.summaries["What is it?"].contains("raw text"));
        assert_eq!(st.fact_checked["What is it?"], false);
        assert_eq!(st.status(), ResearchStatus::SummariesCompleted);
    }

    #[test]
    fn test_search_failure_is_fatal_in_both_modes() {
        let engine = RecoveryEngine::new();
        let issue = StageIssue::fatal(Stage::Search, "all searches failed");
        for mode in [RunMode::Step, RunMode::FullRun] {
            assert!(matches!(engine.handle(&issue, mode, &state()), RecoveryAction::MarkError(_)));
        }
    }
}
