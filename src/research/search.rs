//! 按子问题并发检索
//!
//! 所有子问题在 JoinSet 中并发执行，整体受一个截止时间约束；超时后未完成的子问题被跳过，
//! 已完成的结果保留。单个子问题失败时改用 SearchBackend::fallback 的合成内容。
//! 每完成一个子问题都会抬高进度并回调 on_progress，供调用方发布快照。

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::core::{ResearchState, ResearchStatus, Stage, StageIssue, StageResult};
use crate::research::templates::topic_sub_questions;
use crate::research::Stages;
use crate::search::SearchHit;

/// 单个子问题的检索结果；Err 中是失败原因
type QuestionOutcome = (String, Result<Vec<SearchHit>, String>);

impl Stages {
    pub async fn search(&self, state: &mut ResearchState) -> StageResult {
        self.search_with_progress(state, &|_: &ResearchState| {}).await
    }

    pub async fn search_with_progress(
        &self,
        state: &mut ResearchState,
        on_progress: &(dyn Fn(&ResearchState) + Send + Sync),
    ) -> StageResult {
        if state.sub_questions.is_empty() {
            let query = state.effective_query().to_string();
            state.sub_questions = topic_sub_questions(&query);
            state.log(format!(
                "Search agent: No sub-questions found, created {} topic questions",
                state.sub_questions.len()
            ));
        }

        let pending = state.unsearched_questions();
        let already_searched = state.search_results.len();
        let limit = state
            .config
            .max_search_questions(&self.policy, pending.len(), already_searched);
        let (to_search, over_limit) = pending.split_at(limit);
        for q in over_limit {
            state.log(format!("Search agent: Skipped '{q}' (speed limit)"));
        }

        let per_question = state.config.results_per_question();
        let budget = state.config.search_budget(&self.policy);
        let deadline = Instant::now() + budget;
        let total = to_search.len();
        state.log(format!(
            "Search agent: Searching {} sub-questions ({}s budget)",
            total,
            budget.as_secs()
        ));
        tracing::info!(session_id = %state.session_id, total, budget_secs = budget.as_secs(), "starting search fan-out");

        let mut set: JoinSet<QuestionOutcome> = JoinSet::new();
        for q in to_search {
            let backend = self.search.clone();
            let question = q.clone();
            set.spawn(async move {
                let outcome = AssertUnwindSafe(backend.search(&question, per_question))
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(Ok(hits)) if !hits.is_empty() => Ok(hits),
                    Ok(Ok(_)) => Err("no results".to_string()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("search task panicked".to_string()),
                };
                (question, result)
            });
        }

        let mut finished: BTreeSet<String> = BTreeSet::new();
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((question, result)))) => {
                    self.record_search_outcome(state, &question, result);
                    finished.insert(question);
                    if total > 0 {
                        state.bump_progress(0.5 + 0.3 * finished.len() as f64 / total as f64);
                    }
                    on_progress(state);
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(session_id = %state.session_id, error = %e, "search task aborted");
                }
                Ok(None) => break,
                Err(_) => {
                    set.abort_all();
                    tracing::warn!(session_id = %state.session_id, "search budget exhausted");
                    for q in to_search.iter().filter(|q| !finished.contains(*q)) {
                        state.log(format!("Search agent: Skipped '{q}' (time budget exhausted)"));
                    }
                    break;
                }
            }
        }

        let found = state.search_results.values().filter(|hits| !hits.is_empty()).count();
        if found == 0 {
            return Err(StageIssue::fatal(
                Stage::Search,
                "All searches failed: no results were obtained for any sub-question",
            ));
        }

        state.log(format!(
            "Search agent: Completed with results for {} of {} sub-questions",
            found,
            state.sub_questions.len()
        ));
        state.advance_to(ResearchStatus::SearchCompleted);
        Ok(())
    }

    fn record_search_outcome(
        &self,
        state: &mut ResearchState,
        question: &str,
        result: Result<Vec<SearchHit>, String>,
    ) {
        match result {
            Ok(hits) => {
                state.log(format!("Search agent: Found {} results for '{}'", hits.len(), question));
                state.search_results.insert(question.to_string(), hits);
            }
            Err(reason) => {
                let fallback = self.search.fallback(question);
                if fallback.is_empty() {
                    tracing::warn!(session_id = %state.session_id, question, reason = %reason, "search failed without fallback");
                    state.record_error(format!("Search failed for '{question}': {reason}"));
                } else {
                    tracing::debug!(session_id = %state.session_id, question, reason = %reason, "using fallback search content");
                    state.record_error(format!(
                        "Search failed for '{question}' ({reason}), using fallback content"
                    ));
                    state.search_results.insert(question.to_string(), fallback);
                }
            }
        }
    }
}
