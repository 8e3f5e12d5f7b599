//! 研究编排器：会话生命周期与状态机驱动
//!
//! 每个对外操作先从 SessionStore 取出会话句柄，再在会话锁内按 status 选择下一个阶段。
//! 阶段调用被 catch_unwind 包裹；阶段报告的问题交给 RecoveryEngine 处理，
//! 调用方拿到的始终是一份完整的 ResearchState 快照。取消只在阶段之间生效，不打断进行中的网关调用。
//! 每个阶段结束和每次检索进度变化后都会发布快照，get_session 只读快照，不等待会话锁。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::config::AppConfig;
use crate::core::recovery::RunMode;
use crate::core::session_store::SessionHandle;
use crate::core::{
    MemorySessionStore, RecoveryEngine, ResearchConfig, ResearchError, ResearchState,
    ResearchStatus, SessionStore, Stage, StageIssue, StageResult,
};
use crate::llm::{create_llm_from_config, ModelGateway};
use crate::research::{Stages, DEFAULT_CLARIFICATION_ANSWER};
use crate::search::SearxngSearch;

pub struct ResearchOrchestrator {
    stages: Stages,
    store: Arc<dyn SessionStore>,
    recovery: RecoveryEngine,
}

impl ResearchOrchestrator {
    pub fn new(stages: Stages, store: Arc<dyn SessionStore>) -> Self {
        Self {
            stages,
            store,
            recovery: RecoveryEngine::new(),
        }
    }

    /// 按配置创建模型网关（无 API Key 时为 Mock）与 SearxNG 检索
    pub fn from_config(cfg: &AppConfig) -> Self {
        let model = ModelGateway::new(create_llm_from_config(cfg));
        let search = Arc::new(SearxngSearch::new(&cfg.search));
        let stages = Stages::new(model, search, cfg.research.clone());
        Self::new(stages, Arc::new(MemorySessionStore::new()))
    }

    pub async fn create_session(
        &self,
        session_id: impl Into<String>,
        query: &str,
        config: ResearchConfig,
    ) -> Result<ResearchState, ResearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::InvalidQuery);
        }
        config.validate()?;

        let state = ResearchState::new(session_id, query, config);
        let handle = self.store.insert(state).await?;
        let state = handle.snapshot();
        tracing::info!(
            session_id = %state.session_id,
            speed = state.config.speed.as_str(),
            depth = state.config.depth_and_breadth,
            "created research session"
        );
        Ok(state)
    }

    /// 最近发布的会话快照；阶段执行中也立即返回
    pub async fn get_session(&self, session_id: &str) -> Option<ResearchState> {
        let handle = self.store.get(session_id).await?;
        Some(handle.snapshot())
    }

    pub async fn list_sessions(&self) -> Vec<String> {
        self.store.ids().await
    }

    /// 运行第一步（澄清问题；配置跳过澄清时直接细化查询）；已启动的会话原样返回
    pub async fn start_research(&self, session_id: &str) -> Result<ResearchState, ResearchError> {
        let handle = self.handle(session_id).await?;
        let mut state = handle.state.lock().await;

        let status = state.status();
        if status != ResearchStatus::Initialized {
            state.log(format!("Research already started (status: {status})"));
            handle.publish(&state);
            return Ok(state.clone());
        }

        tracing::info!(session_id, "starting research workflow");
        state.log("Starting research workflow");
        self.step(&handle, &mut state, RunMode::Step).await;
        handle.publish(&state);
        Ok(state.clone())
    }

    /// 合并澄清答案；不属于当前问题的键也保留，但会记录到日志
    pub async fn add_clarification_answers<I>(
        &self,
        session_id: &str,
        answers: I,
    ) -> Result<ResearchState, ResearchError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let handle = self.handle(session_id).await?;
        let mut state = handle.state.lock().await;

        let status = state.status();
        if status.is_terminal() {
            tracing::warn!(session_id, %status, "ignoring answers for finished session");
            state.log(format!("Ignored clarification answers: session is {status}"));
            handle.publish(&state);
            return Ok(state.clone());
        }

        let mut added = 0;
        for (question, answer) in answers {
            if !state.clarification_questions.contains(&question) {
                state.log(format!("Answer for unknown question kept: '{question}'"));
            }
            state.clarification_answers.insert(question, answer);
            added += 1;
        }
        state.log(format!("Added {added} clarification answers"));
        handle.publish(&state);
        Ok(state.clone())
    }

    /// 推进一步；阶段没有推进状态时再补跑一次
    pub async fn continue_research(&self, session_id: &str) -> Result<ResearchState, ResearchError> {
        let handle = self.handle(session_id).await?;
        let mut state = handle.state.lock().await;

        state.log("Continuing research workflow");
        let before = state.status();
        self.step(&handle, &mut state, RunMode::Step).await;

        let after = state.status();
        if after == before && !after.is_terminal() && after != ResearchStatus::ClarificationNeeded {
            tracing::warn!(session_id, status = %after, "stage made no progress, advancing");
            state.log(format!("Orchestrator: No progress at {after}, retrying next stage"));
            self.step(&handle, &mut state, RunMode::Step).await;
        }
        handle.publish(&state);
        Ok(state.clone())
    }

    /// 一次跑到终态：跳过已有产出的阶段，失败时尽量用合成内容继续
    pub async fn run_full_research(&self, session_id: &str) -> Result<ResearchState, ResearchError> {
        let handle = self.handle(session_id).await?;
        let token = handle.cancel_token();
        let mut state = handle.state.lock().await;

        tracing::info!(session_id, status = %state.status(), "running full research workflow");
        state.log("Running full research workflow");
        fast_forward(&mut state);
        handle.publish(&state);

        let max_steps = self.stages.policy().max_full_run_steps;
        for _ in 0..max_steps {
            let status = state.status();
            if status.is_terminal() {
                break;
            }
            if token.is_cancelled() {
                state.fail(format!("Session cancelled at {status}"));
                break;
            }
            self.step(&handle, &mut state, RunMode::FullRun).await;
        }

        let status = state.status();
        if !status.is_terminal() {
            state.fail(format!(
                "Research did not complete within {max_steps} steps (stuck at {status})"
            ));
        }
        handle.publish(&state);
        tracing::info!(
            session_id,
            status = %state.status(),
            errors = state.errors.len(),
            "full research workflow finished"
        );
        Ok(state.clone())
    }

    /// 删除会话；进行中的完整运行在当前阶段结束后停止
    pub async fn cancel_session(&self, session_id: &str) -> bool {
        let removed = self.store.remove(session_id).await;
        if removed {
            tracing::info!(session_id, "cancelled research session");
        }
        removed
    }

    async fn handle(&self, session_id: &str) -> Result<SessionHandle, ResearchError> {
        self.store.get(session_id).await.ok_or_else(|| {
            tracing::error!(session_id, "session not found");
            ResearchError::SessionNotFound(session_id.to_string())
        })
    }

    /// 按当前 status 选择并执行下一个阶段
    async fn step(&self, handle: &SessionHandle, state: &mut ResearchState, mode: RunMode) {
        match state.status() {
            ResearchStatus::Initialized => {
                if state.config.skip_clarification || mode == RunMode::FullRun {
                    state.log("Orchestrator: Skipping clarification");
                    fill_default_answers(state);
                    self.run_stage(Stage::Refinement, handle, state, mode).await;
                } else {
                    self.run_stage(Stage::Clarification, handle, state, mode).await;
                }
            }
            ResearchStatus::ClarificationNeeded => {
                if mode == RunMode::FullRun {
                    fill_default_answers(state);
                } else if !has_answers(state) {
                    state.clarification_attempts += 1;
                    let threshold = self.stages.policy().clarification_attempt_threshold;
                    if state.clarification_attempts < threshold {
                        state.log(format!(
                            "Waiting for clarification answers (attempt {}/{})",
                            state.clarification_attempts, threshold
                        ));
                        return;
                    }
                    tracing::info!(session_id = %state.session_id, "clarification timed out, using default answers");
                    state.log("Clarification timed out, proceeding with default answers");
                    fill_default_answers(state);
                }
                self.run_stage(Stage::Refinement, handle, state, mode).await;
            }
            ResearchStatus::QueryRefined => {
                self.run_stage(Stage::Decomposition, handle, state, mode).await
            }
            ResearchStatus::QueryDecomposed => {
                self.run_stage(Stage::Search, handle, state, mode).await
            }
            ResearchStatus::SearchCompleted => {
                self.run_stage(Stage::Summarization, handle, state, mode).await
            }
            ResearchStatus::SummariesCompleted => {
                self.run_stage(Stage::Report, handle, state, mode).await
            }
            ResearchStatus::Completed | ResearchStatus::Error => {}
        }
    }

    async fn invoke_stage(
        &self,
        stage: Stage,
        handle: &SessionHandle,
        state: &mut ResearchState,
    ) -> StageResult {
        match stage {
            Stage::Clarification => self.stages.generate_clarification_questions(state).await,
            Stage::Refinement => self.stages.process_clarifications(state).await,
            Stage::Decomposition => self.stages.decompose_query(state).await,
            Stage::Search => {
                let publish = |s: &ResearchState| handle.publish(s);
                self.stages.search_with_progress(state, &publish).await
            }
            Stage::Summarization => self.stages.summarize_and_fact_check(state).await,
            Stage::Report => self.stages.generate_final_report(state).await,
        }
    }

    /// 执行单个阶段：panic 视为致命问题；结束后发布快照
    async fn run_stage(
        &self,
        stage: Stage,
        handle: &SessionHandle,
        state: &mut ResearchState,
        mode: RunMode,
    ) {
        let outcome = AssertUnwindSafe(self.invoke_stage(stage, handle, state))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(session_id = %state.session_id, %stage, "stage panicked");
                Err(StageIssue::fatal(stage, "unexpected panic in stage"))
            }
        };

        if let Err(issue) = result {
            let action = self.recovery.handle(&issue, mode, state);
            self.recovery.apply(&issue, &action, state);
        }
        handle.publish(state);
    }
}

fn has_answers(state: &ResearchState) -> bool {
    state
        .clarification_answers
        .values()
        .any(|a| !a.trim().is_empty())
}

fn fill_default_answers(state: &mut ResearchState) {
    for q in state.unanswered_questions() {
        state
            .clarification_answers
            .insert(q, DEFAULT_CLARIFICATION_ANSWER.to_string());
    }
}

/// 把 status 推进到已有产出对应的最远阶段
fn fast_forward(state: &mut ResearchState) {
    let target = if !state.final_report.is_empty() {
        ResearchStatus::Completed
    } else if !state.summaries.is_empty() {
        ResearchStatus::SummariesCompleted
    } else if state.search_results.values().any(|hits| !hits.is_empty()) {
        ResearchStatus::SearchCompleted
    } else if !state.sub_questions.is_empty() {
        ResearchStatus::QueryDecomposed
    } else if !state.clarified_query.trim().is_empty() {
        ResearchStatus::QueryRefined
    } else {
        return;
    };

    let ahead = match (state.status().progress(), target.progress()) {
        (Some(current), Some(next)) => next > current,
        _ => false,
    };
    if ahead {
        state.log(format!("Orchestrator: Fast-forwarding to {target}"));
        state.advance_to(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_forward_to_completed_when_report_exists() {
        let mut state = ResearchState::new("s", "q", ResearchConfig::default());
        state.final_report = "report".into();
        fast_forward(&mut state);
        assert_eq!(state.status(), ResearchStatus::Completed);
        assert!((state.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fast_forward_never_moves_backwards() {
        let mut state = ResearchState::new("s", "q", ResearchConfig::default());
        state.advance_to(ResearchStatus::SearchCompleted);
        state.clarified_query = "refined".into();
        fast_forward(&mut state);
        assert_eq!(state.status(), ResearchStatus::SearchCompleted);
    }

    #[test]
    fn test_fill_default_answers_keeps_user_answers() {
        let mut state = ResearchState::new("s", "q", ResearchConfig::default());
        state.clarification_questions = vec!["A?".into(), "B?".into()];
        state.clarification_answers.insert("A?".into(), "mine".into());
        fill_default_answers(&mut state);
        assert_eq!(state.clarification_answers["A?"], "mine");
        assert_eq!(state.clarification_answers["B?"], DEFAULT_CLARIFICATION_ANSWER);
    }
}
