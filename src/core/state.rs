//! 研究状态：状态机、会话配置与每个会话的完整 ResearchState
//!
//! status 只能沿固定的边迁移；progress 由 status 查表得到，只有检索阶段可以在两档之间小步推进。

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ResearchSection;
use crate::core::ResearchError;
use crate::search::SearchHit;

/// 研究速度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    Fast,
    #[default]
    Balanced,
    Deep,
}

/// 报告形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    FullReport,
    ExecutiveSummary,
    BulletList,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::FullReport => "full_report",
            OutputFormat::ExecutiveSummary => "executive_summary",
            OutputFormat::BulletList => "bullet_list",
        }
    }
}

impl Speed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speed::Fast => "fast",
            Speed::Balanced => "balanced",
            Speed::Deep => "deep",
        }
    }
}

/// 会话创建时确定、之后不再改变的研究配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub speed: Speed,
    #[serde(default)]
    pub output_format: OutputFormat,
    /// 1-5
    #[serde(default = "default_depth")]
    pub depth_and_breadth: u8,
    #[serde(default)]
    pub skip_clarification: bool,
}

fn default_depth() -> u8 {
    3
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            output_format: OutputFormat::default(),
            depth_and_breadth: default_depth(),
            skip_clarification: false,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<(), ResearchError> {
        if !(1..=5).contains(&self.depth_and_breadth) {
            return Err(ResearchError::InvalidConfig(format!(
                "depth_and_breadth must be between 1 and 5, got {}",
                self.depth_and_breadth
            )));
        }
        Ok(())
    }

    /// 分解阶段的目标子问题数
    pub fn target_sub_questions(&self) -> usize {
        let by_depth = match self.depth_and_breadth {
            0 | 1 => 2,
            2 => 3,
            3 | 4 => 4,
            _ => 5,
        };
        match self.speed {
            Speed::Deep => by_depth.max(6),
            _ => by_depth,
        }
    }

    /// 检索阶段总时长预算
    pub fn search_budget(&self, policy: &ResearchSection) -> Duration {
        let secs = match self.speed {
            Speed::Fast => policy.search_budget_fast_secs,
            Speed::Deep => policy.search_budget_deep_secs,
            Speed::Balanced => policy.search_budget_default_secs,
        };
        Duration::from_secs(secs)
    }

    /// 本次检索最多尝试的子问题数；fast 的上限按整个会话计，已检索过的子问题占用名额
    pub fn max_search_questions(
        &self,
        policy: &ResearchSection,
        pending: usize,
        already_searched: usize,
    ) -> usize {
        match self.speed {
            Speed::Fast => pending.min(policy.fast_max_questions.saturating_sub(already_searched)),
            Speed::Balanced | Speed::Deep => pending,
        }
    }

    /// 每个子问题请求的检索结果条数
    pub fn results_per_question(&self) -> usize {
        match self.speed {
            Speed::Fast => 2,
            Speed::Balanced | Speed::Deep => 3,
        }
    }

    /// 摘要篇幅（四档）
    pub fn summary_length(&self) -> &'static str {
        let depth = self.depth_and_breadth;
        match self.speed {
            Speed::Fast if depth <= 2 => "2-3 paragraphs",
            Speed::Fast => "3-5 paragraphs",
            Speed::Balanced if depth <= 3 => "3-5 paragraphs",
            Speed::Balanced => "5-7 paragraphs",
            Speed::Deep if depth <= 3 => "5-7 paragraphs",
            Speed::Deep => "8-10 paragraphs",
        }
    }
}

/// 状态机的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    Initialized,
    ClarificationNeeded,
    QueryRefined,
    QueryDecomposed,
    SearchCompleted,
    SummariesCompleted,
    Completed,
    Error,
}

impl ResearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchStatus::Initialized => "initialized",
            ResearchStatus::ClarificationNeeded => "clarification_needed",
            ResearchStatus::QueryRefined => "query_refined",
            ResearchStatus::QueryDecomposed => "query_decomposed",
            ResearchStatus::SearchCompleted => "search_completed",
            ResearchStatus::SummariesCompleted => "summaries_completed",
            ResearchStatus::Completed => "completed",
            ResearchStatus::Error => "error",
        }
    }

    /// 每个状态对应的进度；Error 沿用出错前的进度
    pub fn progress(&self) -> Option<f64> {
        match self {
            ResearchStatus::Initialized => Some(0.0),
            ResearchStatus::ClarificationNeeded => Some(0.2),
            ResearchStatus::QueryRefined => Some(0.4),
            ResearchStatus::QueryDecomposed => Some(0.5),
            ResearchStatus::SearchCompleted => Some(0.8),
            ResearchStatus::SummariesCompleted => Some(0.9),
            ResearchStatus::Completed => Some(1.0),
            ResearchStatus::Error => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResearchStatus::Completed | ResearchStatus::Error)
    }

    /// 主链上的下一个状态
    pub fn next(&self) -> Option<ResearchStatus> {
        match self {
            ResearchStatus::Initialized => Some(ResearchStatus::ClarificationNeeded),
            ResearchStatus::ClarificationNeeded => Some(ResearchStatus::QueryRefined),
            ResearchStatus::QueryRefined => Some(ResearchStatus::QueryDecomposed),
            ResearchStatus::QueryDecomposed => Some(ResearchStatus::SearchCompleted),
            ResearchStatus::SearchCompleted => Some(ResearchStatus::SummariesCompleted),
            ResearchStatus::SummariesCompleted => Some(ResearchStatus::Completed),
            ResearchStatus::Completed | ResearchStatus::Error => None,
        }
    }

    /// 合法的边：主链、跳过澄清（initialized -> query_refined）、任意非终态 -> error
    pub fn can_transition_to(&self, next: ResearchStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == ResearchStatus::Error {
            return true;
        }
        if *self == ResearchStatus::Initialized && next == ResearchStatus::QueryRefined {
            return true;
        }
        self.next() == Some(next)
    }
}

impl std::fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个研究会话的完整状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    pub session_id: String,
    pub original_query: String,
    pub clarified_query: String,
    pub config: ResearchConfig,
    pub clarification_questions: Vec<String>,
    pub clarification_answers: BTreeMap<String, String>,
    pub sub_questions: Vec<String>,
    pub search_results: BTreeMap<String, Vec<SearchHit>>,
    pub summaries: BTreeMap<String, String>,
    pub fact_checked: BTreeMap<String, bool>,
    pub final_report: String,
    status: ResearchStatus,
    progress: f64,
    pub log: Vec<String>,
    pub errors: Vec<String>,
    pub clarification_attempts: u32,
    pub decomposition_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResearchState {
    pub fn new(session_id: impl Into<String>, query: impl Into<String>, config: ResearchConfig) -> Self {
        let query = query.into();
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            log: vec![format!("Session initialized with query: {}", query)],
            original_query: query,
            clarified_query: String::new(),
            config,
            clarification_questions: Vec::new(),
            clarification_answers: BTreeMap::new(),
            sub_questions: Vec::new(),
            search_results: BTreeMap::new(),
            summaries: BTreeMap::new(),
            fact_checked: BTreeMap::new(),
            final_report: String::new(),
            status: ResearchStatus::Initialized,
            progress: 0.0,
            errors: Vec::new(),
            clarification_attempts: 0,
            decomposition_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> ResearchStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// 澄清后的查询优先，否则用原始查询
    pub fn effective_query(&self) -> &str {
        if self.clarified_query.trim().is_empty() {
            &self.original_query
        } else {
            &self.clarified_query
        }
    }

    pub fn log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
        self.updated_at = Utc::now();
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.updated_at = Utc::now();
    }

    /// 沿合法边迁移；非法迁移被拒绝并返回 false
    pub fn transition(&mut self, next: ResearchStatus) -> bool {
        if self.status == next {
            return true;
        }
        if !self.status.can_transition_to(next) {
            tracing::warn!(
                session_id = %self.session_id,
                from = %self.status,
                to = %next,
                "rejected illegal status transition"
            );
            return false;
        }
        tracing::debug!(session_id = %self.session_id, from = %self.status, to = %next, "status transition");
        self.log(format!("Status: {} -> {}", self.status, next));
        self.status = next;
        if let Some(p) = next.progress() {
            self.progress = self.progress.max(p);
        }
        true
    }

    /// 记录错误并进入终态 error
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::error!(session_id = %self.session_id, status = %self.status, error = %error, "research failed");
        self.record_error(error);
        self.transition(ResearchStatus::Error);
    }

    /// 沿主链逐步推进到 target（用于快进到已有产出的阶段）
    pub fn advance_to(&mut self, target: ResearchStatus) -> bool {
        if self.status == ResearchStatus::Initialized && target != ResearchStatus::ClarificationNeeded {
            if !self.transition(ResearchStatus::QueryRefined) {
                return false;
            }
        }
        while self.status != target {
            match self.status.next() {
                Some(next) if self.transition(next) => {}
                _ => return false,
            }
        }
        true
    }

    /// 在当前档与下一档之间推进进度，始终低于下一档
    pub fn bump_progress(&mut self, value: f64) {
        let Some(ceiling) = self.status.next().and_then(|n| n.progress()) else {
            return;
        };
        let capped = value.min(ceiling - 0.01);
        if capped > self.progress {
            self.progress = capped;
            self.updated_at = Utc::now();
        }
    }

    /// 尚未有检索结果的子问题（保持 sub_questions 顺序）
    pub fn unsearched_questions(&self) -> Vec<String> {
        self.sub_questions
            .iter()
            .filter(|q| !self.search_results.contains_key(*q))
            .cloned()
            .collect()
    }

    /// 有检索结果但尚无摘要的子问题
    pub fn unsummarized_questions(&self) -> Vec<String> {
        self.sub_questions
            .iter()
            .filter(|q| {
                self.search_results.get(*q).is_some_and(|hits| !hits.is_empty())
                    && !self.summaries.contains_key(*q)
            })
            .cloned()
            .collect()
    }

    /// 所有未回答的澄清问题
    pub fn unanswered_questions(&self) -> Vec<String> {
        self.clarification_questions
            .iter()
            .filter(|q| {
                self.clarification_answers
                    .get(*q)
                    .map_or(true, |a| a.trim().is_empty())
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(speed: Speed, depth: u8) -> ResearchConfig {
        ResearchConfig {
            speed,
            depth_and_breadth: depth,
            ..ResearchConfig::default()
        }
    }

    #[test]
    fn test_sub_question_targets() {
        assert_eq!(config(Speed::Fast, 1).target_sub_questions(), 2);
        assert_eq!(config(Speed::Fast, 2).target_sub_questions(), 3);
        assert_eq!(config(Speed::Balanced, 3).target_sub_questions(), 4);
        assert_eq!(config(Speed::Balanced, 4).target_sub_questions(), 4);
        assert_eq!(config(Speed::Fast, 5).target_sub_questions(), 5);
        for depth in 1..=5 {
            assert_eq!(config(Speed::Deep, depth).target_sub_questions(), 6);
        }
    }

    #[test]
    fn test_summary_length_tiers() {
        assert_eq!(config(Speed::Fast, 1).summary_length(), "2-3 paragraphs");
        assert_eq!(config(Speed::Fast, 4).summary_length(), "3-5 paragraphs");
        assert_eq!(config(Speed::Balanced, 5).summary_length(), "5-7 paragraphs");
        assert_eq!(config(Speed::Deep, 5).summary_length(), "8-10 paragraphs");
    }

    #[test]
    fn test_fast_question_cap_counts_whole_session() {
        let policy = ResearchSection::default();
        let fast = config(Speed::Fast, 3);
        assert_eq!(fast.max_search_questions(&policy, 5, 0), 2);
        assert_eq!(fast.max_search_questions(&policy, 4, 1), 1);
        assert_eq!(fast.max_search_questions(&policy, 3, 2), 0);
        assert_eq!(fast.max_search_questions(&policy, 1, 0), 1);
        assert_eq!(config(Speed::Deep, 3).max_search_questions(&policy, 6, 4), 6);
    }

    #[test]
    fn test_validate_depth() {
        assert!(config(Speed::Fast, 0).validate().is_err());
        assert!(config(Speed::Fast, 6).validate().is_err());
        assert!(config(Speed::Fast, 5).validate().is_ok());
    }

    #[test]
    fn test_status_edges() {
        use ResearchStatus::*;
        assert!(Initialized.can_transition_to(ClarificationNeeded));
        assert!(Initialized.can_transition_to(QueryRefined));
        assert!(!Initialized.can_transition_to(QueryDecomposed));
        assert!(!QueryDecomposed.can_transition_to(QueryRefined));
        for s in [
            Initialized,
            ClarificationNeeded,
            QueryRefined,
            QueryDecomposed,
            SearchCompleted,
            SummariesCompleted,
        ] {
            assert!(s.can_transition_to(Error), "{s} should reach error");
        }
        assert!(!Completed.can_transition_to(Error));
        assert!(!Error.can_transition_to(Initialized));
    }

    #[test]
    fn test_transition_sets_progress_and_rejects_illegal_edges() {
        let mut state = ResearchState::new("s1", "What is AI?", ResearchConfig::default());
        assert!(!state.transition(ResearchStatus::SearchCompleted));
        assert_eq!(state.status(), ResearchStatus::Initialized);

        assert!(state.transition(ResearchStatus::ClarificationNeeded));
        assert_eq!(state.progress(), 0.2);
        assert!(state.advance_to(ResearchStatus::QueryDecomposed));
        assert_eq!(state.progress(), 0.5);

        state.fail("boom");
        assert_eq!(state.status(), ResearchStatus::Error);
        assert_eq!(state.progress(), 0.5);
        assert_eq!(state.errors, vec!["boom".to_string()]);
    }

    #[test]
    fn test_bump_progress_stays_below_next_stage() {
        let mut state = ResearchState::new("s1", "q", ResearchConfig::default());
        state.advance_to(ResearchStatus::QueryDecomposed);
        state.bump_progress(0.65);
        assert_eq!(state.progress(), 0.65);
        state.bump_progress(0.95);
        assert!(state.progress() < 0.8);
        state.bump_progress(0.6);
        assert!(state.progress() > 0.6, "progress must not go backwards");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ResearchStatus::SummariesCompleted).unwrap();
        assert_eq!(json, "\"summaries_completed\"");
        let cfg: ResearchConfig =
            serde_json::from_str(r#"{"speed":"deep","output_format":"bullet_list"}"#).unwrap();
        assert_eq!(cfg.speed, Speed::Deep);
        assert_eq!(cfg.depth_and_breadth, 3);
    }
}
