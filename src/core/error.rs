//! 错误类型：对外 API 错误与阶段内的问题
//!
//! StageIssue 与 RecoveryEngine 配合：阶段函数只报告问题，是否兜底、兜底成什么由编排器决定。

use thiserror::Error;

/// 六个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Clarification,
    Refinement,
    Decomposition,
    Search,
    Summarization,
    Report,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clarification => "clarification",
            Stage::Refinement => "refinement",
            Stage::Decomposition => "decomposition",
            Stage::Search => "search",
            Stage::Summarization => "summarization",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 编排器对外操作的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResearchError {
    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session {0} already exists")]
    SessionExists(String),

    #[error("Research query must not be empty")]
    InvalidQuery,

    #[error("Invalid research config: {0}")]
    InvalidConfig(String),
}

/// 阶段执行中遇到的问题
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageIssue {
    /// 可用兜底内容替代，流程继续
    #[error("{stage} stage degraded: {reason}")]
    Recoverable { stage: Stage, reason: String },

    /// 该阶段没有可用结果
    #[error("{stage} stage failed: {reason}")]
    Fatal { stage: Stage, reason: String },
}

impl StageIssue {
    pub fn recoverable(stage: Stage, reason: impl Into<String>) -> Self {
        StageIssue::Recoverable {
            stage,
            reason: reason.into(),
        }
    }

    pub fn fatal(stage: Stage, reason: impl Into<String>) -> Self {
        StageIssue::Fatal {
            stage,
            reason: reason.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageIssue::Recoverable { stage, .. } | StageIssue::Fatal { stage, .. } => *stage,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StageIssue::Fatal { .. })
    }
}

/// 阶段函数的返回值
pub type StageResult = Result<(), StageIssue>;
