//! 核心层：研究状态机、错误与恢复、会话存储与编排器

pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod session_store;
pub mod state;

pub use error::{ResearchError, Stage, StageIssue, StageResult};
pub use orchestrator::ResearchOrchestrator;
pub use recovery::{RecoveryAction, RecoveryEngine, RunMode};
pub use session_store::{MemorySessionStore, SessionHandle, SessionStore};
pub use state::{OutputFormat, ResearchConfig, ResearchState, ResearchStatus, Speed};
