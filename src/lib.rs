//! OpenResearch - Rust 多阶段研究工作流引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 研究状态机、错误与恢复、会话存储、编排器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、提示词与模型网关
//! - **observability**: tracing 日志初始化
//! - **research**: 六个阶段函数（澄清、细化、分解、检索、摘要、报告）
//! - **search**: 检索网关（SearxNG 与离线兜底）

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod research;
pub mod search;

pub use crate::core::{ResearchConfig, ResearchOrchestrator, ResearchState, ResearchStatus};
