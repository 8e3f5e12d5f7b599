//! 检索网关：SearchBackend 抽象、SearxNG 实现与离线兜底内容
//!
//! 研究阶段只依赖 SearchBackend；实时检索失败时由 `fallback` 给出与查询关键词相关的合成内容。

pub mod fallback;
pub mod searxng;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fallback::FallbackCatalog;
pub use searxng::SearxngSearch;

/// 单条检索结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }

    /// 供摘要提示词使用的文本块
    pub fn render(&self) -> String {
        format!("Title: {}\nURL: {}\nContent: {}", self.title, self.url, self.content)
    }
}

#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search backend returned HTTP {0}")]
    Status(u16),

    #[error("could not decode search response: {0}")]
    Decode(String),

    #[error("search timed out")]
    Timeout,
}

/// 检索后端
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// 实时检索，最多返回 desired_count 条
    async fn search(&self, query: &str, desired_count: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// 合成的兜底内容；不得失败，可以返回空列表
    fn fallback(&self, query: &str) -> Vec<SearchHit>;
}
