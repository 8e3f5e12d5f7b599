//! 研究阶段函数
//!
//! 六个阶段各自读写 ResearchState，并只通过 ModelGateway 与 SearchBackend 访问外部：
//! - **clarify**: 生成澄清问题
//! - **refine**: 根据澄清答案生成细化查询
//! - **decompose**: 分解为子问题
//! - **search**: 按子问题并发检索（带总时长预算）
//! - **summarize**: 摘要与事实核查
//! - **report**: 按输出格式生成最终报告（含大纲检测与一次重试）
//!
//! 阶段函数从不 panic 或向外抛错：问题以 StageIssue 返回，由编排器决定兜底方式。

pub mod clarify;
pub mod decompose;
pub mod parse;
pub mod refine;
pub mod report;
pub mod search;
pub mod summarize;
pub mod templates;

use std::sync::Arc;

use crate::config::ResearchSection;
use crate::llm::ModelGateway;
use crate::search::SearchBackend;

pub use parse::{is_outline_only, parse_list_items};
pub use templates::DEFAULT_CLARIFICATION_ANSWER;

/// 阶段函数的执行环境：两个网关与校准阈值
#[derive(Clone)]
pub struct Stages {
    model: ModelGateway,
    search: Arc<dyn SearchBackend>,
    policy: ResearchSection,
}

impl Stages {
    pub fn new(model: ModelGateway, search: Arc<dyn SearchBackend>, policy: ResearchSection) -> Self {
        Self {
            model,
            search,
            policy,
        }
    }

    pub fn policy(&self) -> &ResearchSection {
        &self.policy
    }
}
