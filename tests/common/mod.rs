//! 集成测试共用的脚本化 LLM 与检索后端

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use openresearch::config::ResearchSection;
use openresearch::core::{MemorySessionStore, ResearchOrchestrator};
use openresearch::llm::{LlmClient, LlmError, Message, MockLlmClient, ModelGateway, PromptKind};
use openresearch::research::Stages;
use openresearch::search::{FallbackCatalog, SearchBackend, SearchError, SearchHit};

type LlmScript = dyn Fn(PromptKind, &str) -> Option<Result<String, LlmError>> + Send + Sync;

/// 按模板类型回放脚本；脚本返回 None 时交给 MockLlmClient
pub struct ScriptedLlm {
    script: Box<LlmScript>,
    calls: Mutex<Vec<PromptKind>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(PromptKind, &str) -> Option<Result<String, LlmError>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn mock() -> Arc<Self> {
        Self::new(|_, _| None)
    }

    pub fn calls(&self, kind: PromptKind) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| **k == kind).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// 最后一次该类型调用的完整提示词
    pub fn last_prompt(&self, kind: PromptKind) -> Option<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| PromptKind::detect(p) == Some(kind))
            .cloned()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if let Some(kind) = PromptKind::detect(&prompt) {
            self.calls.lock().unwrap().push(kind);
            self.prompts.lock().unwrap().push(prompt.clone());
            if let Some(result) = (self.script)(kind, &prompt) {
                return result;
            }
        }
        MockLlmClient.complete(messages).await
    }
}

type SearchScript = dyn Fn(&str) -> Result<Vec<SearchHit>, SearchError> + Send + Sync;

/// 脚本化检索：可选离线兜底与对特定查询的延迟
pub struct ScriptedSearch {
    script: Box<SearchScript>,
    with_fallback: bool,
    slow_on: Option<(String, Duration)>,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<SearchHit>, SearchError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            with_fallback: false,
            slow_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 每个查询返回两条结果
    pub fn healthy() -> Self {
        Self::new(|q| Ok(hits_for(q)))
    }

    /// 实时检索总是失败
    pub fn unreachable() -> Self {
        Self::new(|_| Err(SearchError::Request("connection refused".into())))
    }

    pub fn with_fallback(mut self) -> Self {
        self.with_fallback = true;
        self
    }

    pub fn slow_on(mut self, needle: &str, delay: Duration) -> Self {
        self.slow_on = Some((needle.to_string(), delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    async fn search(&self, query: &str, desired_count: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((needle, delay)) = &self.slow_on {
            if query.contains(needle.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        let mut hits = (self.script)(query)?;
        hits.truncate(desired_count);
        Ok(hits)
    }

    fn fallback(&self, query: &str) -> Vec<SearchHit> {
        if self.with_fallback {
            FallbackCatalog::new().lookup(query)
        } else {
            Vec::new()
        }
    }
}

pub fn hits_for(query: &str) -> Vec<SearchHit> {
    vec![
        SearchHit::new(
            format!("Overview: {query}"),
            "https://example.org/overview",
            format!("A detailed overview that answers {query} with definitions and examples."),
        ),
        SearchHit::new(
            format!("Analysis: {query}"),
            "https://example.org/analysis",
            format!("An analysis of {query} covering recent work and open problems."),
        ),
    ]
}

pub fn orchestrator(
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchBackend>,
    policy: ResearchSection,
) -> ResearchOrchestrator {
    let stages = Stages::new(ModelGateway::new(llm), search, policy);
    ResearchOrchestrator::new(stages, Arc::new(MemorySessionStore::new()))
}

pub fn default_orchestrator() -> ResearchOrchestrator {
    orchestrator(
        ScriptedLlm::mock(),
        Arc::new(ScriptedSearch::healthy()),
        ResearchSection::default(),
    )
}

/// 形如大纲的报告：短标题行，几乎没有正文
pub fn outline_report() -> String {
    [
        "# Report",
        "I. Introduction",
        "II. Background",
        "III. Findings",
        "IV. Analysis",
        "V. Conclusion",
    ]
    .join("\n")
}
