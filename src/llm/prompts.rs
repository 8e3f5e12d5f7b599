//! 研究流程使用的提示词模板
//!
//! 每个模板以固定的开场白开头（`preamble`），变量写作 `{name}`，由 ModelGateway 渲染。

use std::collections::BTreeMap;

/// 模板变量：名称 -> 取值
pub type PromptVars = BTreeMap<String, String>;

/// 便捷构造 PromptVars：`prompt_vars([("query", q.to_string())])`
pub fn prompt_vars<const N: usize>(pairs: [(&str, String); N]) -> PromptVars {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// 模板名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Clarification,
    Refinement,
    Decomposition,
    Summarization,
    FactCheck,
    FullReport,
    ExecutiveSummary,
    BulletList,
}

impl PromptKind {
    pub const ALL: [PromptKind; 8] = [
        PromptKind::Clarification,
        PromptKind::Refinement,
        PromptKind::Decomposition,
        PromptKind::Summarization,
        PromptKind::FactCheck,
        PromptKind::FullReport,
        PromptKind::ExecutiveSummary,
        PromptKind::BulletList,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PromptKind::Clarification => "clarification",
            PromptKind::Refinement => "refinement",
            PromptKind::Decomposition => "decomposition",
            PromptKind::Summarization => "summarization",
            PromptKind::FactCheck => "fact_check",
            PromptKind::FullReport => "full_report",
            PromptKind::ExecutiveSummary => "executive_summary",
            PromptKind::BulletList => "bullet_list",
        }
    }

    /// 模板首行，用于从渲染后的文本反查模板（Mock 后端依赖它）
    pub fn preamble(&self) -> &'static str {
        match self {
            PromptKind::Clarification => "You help researchers sharpen a research request.",
            PromptKind::Refinement => "You turn a research request and the user's clarifications into one refined query.",
            PromptKind::Decomposition => "You split a research query into independent sub-questions.",
            PromptKind::Summarization => "You summarize web search results for one research question.",
            PromptKind::FactCheck => "You fact-check a summary against the search results it was written from.",
            PromptKind::FullReport => "You write full research reports.",
            PromptKind::ExecutiveSummary => "You write executive summaries of research findings.",
            PromptKind::BulletList => "You write bullet-point digests of research findings.",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            PromptKind::Clarification => CLARIFICATION,
            PromptKind::Refinement => REFINEMENT,
            PromptKind::Decomposition => DECOMPOSITION,
            PromptKind::Summarization => SUMMARIZATION,
            PromptKind::FactCheck => FACT_CHECK,
            PromptKind::FullReport => FULL_REPORT,
            PromptKind::ExecutiveSummary => EXECUTIVE_SUMMARY,
            PromptKind::BulletList => BULLET_LIST,
        }
    }

    /// 根据渲染后的提示词开头判断模板类型
    pub fn detect(prompt: &str) -> Option<PromptKind> {
        let head = prompt.trim_start();
        Self::ALL.into_iter().find(|k| head.starts_with(k.preamble()))
    }

    /// 渲染模板：单遍替换 `{name}`，缺失的变量替换为空串
    pub fn render(&self, vars: &PromptVars) -> String {
        placeholder_regex()
            .replace_all(self.template(), |caps: &regex::Captures| {
                vars.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

fn placeholder_regex() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{([a-z_]+)\}").expect("static regex"))
}

const CLARIFICATION: &str = "You help researchers sharpen a research request.
Write 3 short clarification questions that would tell you what the user really wants to learn.

Research query: {query}

Answer with a numbered list, one question per line.
";

const REFINEMENT: &str = "You turn a research request and the user's clarifications into one refined query.

Original query: {original_query}

Clarifications:
{clarification_qa}

Preferences:
- Output format: {output_format}
- Research speed: {research_speed}
- Depth and breadth (1-5): {depth_breadth}

Write a single detailed research query that captures the user's needs:
";

const DECOMPOSITION: &str = "You split a research query into independent sub-questions.
Each sub-question must be specific, searchable on the web and must not overlap with the others.

Research query: {query}
Number of sub-questions: {num_questions}

Answer with exactly {num_questions} sub-questions as a numbered list, one per line.
";

const SUMMARIZATION: &str = "You summarize web search results for one research question.

Question: {question}

Search results:
{results}

Write a factual summary of {length} that answers the question from these results.
Cite sources by title or URL, point out contradictions, and say so when the results do not answer the question.
";

const FACT_CHECK: &str = "You fact-check a summary against the search results it was written from.

Question: {question}

Search results:
{results}

Summary:
{summary}

If every claim is supported, reply with a line starting with \"VERIFIED\".
Otherwise list the unsupported or contradicted claims.
";

const FULL_REPORT: &str = "You write full research reports.

Research query: {query}

Findings per sub-question:
{summaries}

Write a complete report with an executive summary, an introduction, findings grouped under headings,
analysis of implications, a conclusion and references. Every section must contain developed paragraphs.
{extra_instructions}
";

const EXECUTIVE_SUMMARY: &str = "You write executive summaries of research findings.

Research query: {query}

Findings per sub-question:
{summaries}

Write a one to two page executive summary: the 3-5 key findings, their strategic implications and
recommendations where they apply. Be direct and focus on actionable insight.
{extra_instructions}
";

const BULLET_LIST: &str = "You write bullet-point digests of research findings.

Research query: {query}

Findings per sub-question:
{summaries}

Open with a short introduction paragraph, then list every key finding as an informative bullet,
grouped into logical categories.
{extra_instructions}
";
