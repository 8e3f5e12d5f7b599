//! 确定性的兜底文本：模型不可用或输出不足时使用

/// 自动填充的澄清答案
pub const DEFAULT_CLARIFICATION_ANSWER: &str =
    "No specific preference - please use your best judgment for a comprehensive overview.";

/// 澄清问题的兜底（3 条）
pub fn fallback_clarification_questions(query: &str) -> Vec<String> {
    vec![
        format!("Could you provide more context about what aspects of '{query}' you're most interested in?"),
        format!("What specific information about '{query}' would be most valuable to you?"),
        format!("Are you looking for recent developments in '{query}' or historical background?"),
    ]
}

/// 分解失败时的 3 条模板子问题
pub fn templated_sub_questions(query: &str) -> Vec<String> {
    vec![
        format!("What is {query}?"),
        format!("What are the key aspects of {query}?"),
        format!("What are the implications of {query}?"),
    ]
}

/// 检索阶段发现没有子问题时使用的 5 条主题子问题
pub fn topic_sub_questions(query: &str) -> Vec<String> {
    vec![
        format!("What is {query}?"),
        format!("What are the key concepts in {query}?"),
        format!("What are the latest developments in {query}?"),
        format!("What are the main challenges in {query}?"),
        format!("What are practical applications of {query}?"),
    ]
}

/// 分解数量不足时补齐用的通用子问题，n 从 1 开始
pub fn filler_sub_question(query: &str, n: usize) -> String {
    let base = format!("What are additional important aspects of {query}?");
    if n <= 1 {
        base
    } else {
        format!("{base} (part {n})")
    }
}

/// 由原始检索文本拼出的占位摘要
pub fn placeholder_summary(question: &str, raw: &str) -> String {
    let excerpt: String = raw.chars().take(800).collect();
    format!(
        "Automated summary unavailable for \"{question}\". Key excerpts from the retrieved sources:\n\n{excerpt}"
    )
}
