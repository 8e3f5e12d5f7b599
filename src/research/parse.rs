//! 模型输出的行级解析：编号/项目符号列表提取与「只有大纲」检测

use std::sync::OnceLock;

use regex::Regex;

use crate::config::ResearchSection;

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[-•*]\s+|(?:10|[1-9])[.)]\s*)(.*)$").expect("static regex"))
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:#{1,6}\s+\S|\d+(?:\.\d+)*[.)]?\s+\S|[IVXLCDM]+[.)]\s*\S|[A-Z][.)]\s+\S)")
            .expect("static regex")
    })
}

/// 提取以 `- `、`• `、`* ` 或 `1.`..`10.`（也接受 `1)`）开头的行，去掉标记与包裹的 `**`
pub fn parse_list_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let line = line.strip_prefix("**").unwrap_or(line);
            let caps = list_item_regex().captures(line)?;
            let item = caps[1].trim().trim_matches('*').trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

/// 报告的行形状统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineShape {
    pub headings: usize,
    pub long_lines: usize,
}

pub fn line_shape(text: &str, long_line_chars: usize) -> LineShape {
    let mut shape = LineShape {
        headings: 0,
        long_lines: 0,
    };
    for line in text.lines() {
        let line = line.trim().trim_start_matches(['*', '_']);
        if line.is_empty() {
            continue;
        }
        let len = line.chars().count();
        if len < long_line_chars && heading_regex().is_match(line) {
            shape.headings += 1;
        } else if len >= long_line_chars {
            shape.long_lines += 1;
        }
    }
    shape
}

/// 标题行多、成段正文少时认为只是大纲
pub fn is_outline_only(text: &str, policy: &ResearchSection) -> bool {
    let shape = line_shape(text, policy.outline_long_line_chars);
    shape.headings >= policy.outline_min_headings
        && shape.long_lines <= policy.outline_max_long_lines
        && shape.headings as f64 >= policy.outline_heading_ratio * shape.long_lines as f64
}
