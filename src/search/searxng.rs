//! SearxNG 检索后端：超时、结果条数与单条大小限制
//!
//! `GET {base_url}/search?q=...&format=json`；结果片段常带 HTML 标签，用 html2text 提取可读文本，
//! 超过 max_result_chars 时截断并追加 ...[truncated]。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde::Deserialize;

use crate::config::SearchSection;
use crate::search::{FallbackCatalog, SearchBackend, SearchError, SearchHit};

const DEFAULT_USER_AGENT: &str = "openresearch/0.1 (+https://github.com/openresearch)";

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// 简易去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(if c.is_whitespace() { ' ' } else { c }),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_like_html(s: &str) -> bool {
    s.contains('<') && (s.contains("</") || s.contains("/>"))
}

pub struct SearxngSearch {
    client: Client,
    base_url: String,
    max_result_chars: usize,
    catalog: FallbackCatalog,
}

impl SearxngSearch {
    pub fn new(section: &SearchSection) -> Self {
        let user_agent = section
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let client = Client::builder()
            .timeout(Duration::from_secs(section.timeout_secs))
            .user_agent(user_agent)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: section.base_url.trim_end_matches('/').to_string(),
            max_result_chars: section.max_result_chars,
            catalog: FallbackCatalog::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: FallbackCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    fn clean_content(&self, raw: &str) -> String {
        let text = if looks_like_html(raw) {
            match from_read(raw.as_bytes(), 120) {
                Ok(text) if !text.trim().is_empty() => text,
                _ => strip_html_tags(raw),
            }
        } else {
            raw.to_string()
        };
        let text = text.trim();
        if text.chars().count() > self.max_result_chars {
            text.chars().take(self.max_result_chars).collect::<String>() + "\n...[truncated]"
        } else {
            text.to_string()
        }
    }
}

#[async_trait]
impl SearchBackend for SearxngSearch {
    async fn search(&self, query: &str, desired_count: usize) -> Result<Vec<SearchHit>, SearchError> {
        tracing::info!(query = %query, desired_count, "searxng search");
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Request(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(SearchError::Status(resp.status().as_u16()));
        }

        let body: SearxngResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .take(desired_count)
            .map(|r| SearchHit::new(r.title, r.url, self.clean_content(&r.content)))
            .collect();
        tracing::info!(query = %query, found = hits.len(), "searxng results");
        Ok(hits)
    }

    fn fallback(&self, query: &str) -> Vec<SearchHit> {
        self.catalog.lookup(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(max_chars: usize) -> SearxngSearch {
        SearxngSearch::new(&SearchSection {
            max_result_chars: max_chars,
            ..SearchSection::default()
        })
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(strip_html_tags("<b>Rust</b>  is\n<i>fast</i>"), "Rust is fast");
    }

    #[test]
    fn test_clean_content_truncates() {
        let out = backend(10).clean_content("abcdefghijklmnopqrstuvwxyz");
        assert!(out.starts_with("abcdefghij"));
        assert!(out.ends_with("...[truncated]"));
    }

    #[test]
    fn test_parse_response_tolerates_missing_fields() {
        let body: SearxngResponse =
            serde_json::from_str(r#"{"results":[{"title":"T","url":"https://x"}]}"#).unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].content, "");
    }
}
