//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `OPENRESEARCH__*` 覆盖（双下划线表示嵌套，如 `OPENRESEARCH__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::{OutputFormat, Speed};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub research: ResearchSection,
}

/// [app] 段：应用名与新会话的默认研究参数
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default)]
    pub default_speed: Speed,
    #[serde(default)]
    pub default_output_format: OutputFormat,
    #[serde(default = "default_depth")]
    pub default_depth: u8,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            default_speed: Speed::default(),
            default_output_format: OutputFormat::default(),
            default_depth: default_depth(),
        }
    }
}

fn default_depth() -> u8 {
    3
}

/// [llm] 段：后端选择、超时与重试
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；没有 API Key 时一律回落到 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
    #[serde(default)]
    pub retry: LlmRetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
            retry: LlmRetrySection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次模型请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmRetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    500
}

/// [search] 段：SearxNG 地址、请求超时、单条结果最大字符数
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
    pub user_agent: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            timeout_secs: default_search_timeout_secs(),
            max_result_chars: default_max_result_chars(),
            user_agent: None,
        }
    }
}

fn default_search_base_url() -> String {
    "http://searxng:8080".to_string()
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_max_result_chars() -> usize {
    2000
}

/// [research] 段：各阶段的校准阈值
///
/// 这些数值是经验标定的策略常量，不从其它参数推导；改动前请对照实际模型输出。
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchSection {
    /// 摘要最少字符数，低于此值视为该子问题失败
    #[serde(default = "default_min_summary_chars")]
    pub min_summary_chars: usize,
    /// 报告最少字符数，低于此值仅告警
    #[serde(default = "default_min_report_chars")]
    pub min_report_chars: usize,
    /// 无答案时连续 continue 的次数上限，达到后自动填充默认答案
    #[serde(default = "default_attempt_threshold")]
    pub clarification_attempt_threshold: u32,
    #[serde(default = "default_search_budget_fast_secs")]
    pub search_budget_fast_secs: u64,
    #[serde(default = "default_search_budget_deep_secs")]
    pub search_budget_deep_secs: u64,
    #[serde(default = "default_search_budget_default_secs")]
    pub search_budget_default_secs: u64,
    /// fast 模式最多检索的子问题数
    #[serde(default = "default_fast_max_questions")]
    pub fast_max_questions: usize,
    #[serde(default = "default_outline_min_headings")]
    pub outline_min_headings: usize,
    #[serde(default = "default_outline_heading_ratio")]
    pub outline_heading_ratio: f64,
    #[serde(default = "default_outline_long_line_chars")]
    pub outline_long_line_chars: usize,
    #[serde(default = "default_outline_max_long_lines")]
    pub outline_max_long_lines: usize,
    /// run_full_research 单次调用最多推进的步数
    #[serde(default = "default_max_full_run_steps")]
    pub max_full_run_steps: usize,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            min_summary_chars: default_min_summary_chars(),
            min_report_chars: default_min_report_chars(),
            clarification_attempt_threshold: default_attempt_threshold(),
            search_budget_fast_secs: default_search_budget_fast_secs(),
            search_budget_deep_secs: default_search_budget_deep_secs(),
            search_budget_default_secs: default_search_budget_default_secs(),
            fast_max_questions: default_fast_max_questions(),
            outline_min_headings: default_outline_min_headings(),
            outline_heading_ratio: default_outline_heading_ratio(),
            outline_long_line_chars: default_outline_long_line_chars(),
            outline_max_long_lines: default_outline_max_long_lines(),
            max_full_run_steps: default_max_full_run_steps(),
        }
    }
}

fn default_min_summary_chars() -> usize {
    50
}

fn default_min_report_chars() -> usize {
    1500
}

fn default_attempt_threshold() -> u32 {
    3
}

fn default_search_budget_fast_secs() -> u64 {
    15
}

fn default_search_budget_deep_secs() -> u64 {
    25
}

fn default_search_budget_default_secs() -> u64 {
    20
}

fn default_fast_max_questions() -> usize {
    2
}

fn default_outline_min_headings() -> usize {
    3
}

fn default_outline_heading_ratio() -> f64 {
    1.5
}

fn default_outline_long_line_chars() -> usize {
    80
}

fn default_outline_max_long_lines() -> usize {
    4
}

fn default_max_full_run_steps() -> usize {
    16
}

/// 从 config 目录加载配置，环境变量 OPENRESEARCH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 OPENRESEARCH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("OPENRESEARCH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_calibrated_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.research.min_summary_chars, 50);
        assert_eq!(cfg.research.min_report_chars, 1500);
        assert_eq!(cfg.research.clarification_attempt_threshold, 3);
        assert_eq!(cfg.research.search_budget_fast_secs, 15);
        assert_eq!(cfg.research.search_budget_deep_secs, 25);
        assert_eq!(cfg.research.search_budget_default_secs, 20);
        assert_eq!(cfg.app.default_depth, 3);
        assert_eq!(cfg.search.base_url, "http://searxng:8080");
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[app]
default_speed = "fast"
default_depth = 2

[research]
min_report_chars = 800
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.default_speed, Speed::Fast);
        assert_eq!(cfg.app.default_depth, 2);
        assert_eq!(cfg.research.min_report_chars, 800);
        // 未覆盖的键保持默认
        assert_eq!(cfg.research.min_summary_chars, 50);
    }
}
