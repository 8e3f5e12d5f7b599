//! 最终报告生成

use crate::core::{OutputFormat, ResearchState, ResearchStatus, Stage, StageIssue, StageResult};
use crate::llm::{prompt_vars, PromptKind};
use crate::research::{is_outline_only, Stages};

const PROSE_AMENDMENT: &str = "Your previous answer was only an outline. Write the complete report in full paragraphs of prose under each heading. Do not return a list of headings.";

fn prompt_kind(format: OutputFormat) -> PromptKind {
    match format {
        OutputFormat::FullReport => PromptKind::FullReport,
        OutputFormat::ExecutiveSummary => PromptKind::ExecutiveSummary,
        OutputFormat::BulletList => PromptKind::BulletList,
    }
}

/// 按子问题顺序拼接摘要，✓ 表示已通过事实核查
pub fn format_summaries(state: &ResearchState) -> String {
    state
        .sub_questions
        .iter()
        .filter_map(|q| state.summaries.get(q).map(|s| (q, s)))
        .enumerate()
        .map(|(i, (q, summary))| {
            let mark = if state.fact_checked.get(q).copied().unwrap_or(false) {
                "✓"
            } else {
                "⚠"
            };
            format!("## Question {}: {} {}\n{}", i + 1, q, mark, summary)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl Stages {
    pub async fn generate_final_report(&self, state: &mut ResearchState) -> StageResult {
        if !state.final_report.is_empty() {
            state.log("Report agent: Report already present");
            state.transition(ResearchStatus::Completed);
            return Ok(());
        }

        let kind = prompt_kind(state.config.output_format);
        state.log(format!(
            "Report agent: Generating {} from {} summaries",
            state.config.output_format.as_str(),
            state.summaries.len()
        ));
        tracing::info!(session_id = %state.session_id, format = kind.name(), "generating report");

        let mut vars = prompt_vars([
            ("query", state.effective_query().to_string()),
            ("summaries", format_summaries(state)),
            ("extra_instructions", String::new()),
        ]);

        let mut report = self
            .model
            .invoke(kind, &vars)
            .await
            .map_err(|e| StageIssue::fatal(Stage::Report, e.to_string()))?;

        // 要点列表本身就是编号短行，不做提纲检测
        let outline_gate = state.config.output_format != OutputFormat::BulletList;
        if outline_gate && is_outline_only(&report, &self.policy) {
            tracing::warn!(session_id = %state.session_id, "report looks like an outline, retrying once");
            state.log("Report agent: Output was an outline, retrying with prose instructions");
            vars.insert("extra_instructions".to_string(), PROSE_AMENDMENT.to_string());
            report = self
                .model
                .invoke(kind, &vars)
                .await
                .map_err(|e| StageIssue::fatal(Stage::Report, e.to_string()))?;
            if is_outline_only(&report, &self.policy) {
                return Err(StageIssue::fatal(
                    Stage::Report,
                    "Report generation produced only an outline after retry",
                ));
            }
        }

        let chars = report.chars().count();
        if chars < self.policy.min_report_chars {
            tracing::warn!(session_id = %state.session_id, chars, "report shorter than expected");
            state.log(format!(
                "Report agent: Warning: report is short ({} chars, expected at least {})",
                chars, self.policy.min_report_chars
            ));
        }

        state.final_report = report;
        state.log("Report agent: Report completed");
        state.transition(ResearchStatus::Completed);
        Ok(())
    }
}
