//! OpenResearch 命令行入口
//!
//! 创建会话、交互式回答澄清问题，然后一次跑完整个研究流程并输出报告。

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use openresearch::config::{load_config, AppConfig};
use openresearch::core::{OutputFormat, ResearchConfig, ResearchOrchestrator, ResearchStatus, Speed};
use openresearch::observability;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "openresearch")]
#[command(about = "OpenResearch: multi-stage research workflow from the command line")]
struct Args {
    /// Research query
    #[arg(trailing_var_arg = true, required = true)]
    query: Vec<String>,

    /// Research speed (default from config)
    #[arg(short, long, value_enum)]
    speed: Option<SpeedArg>,

    /// Report format (default from config)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Depth and breadth, 1-5 (default from config)
    #[arg(short, long, value_name = "N")]
    depth: Option<u8>,

    /// Do not ask clarification questions
    #[arg(long)]
    skip_clarification: bool,

    /// Print the final research state as JSON
    #[arg(long)]
    json: bool,

    /// Save the report to this file
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Extra config file, layered over config/default.toml
    #[arg(short, long, value_name = "PATH", env = "OPENRESEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose: debug logs for stages and gateways
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SpeedArg {
    Fast,
    Balanced,
    Deep,
}

impl From<SpeedArg> for Speed {
    fn from(s: SpeedArg) -> Self {
        match s {
            SpeedArg::Fast => Speed::Fast,
            SpeedArg::Balanced => Speed::Balanced,
            SpeedArg::Deep => Speed::Deep,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    FullReport,
    ExecutiveSummary,
    BulletList,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::FullReport => OutputFormat::FullReport,
            FormatArg::ExecutiveSummary => OutputFormat::ExecutiveSummary,
            FormatArg::BulletList => OutputFormat::BulletList,
        }
    }
}

fn research_config(args: &Args, cfg: &AppConfig) -> ResearchConfig {
    ResearchConfig {
        speed: args.speed.map(Speed::from).unwrap_or(cfg.app.default_speed),
        output_format: args
            .format
            .map(OutputFormat::from)
            .unwrap_or(cfg.app.default_output_format),
        depth_and_breadth: args.depth.unwrap_or(cfg.app.default_depth),
        skip_clarification: args.skip_clarification,
    }
}

/// 逐个读取答案；空行表示跳过该问题
async fn ask_clarifications(questions: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut answers = Vec::new();
    eprintln!("\nA few questions to focus the research (press Enter to skip):");
    for (i, q) in questions.iter().enumerate() {
        eprintln!("\n{}. {}", i + 1, q);
        eprint!("> ");
        let Some(line) = lines.next_line().await.context("Failed to read answer")? else {
            break;
        };
        let answer = line.trim();
        if !answer.is_empty() {
            answers.push((q.clone(), answer.to_string()));
        }
    }
    Ok(answers)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    observability::init_with_filter(if args.verbose { "openresearch=debug,info" } else { "warn" });

    let cfg = load_config(args.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let query = args.query.join(" ");
    let orchestrator = ResearchOrchestrator::from_config(&cfg);
    let session_id = uuid::Uuid::new_v4().to_string();

    orchestrator
        .create_session(session_id.as_str(), &query, research_config(&args, &cfg))
        .await
        .context("Failed to create research session")?;

    let state = orchestrator.start_research(&session_id).await?;
    if state.status() == ResearchStatus::ClarificationNeeded && !state.clarification_questions.is_empty() {
        let answers = ask_clarifications(&state.clarification_questions).await?;
        orchestrator
            .add_clarification_answers(&session_id, answers)
            .await?;
    }

    eprintln!("\nResearching...");
    let state = orchestrator.run_full_research(&session_id).await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("Failed to serialize research state")?
        );
    } else if !state.final_report.is_empty() {
        println!("{}", state.final_report);
    }

    if !state.errors.is_empty() {
        eprintln!("\n{} issue(s) during research:", state.errors.len());
        for e in &state.errors {
            eprintln!("  - {e}");
        }
    }

    if let Some(path) = &args.save {
        if !state.final_report.is_empty() {
            std::fs::write(path, &state.final_report)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            eprintln!("\nReport saved to {}", path.display());
        }
    }

    if state.status() != ResearchStatus::Completed {
        bail!("Research ended with status {}", state.status());
    }
    Ok(())
}
