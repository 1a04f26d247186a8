//! boardlens CLI: run one dashboard refresh and print the published view.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;

use boardlens::config::load_config;
use boardlens::refresh::{ConfirmLivePull, RefreshOrchestrator, RefreshOutcome};
use boardlens::state::{DashboardState, ViewState};
use boardlens::{FilterSelection, HttpDashboardApi, ViewMode};

/// Interactive y/N prompt on the controlling terminal.
struct TerminalConfirm;

#[async_trait]
impl ConfirmLivePull for TerminalConfirm {
    async fn confirm_live_pull(&self, prompt: &str) -> bool {
        let prompt = format!("{prompt} [y/N] ");
        tokio::task::spawn_blocking(move || {
            let mut stdout = io::stdout();
            let _ = write!(stdout, "{prompt}");
            let _ = stdout.flush();
            let mut answer = String::new();
            if io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim(), "y" | "Y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

struct CliArgs {
    sync: bool,
    mode: Option<ViewMode>,
    jql: Option<String>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = CliArgs {
        sync: false,
        mode: None,
        jql: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sync" => args.sync = true,
            "--mode" => {
                let value = iter.next().ok_or("--mode needs a value")?;
                args.mode = Some(value.parse()?);
            }
            "--jql" => {
                args.jql = Some(iter.next().ok_or("--jql needs a value")?);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: boardlens [--sync] [--mode member|sprint] [--jql <jql>]");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let api = match HttpDashboardApi::new(&config.server_url, config.request_timeout_seconds) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Failed to build HTTP client: {err}");
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(DashboardState::new());
    let orchestrator = RefreshOrchestrator::new(api, TerminalConfirm, state.clone());
    orchestrator.set_mode(args.mode.or(config.default_mode).unwrap_or_default());
    if let Some(jql) = args.jql {
        orchestrator.set_filters(FilterSelection {
            custom_jql: Some(jql),
            ..Default::default()
        });
    }

    let outcome = if args.sync {
        orchestrator.sync_and_refresh().await
    } else {
        orchestrator.refresh().await
    };

    print!("{}", render(&state.snapshot()));

    match outcome {
        RefreshOutcome::Completed => ExitCode::SUCCESS,
        other => {
            log::warn!("refresh ended with {other:?}");
            ExitCode::FAILURE
        }
    }
}

fn render(view: &ViewState) -> String {
    let mut out = String::new();

    out.push_str(&format!("JQL: {}\n", view.status.query_preview));
    out.push_str(&format!("{}\n", view.status.cache_source));
    if let Some(at) = view.last_refresh_at {
        out.push_str(&format!("最近刷新：{}\n", at.format("%Y-%m-%d %H:%M:%S")));
    }

    if let Some(board) = &view.board {
        out.push('\n');
        for column in &board.columns {
            out.push_str(&format!("{} ({})\n", column.name, column.cards.len()));
            for card in &column.cards {
                out.push_str(&format!(
                    "  {} {} [{} | {}]\n",
                    card.key, card.summary, card.assignee, card.priority
                ));
            }
        }

        for group in &board.metrics {
            out.push_str(&format!("\n团队：{}\n", group.team_name));
            for row in &group.rows {
                let keys = if row.resolved_issue_keys.is_empty() {
                    "-".to_string()
                } else {
                    row.resolved_issue_keys.join(", ")
                };
                let lead = row
                    .avg_lead_time_hours
                    .map(|hours| format!("{hours:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                out.push_str(&format!(
                    "  {} | 总数 {} | 已解决 {} ({keys}) | 解决率 {:.2}% | WIP {} | LeadTime {lead} | 加权进度 {:.2}%\n",
                    row.assignee,
                    row.total,
                    row.resolved,
                    row.resolution_rate,
                    row.wip,
                    row.weighted_progress
                ));
            }
            let subtotal = &group.subtotal;
            let lead = subtotal
                .avg_lead_time_hours
                .map(|hours| format!("{hours:.2}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  小计 | 总数 {} | 已解决 {} (-) | 解决率 {:.2}% | WIP {} | LeadTime {lead} | 加权进度 -\n",
                subtotal.total, subtotal.resolved, subtotal.resolution_rate, subtotal.wip
            ));
        }

        let summary = &board.summary;
        out.push_str(&format!(
            "\n本周期分配 {} | 已解决 {} | 未解决 {} | 重开 {} | New Issue {} | 评估后转出 {} | 净变化 {}\n",
            summary.assigned,
            summary.resolved,
            summary.unresolved,
            summary.reopened,
            summary.new_issue,
            summary.transfer_out,
            summary.net_change
        ));
        out.push_str(&format!("{}\n", summary.summary_text));
        out.push_str(&format!("{}\n", summary.issue_keys_block));
    }

    if let Some(timeline) = &view.timeline {
        out.push('\n');
        for lane in &timeline.lanes {
            out.push_str(&format!("{}\n", lane.name));
            for bar in &lane.bars {
                // One block per 10 hour-units of display width.
                let segments = (bar.width / 10.0).ceil().max(1.0) as usize;
                out.push_str(&format!(
                    "  {} {} ({:.1}h)\n",
                    "█".repeat(segments),
                    bar.key,
                    bar.duration_hours
                ));
            }
        }
    }

    if let Some(links) = &view.export_links {
        out.push_str(&format!(
            "\nCSV: {}\nXLSX: {}\nPNG: {}\n",
            links.csv, links.xlsx, links.png
        ));
    }

    out
}
