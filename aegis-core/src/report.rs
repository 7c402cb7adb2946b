// Report generation from a finished investigation

use crate::investigate::InvestigationOutcome;
use crate::model::{AgentNode, NodeStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

pub fn generate_report(
    format: ReportFormat,
    outcome: &InvestigationOutcome,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(outcome)),
        ReportFormat::Json => generate_json_report(outcome),
        ReportFormat::Markdown => Ok(generate_markdown_report(outcome)),
    }
}

fn symbol_of(outcome: &InvestigationOutcome) -> String {
    outcome
        .investigation
        .as_ref()
        .map(|i| i.symbol.clone())
        .or_else(|| {
            outcome
                .nodes
                .get("validation")
                .and_then(|n| n.data["symbol"].as_str().map(str::to_string))
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn status_tag(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Pending => "[ ]",
        NodeStatus::InProgress => "[~]",
        NodeStatus::Completed => "[+]",
        NodeStatus::Error => "[!]",
    }
}

fn format_duration(node: &AgentNode) -> String {
    node.duration()
        .map(|d| format!("{:.1}s", d.as_secs_f64()))
        .unwrap_or_else(|| "-".to_string())
}

/// Wrap text to `width` columns, prefixing each line with `indent`
pub fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && indent.len() + line.len() + 1 + word.len() > width {
                out.push(format!("{}{}", indent, line));
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        out.push(format!("{}{}", indent, line).trim_end().to_string());
    }
    out.join("\n")
}

pub fn generate_text_report(outcome: &InvestigationOutcome) -> String {
    let nodes = &outcome.nodes;
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                      AEGIS STOCK INVESTIGATION REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Symbol:        {}\n", symbol_of(outcome)));
    if let Some(ref inv) = outcome.investigation {
        report.push_str(&format!("Investigation: {}\n", inv.investigation_id));
        report.push_str(&format!(
            "Date Range:    {} to {}\n",
            inv.date_range.start_date, inv.date_range.end_date
        ));
        report.push_str(&format!(
            "Started:       {}\n",
            inv.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    report.push_str(&format!(
        "Progress:      {}/{} steps completed ({:.0}%)\n",
        nodes.completed_count(),
        nodes.len(),
        nodes.progress_ratio() * 100.0
    ));
    if nodes.error_count() > 0 {
        report.push_str(&format!("Errors:        {}\n", nodes.error_count()));
    }
    if outcome.timed_out {
        report.push_str("Timed Out:     yes\n");
    }
    report.push('\n');

    report.push_str(RULE);
    report.push_str("PIPELINE\n");
    report.push_str(RULE);
    report.push('\n');

    for (idx, node) in nodes.iter().enumerate() {
        report.push_str(&format!(
            "{:>2}. {} {:<9} {} ({})\n",
            idx + 1,
            status_tag(node.status),
            node.node_type.icon(),
            node.label,
            format_duration(node)
        ));
        report.push_str(&wrap_text(&node.description, 80, "              "));
        report.push('\n');
    }
    report.push('\n');

    if !nodes.is_empty() {
        report.push_str("By type:\n");
        for (node_type, completed, total) in nodes.type_summary() {
            report.push_str(&format!(
                "  {:<12} {}/{}\n",
                node_type.label(),
                completed,
                total
            ));
        }
        report.push('\n');
    }

    let analyses: Vec<&AgentNode> = nodes
        .iter()
        .filter(|n| n.id.starts_with("analysis-"))
        .collect();
    if !analyses.is_empty() {
        report.push_str(RULE);
        report.push_str("ANALYST FINDINGS\n");
        report.push_str(RULE);
        report.push('\n');

        for node in analyses {
            report.push_str(&format!("{}\n", node.label));
            if let Some(score) = node.data["confidence_score"].as_f64() {
                report.push_str(&format!("Confidence:    {:.1}/10\n", score));
            }
            if let Some(text) = node.data["raw_analysis"].as_str() {
                report.push('\n');
                report.push_str(&wrap_text(text, 80, "  "));
                report.push_str("\n\n");
            }
            report.push_str(THIN_RULE);
            report.push('\n');
        }
    }

    if let Some(verdict) = outcome.inference() {
        report.push_str(RULE);
        report.push_str("MASTER INFERENCE\n");
        report.push_str(RULE);
        report.push('\n');

        let field = |key: &str| verdict[key].as_str().unwrap_or("-").to_string();
        let movement = &verdict["price_movement"];
        report.push_str(&format!(
            "Movement:       {} {}%\n",
            movement["direction"].as_str().unwrap_or("-"),
            movement["magnitude"].as_str().unwrap_or("-")
        ));
        report.push_str(&format!("Primary Cause:  {}\n", field("primary_cause")));
        report.push_str(&format!(
            "Confidence:     {:.1}/10\n",
            verdict["confidence_score"].as_f64().unwrap_or_default()
        ));
        report.push_str(&format!("Recommendation: {}\n", field("recommendation")));
        if let Some(dominant) = verdict["investigation_summary"]["dominant_factor"].as_str() {
            report.push_str(&format!("Dominant:       {}\n", dominant));
        }
        report.push_str("\nReasoning:\n");
        report.push_str(&wrap_text(&field("detailed_reasoning"), 80, "  "));
        report.push_str("\n\n");
    }

    report.push_str(RULE);
    report.push_str("                               End of Report\n");
    report.push_str(RULE);
    report.push_str("\nGenerated by AEGIS - simulated data, not investment advice.\n\n");

    report
}

pub fn generate_json_report(outcome: &InvestigationOutcome) -> Result<String, serde_json::Error> {
    let nodes = &outcome.nodes;
    let by_type: Vec<Value> = nodes
        .type_summary()
        .into_iter()
        .map(|(t, completed, total)| {
            serde_json::json!({ "type": t, "completed": completed, "total": total })
        })
        .collect();

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "AEGIS",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json",
                "disclaimer": "Simulated data, not investment advice"
            },
            "symbol": symbol_of(outcome),
            "investigation": outcome.investigation,
            "summary": {
                "total_nodes": nodes.len(),
                "completed": nodes.completed_count(),
                "errors": nodes.error_count(),
                "progress": nodes.progress_ratio(),
                "timed_out": outcome.timed_out,
                "by_type": by_type
            },
            "nodes": nodes,
            "inference": outcome.inference()
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(outcome: &InvestigationOutcome) -> String {
    let nodes = &outcome.nodes;
    let symbol = symbol_of(outcome);
    let mut report = String::new();

    report.push_str(&format!("# AEGIS Investigation: {}\n\n", symbol));
    if let Some(ref inv) = outcome.investigation {
        report.push_str(&format!("- **Investigation:** `{}`\n", inv.investigation_id));
        report.push_str(&format!(
            "- **Date range:** {} to {}\n",
            inv.date_range.start_date, inv.date_range.end_date
        ));
    }
    report.push_str(&format!(
        "- **Progress:** {}/{} steps completed\n",
        nodes.completed_count(),
        nodes.len()
    ));
    if outcome.timed_out {
        report.push_str("- **Timed out:** yes\n");
    }
    report.push('\n');

    report.push_str("## Pipeline\n\n");
    report.push_str("| # | Step | Type | Status | Duration |\n");
    report.push_str("|---|------|------|--------|----------|\n");
    for (idx, node) in nodes.iter().enumerate() {
        report.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            idx + 1,
            node.label.replace('|', "\\|"),
            node.node_type.label(),
            node.status,
            format_duration(node)
        ));
    }
    report.push('\n');

    for node in nodes.iter().filter(|n| n.id.starts_with("analysis-")) {
        report.push_str(&format!("### {}\n\n", node.label));
        if let Some(text) = node.data["raw_analysis"].as_str() {
            report.push_str(text);
            report.push_str("\n\n");
        }
    }

    for node in nodes.iter().filter(|n| n.status == NodeStatus::Error) {
        report.push_str(&format!("> **{}:** {}\n\n", node.label, node.description));
    }

    if let Some(verdict) = outcome.inference() {
        report.push_str("## Master Inference\n\n");
        report.push_str(&format!(
            "**{}**\n\n",
            verdict["primary_cause"].as_str().unwrap_or("-")
        ));
        report.push_str(&format!(
            "- Confidence: {:.1}/10\n- Recommendation: {}\n\n",
            verdict["confidence_score"].as_f64().unwrap_or_default(),
            verdict["recommendation"].as_str().unwrap_or("-")
        ));
        if let Some(text) = verdict["detailed_reasoning"].as_str() {
            report.push_str(text);
            report.push_str("\n\n");
        }
    }

    report.push_str("---\n*Generated by AEGIS. Simulated data, not investment advice.*\n");
    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
