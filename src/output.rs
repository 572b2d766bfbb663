use serde::Serialize;

use crate::history::HistoryPage;
use crate::store::SummaryRecord;
use crate::summarize::StructuredSummary;
use crate::workflow::SummaryReport;

/// Render a structured summary as plain text: overview, then one block per section
pub fn render_summary(summary: &StructuredSummary) -> String {
    let mut out = summary.overall_summary.clone();
    for section in &summary.sections {
        out.push_str("\n\n");
        if section.timestamp.is_empty() {
            out.push_str(&section.title);
        } else {
            out.push_str(&format!("[{}] {}", section.timestamp, section.title));
        }
        out.push('\n');
        out.push_str(&section.content);
    }
    out
}

pub fn render_report(report: &SummaryReport) -> String {
    format!(
        "{} ({})\nSource: {}\n\n{}\n\nCredits remaining: {}",
        report.video_title,
        report.video_id,
        report.transcript_source,
        render_summary(&report.structured_summary),
        report.remaining_credits,
    )
}

pub fn render_record(record: &SummaryRecord) -> String {
    format!(
        "{} ({})\nCreated: {}\n\n{}",
        record.video_title,
        record.video_id,
        record.created_at.format("%Y-%m-%d %H:%M UTC"),
        render_summary(&record.summary_data),
    )
}

/// One line per summary plus a page footer
pub fn render_history(page: &HistoryPage) -> String {
    if page.summaries.is_empty() {
        return "No summaries yet.".to_string();
    }
    let mut lines: Vec<String> = page
        .summaries
        .iter()
        .map(|r| {
            format!(
                "{}  {}  {} ({})",
                r.id,
                r.created_at.format("%Y-%m-%d"),
                r.video_title,
                r.video_id
            )
        })
        .collect();
    lines.push(format!(
        "Page {} of {} ({} total)",
        page.page,
        page.total_pages(),
        page.total
    ));
    lines.join("\n")
}

pub fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize: {e}\"}}"))
}
