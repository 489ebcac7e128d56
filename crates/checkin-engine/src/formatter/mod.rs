use crate::history::HistoryEntry;
use checkin_common::protocol::SigninOutcome;

/// Longest summary shown on a `status` line before it is cut.
const SUMMARY_WIDTH: usize = 120;

pub fn format_outcome(outcome: &SigninOutcome) -> String {
    let mut output = format!("Sign-in result: {} - {}", outcome.status, outcome.message);
    if let Some(category) = outcome.error_category {
        output.push_str(&format!("\nCategory: {}", category));
    }
    if let Some(status) = outcome.http_status {
        output.push_str(&format!("\nHTTP status: {}", status));
    }
    output
}

pub fn format_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history entries yet".to_string();
    }
    entries
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_entry(entry: &HistoryEntry) -> String {
    let summary = entry
        .err_summary
        .as_deref()
        .map(|s| truncate(&s.replace('\n', " "), SUMMARY_WIDTH))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "[{}] slot={} stage={} result={} err={} summary={}",
        entry.timestamp,
        entry.slot.as_deref().unwrap_or("-"),
        entry.stage,
        entry.result,
        entry.err_category.as_deref().unwrap_or("-"),
        summary
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width).collect();
    cut.push('…');
    cut
}
