//! Shared presentation helpers.

use crate::error::ApiError;
use crate::types::QueueStatus;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Section heading in bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to render JSON: {}", e)))
}

pub(crate) fn colored_status(status: QueueStatus) -> String {
    match status {
        QueueStatus::Accepted => status.green().to_string(),
        QueueStatus::Review => status.yellow().to_string(),
        QueueStatus::Rejected => status.red().to_string(),
        QueueStatus::InProgress => status.cyan().to_string(),
        QueueStatus::Pending => status.to_string(),
    }
}

pub(crate) fn score_cell(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.0}", s))
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten long ids and titles for table cells.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
