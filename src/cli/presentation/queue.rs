//! Queue presentation: stats, item lists, item detail, history, rejection patterns.

use crate::cli::presentation::shared::{colored_status, format_section_heading, score_cell, truncate};
use crate::demand::{GenerationHistoryRecord, HistoryOutcome, QueueItem, QueueStats, RejectionPattern};
use crate::generator::GeneratedEntity;
use crate::quality::QualityAssessment;
use crate::types::QueueStatus;
use comfy_table::presets::{UTF8_BORDERS_ONLY, UTF8_FULL};
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_queue_stats_text(stats: &QueueStats, strategic_plan_id: Option<&str>) -> String {
    let title = match strategic_plan_id {
        Some(plan) => format!("Queue status: {}", plan),
        None => "Queue status".to_string(),
    };
    let mut out = format!("{}\n\n", format_section_heading(&title));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Status", "Items"]);
    for status in [
        QueueStatus::Pending,
        QueueStatus::InProgress,
        QueueStatus::Review,
        QueueStatus::Accepted,
        QueueStatus::Rejected,
    ] {
        table.add_row(vec![colored_status(status), stats.count(status).to_string()]);
    }
    table.add_row(vec!["total".to_string(), stats.total().to_string()]);
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_item_table(items: &[QueueItem], title: &str) -> String {
    let mut out = format!("{}\n\n", format_section_heading(title));
    if items.is_empty() {
        out.push_str("  No items.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Item", "Type", "Status", "Score", "Attempts", "Title / Reason"]);
    for item in items {
        let note = if item.status == QueueStatus::Rejected {
            item.rejection_reason().to_string()
        } else {
            item.title().unwrap_or("-").to_string()
        };
        table.add_row(vec![
            item.id.clone(),
            item.entity_type.to_string(),
            colored_status(item.status),
            score_cell(item.quality_score),
            item.attempts.to_string(),
            truncate(&note, 48),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// One-line confirmation after a review decision.
pub fn format_item_line(item: &QueueItem, action: &str) -> String {
    format!(
        "{} {} ({}) -> {}\n",
        action.bold(),
        item.id,
        item.entity_type,
        colored_status(item.status)
    )
}

pub fn format_item_detail_text(
    item: &QueueItem,
    draft: Option<&GeneratedEntity>,
    assessment: Option<&QualityAssessment>,
) -> String {
    let mut out = format!("{}\n\n", format_section_heading(&format!("Queue item {}", item.id)));
    out.push_str(&format!("  Plan:      {}\n", item.strategic_plan_id));
    out.push_str(&format!("  Type:      {}\n", item.entity_type));
    out.push_str(&format!("  Status:    {}\n", colored_status(item.status)));
    out.push_str(&format!("  Priority:  {}\n", item.priority_score));
    out.push_str(&format!("  Attempts:  {}\n", item.attempts));
    out.push_str(&format!("  Score:     {}\n", score_cell(item.quality_score)));
    if let Some(title) = item.title() {
        out.push_str(&format!("  Title:     {}\n", title));
    }
    let feedback = &item.quality_feedback;
    if let Some(reason) = &feedback.rejection_reason {
        out.push_str(&format!("  Rejected:  {}\n", reason.red()));
    }
    if let Some(notes) = feedback.improvement_notes.as_deref().filter(|n| !n.is_empty()) {
        out.push_str(&format!("  Notes:     {}\n", notes));
    }
    if let Some(error) = &feedback.error {
        out.push_str(&format!("  Last error: {}\n", error.red()));
    }

    if let Some(draft) = draft {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Draft")));
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Field", "Value"]);
        for (key, value) in &draft.fields {
            let text = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            table.add_row(vec![key.clone(), truncate(&text, 80)]);
        }
        out.push_str(&format!("{}\n", table));
    }

    if let Some(assessment) = assessment {
        out.push_str(&format!(
            "\n{}\n\n",
            format_section_heading(&format!("Assessment ({})", assessment.mode))
        ));
        out.push_str(&format!("  Overall:   {:.0}\n", assessment.overall_score));
        for strength in &assessment.strengths {
            out.push_str(&format!("  {} {}\n", "+".green(), strength));
        }
        for gap in &assessment.gaps {
            out.push_str(&format!("  {} {}\n", "-".red(), gap));
        }
    }
    out
}

pub fn format_history_text(records: &[GenerationHistoryRecord]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Generation history"));
    if records.is_empty() {
        out.push_str("  No attempts recorded.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Attempt", "Batch", "Outcome", "Score", "Recorded", "Error"]);
    for record in records {
        let outcome = match record.outcome {
            HistoryOutcome::Accepted => "accepted".green().to_string(),
            HistoryOutcome::ManualEdit => "manual_edit".yellow().to_string(),
            HistoryOutcome::Error => "error".red().to_string(),
        };
        table.add_row(vec![
            record.attempt_number.to_string(),
            truncate(&record.batch_id, 12),
            outcome,
            score_cell(record.overall_score),
            record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            truncate(record.error.as_deref().unwrap_or(""), 48),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_patterns_text(patterns: &[RejectionPattern]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Rejection patterns"));
    if patterns.is_empty() {
        out.push_str("  No rejected items.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Reason", "Count", "Entity types", "Examples"]);
    for pattern in patterns {
        let types: Vec<String> = pattern.entity_types.iter().map(|t| t.to_string()).collect();
        table.add_row(vec![
            pattern.reason.clone(),
            pattern.count.to_string(),
            types.join(", "),
            truncate(&pattern.examples.join(", "), 60),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
