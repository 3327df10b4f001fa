//! Dispatch presentation: batch results.

use crate::cli::presentation::shared::{format_section_heading, score_cell, truncate};
use crate::demand::{BatchResponse, ItemOutcome};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_batch_response_text(response: &BatchResponse) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Dispatch batch"));
    out.push_str(&format!("  Batch id: {}\n", response.batch_id));
    if let Some(error) = &response.error {
        out.push_str(&format!("  {} {}\n", "Aborted:".red().bold(), error));
        return out;
    }
    if response.processed == 0 && response.skipped == 0 {
        out.push_str("  Nothing to do: no pending items matched.\n");
        return out;
    }
    out.push_str(&format!(
        "  Processed: {}  Succeeded: {}  Failed: {}",
        response.processed,
        response.succeeded.green(),
        response.failed.red()
    ));
    if response.skipped > 0 {
        out.push_str(&format!("  Skipped (claimed elsewhere): {}", response.skipped));
    }
    out.push_str("\n\n");

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Item", "Type", "Status", "Score", "Draft / Error"]);
    for result in &response.results {
        let status = match result.status {
            ItemOutcome::Accepted => "accepted".green().to_string(),
            ItemOutcome::Review => "review".yellow().to_string(),
            ItemOutcome::Error => "error".red().to_string(),
        };
        let detail = result
            .error
            .as_deref()
            .or(result.generated_id.as_deref())
            .unwrap_or("-");
        table.add_row(vec![
            truncate(&result.queue_item_id, 12),
            result.entity_type.to_string(),
            status,
            score_cell(result.quality_score),
            truncate(detail, 60),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
