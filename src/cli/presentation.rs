//! CLI presentation: text and json formatters per command family.

mod dispatch;
mod queue;
mod shared;

pub use dispatch::format_batch_response_text;
pub use queue::{
    format_history_text, format_item_detail_text, format_item_line, format_item_table,
    format_patterns_text, format_queue_stats_text,
};
pub use shared::{format_section_heading, to_json};
