//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, PlanCommands, ReviewCommands};
pub use presentation::{
    format_batch_response_text, format_history_text, format_item_detail_text, format_item_line,
    format_item_table, format_patterns_text, format_queue_stats_text,
};
pub use route::RunContext;
