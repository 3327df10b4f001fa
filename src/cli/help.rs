//! CLI command-name contract used in command logs.

use crate::cli::parse::{Commands, ConfigCommands, PlanCommands, ReviewCommands};

/// Command name string for logging (e.g. "dispatch", "review.approve").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Dispatch { .. } => "dispatch".to_string(),
        Commands::Enqueue { .. } => "enqueue".to_string(),
        Commands::Status { .. } => "status".to_string(),
        Commands::History { .. } => "history".to_string(),
        Commands::Review { command } => format!("review.{}", review_command_name(command)),
        Commands::Rejected { .. } => "rejected".to_string(),
        Commands::Patterns { .. } => "patterns".to_string(),
        Commands::Recover { .. } => "recover".to_string(),
        Commands::Plan { command } => format!("plan.{}", plan_command_name(command)),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn review_command_name(command: &ReviewCommands) -> &'static str {
    match command {
        ReviewCommands::List { .. } => "list",
        ReviewCommands::Show { .. } => "show",
        ReviewCommands::Approve { .. } => "approve",
        ReviewCommands::Reject { .. } => "reject",
        ReviewCommands::Regenerate { .. } => "regenerate",
    }
}

pub fn plan_command_name(command: &PlanCommands) -> &'static str {
    match command {
        PlanCommands::Put { .. } => "put",
        PlanCommands::Show { .. } => "show",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
        ConfigCommands::Validate => "validate",
    }
}
