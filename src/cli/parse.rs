//! CLI parse: clap types for draftline. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// draftline - demand-driven draft generation with review
#[derive(Parser)]
#[command(name = "draftline")]
#[command(about = "Queue, generate, grade and review draft entities for strategic plans")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one dispatch batch for a strategic plan
    Dispatch {
        /// Strategic plan id
        #[arg(long)]
        plan: String,
        /// Entity type filter ("all" for every type)
        #[arg(long = "type")]
        entity_type: Option<String>,
        /// Maximum items to process (default from config)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Accept items scoring at or above the threshold without review
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        auto_approve: Option<bool>,
        /// Auto-approve threshold, 0-100 (default from config)
        #[arg(long)]
        min_score: Option<u8>,
        /// Skip items that already used this many attempts
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Add a pending queue item
    Enqueue {
        /// Strategic plan id
        #[arg(long)]
        plan: String,
        /// Entity type (challenge, pilot, rd_call, ...)
        #[arg(long = "type")]
        entity_type: String,
        /// Priority score; higher is dispatched first
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        priority: f64,
        /// JSON file holding the prefilled spec
        #[arg(long)]
        spec_file: Option<PathBuf>,
        /// Title merged into the prefilled spec
        #[arg(long)]
        title: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show queue counts per status
    Status {
        /// Limit to one strategic plan
        #[arg(long)]
        plan: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show every recorded attempt for a queue item
    History {
        item_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Review decisions and the review list
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },
    /// List rejected items, most recent first
    Rejected {
        /// Limit to one strategic plan
        #[arg(long)]
        plan: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Group rejected items by rejection reason
    Patterns {
        /// Limit to one strategic plan
        #[arg(long)]
        plan: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Return stale in-progress items to pending
    Recover {
        /// Claims older than this are reclaimed (default from config)
        #[arg(long)]
        older_than_minutes: Option<u64>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Strategic plan context used by generators
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// Items awaiting review, lowest score first
    List {
        /// Strategic plan id
        #[arg(long)]
        plan: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show an item with its draft and a full quality assessment
    Show {
        item_id: String,
        /// Skip the full re-assessment
        #[arg(long)]
        no_assess: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Accept an item
    Approve {
        item_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Reject an item with a reason (prompted when omitted)
    Reject {
        item_id: String,
        /// Rejection reason, e.g. missing_legal_basis
        #[arg(long)]
        reason: Option<String>,
        /// Improvement notes for the next attempt
        #[arg(long, default_value = "")]
        notes: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Send an item back to pending for a fresh attempt
    Regenerate {
        item_id: String,
        /// Notes passed to the generator
        #[arg(long, default_value = "")]
        notes: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Store plan context from a JSON file
    Put {
        plan_id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print stored plan context
    Show { plan_id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML (API keys masked)
    Show,
    /// Validate the effective configuration
    Validate,
}
