//! Core enumerations shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of draft entity a queue item asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Challenge,
    Pilot,
    Campaign,
    Event,
    Policy,
    RdCall,
    Partnership,
    LivingLab,
    Solution,
}

impl EntityType {
    pub const ALL: [EntityType; 9] = [
        EntityType::Challenge,
        EntityType::Pilot,
        EntityType::Campaign,
        EntityType::Event,
        EntityType::Policy,
        EntityType::RdCall,
        EntityType::Partnership,
        EntityType::LivingLab,
        EntityType::Solution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Challenge => "challenge",
            EntityType::Pilot => "pilot",
            EntityType::Campaign => "campaign",
            EntityType::Event => "event",
            EntityType::Policy => "policy",
            EntityType::RdCall => "rd_call",
            EntityType::Partnership => "partnership",
            EntityType::LivingLab => "living_lab",
            EntityType::Solution => "solution",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    /// Accepts snake_case, camelCase and kebab-case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str().replace('_', "") == normalized)
            .ok_or_else(|| format!("unknown entity type '{}'", s))
    }
}

/// Lifecycle state of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Accepted,
    Review,
    Rejected,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 5] = [
        QueueStatus::Pending,
        QueueStatus::InProgress,
        QueueStatus::Accepted,
        QueueStatus::Review,
        QueueStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::InProgress => "in_progress",
            QueueStatus::Accepted => "accepted",
            QueueStatus::Review => "review",
            QueueStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let normalized = if normalized == "inprogress" {
            "in_progress".to_string()
        } else {
            normalized
        };
        QueueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown queue status '{}'", s))
    }
}

/// Depth of a quality assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMode {
    /// Cheaper, coarser scoring used inside batch runs.
    #[default]
    Quick,
    /// Full assessment for manual review.
    Full,
}

impl fmt::Display for AssessmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentMode::Quick => f.write_str("quick"),
            AssessmentMode::Full => f.write_str("full"),
        }
    }
}
