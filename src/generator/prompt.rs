//! Prompt assembly for provider-backed generators.

use crate::generator::GenerationInput;
use crate::provider::{ChatMessage, MessageRole};
use crate::types::EntityType;

const SYSTEM_PROMPT: &str = "You draft entities for a municipal innovation portal. \
Reply with a single JSON object and nothing else. Keep every field grounded in the \
supplied strategic plan and draft seed.";

/// Short description of the entity and the fields a reply must contain.
pub fn entity_brief(entity_type: EntityType) -> (&'static str, &'static [&'static str]) {
    match entity_type {
        EntityType::Challenge => (
            "a municipal challenge statement",
            &["title", "description", "problem_statement", "affected_population", "kpis"],
        ),
        EntityType::Pilot => (
            "a pilot project plan",
            &["title", "description", "objectives", "duration_months", "budget", "success_criteria"],
        ),
        EntityType::Campaign => (
            "a public engagement campaign",
            &["title", "description", "target_audience", "channels", "timeline"],
        ),
        EntityType::Event => (
            "an innovation event",
            &["title", "description", "event_type", "agenda", "target_participants"],
        ),
        EntityType::Policy => (
            "a policy recommendation",
            &["title", "description", "legal_basis", "recommendations", "impact_assessment"],
        ),
        EntityType::RdCall => (
            "a research and development call",
            &["title", "description", "research_themes", "eligibility", "budget", "deadline"],
        ),
        EntityType::Partnership => (
            "a partnership proposal",
            &["title", "description", "partner_profile", "shared_objectives", "governance"],
        ),
        EntityType::LivingLab => (
            "a living lab setup",
            &["title", "description", "research_focus", "location", "stakeholders"],
        ),
        EntityType::Solution => (
            "a solution profile",
            &["title", "description", "provider", "maturity_level", "use_cases"],
        ),
    }
}

/// Build the chat transcript for one generation call.
pub fn build_messages(entity_type: EntityType, input: &GenerationInput<'_>) -> Vec<ChatMessage> {
    let (brief, fields) = entity_brief(entity_type);
    let mut task = format!(
        "Draft {brief}.\nRequired fields: {}.\n\nStrategic plan:\n{}\n\nDraft seed:\n{}",
        fields.join(", "),
        pretty(input.plan_context),
        pretty(input.prefilled_spec),
    );

    if let Some(hint) = input.regeneration {
        task.push_str("\n\nA previous draft was sent back.");
        if let Some(reason) = &hint.previous_rejection_reason {
            task.push_str(&format!("\nRejection reason: {reason}"));
        }
        if let Some(notes) = &hint.previous_improvement_notes {
            task.push_str(&format!("\nReviewer notes: {notes}"));
        }
        if let Some(notes) = &hint.notes {
            task.push_str(&format!("\nRegeneration request: {notes}"));
        }
    }

    vec![
        ChatMessage {
            role: MessageRole::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: MessageRole::User,
            content: task,
        },
    ]
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
