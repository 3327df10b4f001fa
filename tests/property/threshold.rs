//! Property-based tests for score clamping and the auto-approve threshold

use draftline::quality::{clamp_score, QualityAssessment, RubricQualityGate};
use draftline::types::{AssessmentMode, EntityType};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const PILOT_REQUIRED: [&str; 4] = ["title", "description", "objectives", "success_criteria"];

fn pilot_fields(mask: &[bool], description: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    for (field, present) in PILOT_REQUIRED.iter().zip(mask) {
        if *present {
            let value = if *field == "description" {
                json!(description)
            } else {
                json!(format!("{} text", field))
            };
            fields.insert(field.to_string(), value);
        }
    }
    fields
}

/// Any raw score lands in 0..=100
#[test]
fn test_clamped_score_is_in_range() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<f64>(), |raw| {
            let score = clamp_score(raw);
            prop_assert!((0.0..=100.0).contains(&score));
            if (0.0..=100.0).contains(&raw) {
                prop_assert_eq!(score, raw);
            }
            Ok(())
        })
        .unwrap();
}

/// Passing a stricter threshold implies passing every looser one
#[test]
fn test_threshold_is_monotonic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(0.0f64..=100.0, any::<u8>(), any::<u8>()),
            |(score, a, b)| {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                let assessment = QualityAssessment::new(score, AssessmentMode::Quick);
                if assessment.passes(high) {
                    prop_assert!(assessment.passes(low));
                }
                prop_assert_eq!(assessment.passes(low), score >= f64::from(low));
                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    /// Filling in more required fields never lowers the rubric score
    #[test]
    fn test_rubric_rewards_completeness(
        mask in proptest::collection::vec(any::<bool>(), 4),
        extra in 0usize..4,
        description in "[a-z ]{0,300}",
    ) {
        let gate = RubricQualityGate::new();
        let fewer = pilot_fields(&mask, &description);
        let mut more_mask = mask.clone();
        more_mask[extra] = true;
        let more = pilot_fields(&more_mask, &description);

        for mode in [AssessmentMode::Quick, AssessmentMode::Full] {
            let low = gate.score(EntityType::Pilot, &fewer, mode);
            let high = gate.score(EntityType::Pilot, &more, mode);
            prop_assert!(low.overall_score <= high.overall_score);
            prop_assert!((0.0..=100.0).contains(&high.overall_score));
        }
    }
}
