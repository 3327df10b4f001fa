//! Property-based tests for scoring, thresholds and rejection mining

mod patterns;
mod threshold;
