//! Integration tests for the draftline generation pipeline

mod support;

mod claim_exclusivity;
mod config_integration;
mod dispatch_batch;
mod recovery;
mod review_loop;
