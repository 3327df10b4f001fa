//! Draftline: demand-driven draft generation
//!
//! Strategic plans enqueue demand for entities (challenges, pilots, policies
//! and the like). Dispatch batches claim pending items, draft them through a
//! registered generator, grade each draft with a quality gate and either
//! accept it or route it to human review. Review decisions feed back into the
//! next attempt, and every attempt is kept in the generation history.

pub mod cli;
pub mod config;
pub mod demand;
pub mod error;
pub mod generator;
pub mod logging;
pub mod provider;
pub mod quality;
pub mod store;
pub mod types;
