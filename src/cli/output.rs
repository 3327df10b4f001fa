//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output, prefixed with the
/// stable error tag so scripts can match on it.
pub fn map_error(e: &ApiError) -> String {
    format!("error[{}]: {}", e.tag(), e)
}
