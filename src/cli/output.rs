//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::QueryError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &QueryError) -> String {
    match e {
        QueryError::Application {
            message,
            data: Some(data),
        } => format!("{} ({})", message, data),
        other => other.to_string(),
    }
}
