use thiserror::Error;

/// Portal-wide error taxonomy.
///
/// Transition handlers surface [`PortalError::InvalidTransition`] whenever a
/// guarded step write loses its race or an operation arrives out of order, so
/// callers can retry against fresh state instead of corrupting the workflow.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PortalError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} '{id}' not found"))
    }

    pub fn step_conflict(expected: &str, actual: &str) -> Self {
        Self::InvalidTransition(format!(
            "step order violation: expected '{expected}', got '{actual}'"
        ))
    }
}

pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_conflict_names_both_steps() {
        let err = PortalError::step_conflict("funds_pending", "funds_admin_confirm");
        let rendered = err.to_string();
        assert!(rendered.contains("expected 'funds_pending'"));
        assert!(rendered.contains("got 'funds_admin_confirm'"));
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = PortalError::not_found("application", "a1b2");
        assert_eq!(err.to_string(), "Not found: application 'a1b2' not found");
    }
}
